// ==========================================
// 数据上传平台 - 文件预览
// ==========================================
// 职责: 前 N 行 / 总行数 / 列类型推断 / 表头归一化预览
// 说明: 预览不依赖 Schema，不做校验
// ==========================================

use crate::domain::table::UploadedTable;
use crate::domain::types::InferredType;
use crate::domain::upload::FileInfo;
use crate::importer::column_normalizer::{ColumnNormalizer, HeaderPreview};
use crate::importer::field_validator::{
    parse_bool, parse_decimal, DEFAULT_DATETIME_FORMATS, DEFAULT_DATE_FORMATS,
};
use chrono::{NaiveDate, NaiveDateTime};

/// 默认预览行数
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub inferred_type: InferredType,
    pub non_empty: usize,
}

impl ColumnSummary {
    pub fn friendly_type(&self) -> &'static str {
        self.inferred_type.friendly_name()
    }
}

#[derive(Debug, Clone)]
pub struct TablePreview {
    pub file_info: Option<FileInfo>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
    pub columns: Vec<ColumnSummary>,
    pub header_mapping: Vec<HeaderPreview>,
}

impl TablePreview {
    pub fn build(
        table: &UploadedTable,
        max_rows: usize,
        normalizer: &ColumnNormalizer,
        file_info: Option<FileInfo>,
    ) -> Self {
        let columns = table
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<&str> = table.column_values(idx).filter(|v| !v.is_empty()).collect();
                ColumnSummary {
                    name: name.clone(),
                    inferred_type: infer_type(&values),
                    non_empty: values.len(),
                }
            })
            .collect();

        Self {
            file_info,
            headers: table.headers.clone(),
            rows: table.head(max_rows).to_vec(),
            total_rows: table.row_count(),
            columns,
            header_mapping: normalizer.preview_mapping(&table.headers),
        }
    }

    /// 是否存在归一化冲突（上传将被拒绝）
    pub fn has_header_conflicts(&self) -> bool {
        self.header_mapping.iter().any(|h| h.conflicts_with.is_some())
    }
}

/// 按"全部非空值都能解析"推断列类型，优先级 int > float > bool > date > text
pub fn infer_type(values: &[&str]) -> InferredType {
    if values.is_empty() {
        return InferredType::Empty;
    }
    if values.iter().all(|v| v.parse::<i64>().is_ok()) {
        InferredType::Integer
    } else if values.iter().all(|v| parse_decimal(v).is_some()) {
        InferredType::Float
    } else if values.iter().all(|v| parse_bool(v).is_some()) {
        InferredType::Boolean
    } else if values.iter().all(|v| looks_like_date(v)) {
        InferredType::Date
    } else {
        InferredType::Text
    }
}

fn looks_like_date(value: &str) -> bool {
    DEFAULT_DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
        || DEFAULT_DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_type() {
        assert_eq!(infer_type(&["1", "2", "-3"]), InferredType::Integer);
        assert_eq!(infer_type(&["1", "2,5"]), InferredType::Float);
        assert_eq!(infer_type(&["sim", "não"]), InferredType::Boolean);
        assert_eq!(infer_type(&["2024-01-15", "16/01/2024"]), InferredType::Date);
        assert_eq!(infer_type(&["Ana", "30"]), InferredType::Text);
        assert_eq!(infer_type(&[]), InferredType::Empty);
    }

    #[test]
    fn test_preview_limits_rows() {
        let mut table = UploadedTable::new("a.csv", vec!["Idade".to_string(), "Nome".to_string()]);
        for i in 0..20 {
            table.push_row(vec![i.to_string(), format!("pessoa {}", i)]).unwrap();
        }

        let preview = TablePreview::build(&table, 5, &ColumnNormalizer::default(), None);
        assert_eq!(preview.rows.len(), 5);
        assert_eq!(preview.total_rows, 20);
        assert_eq!(preview.columns[0].inferred_type, InferredType::Integer);
        assert_eq!(preview.columns[1].friendly_type(), "Texto");
        assert_eq!(preview.header_mapping[0].canonical, "idade");
        assert!(!preview.has_header_conflicts());
    }
}
