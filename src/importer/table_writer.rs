// ==========================================
// 数据上传平台 - 规范化 CSV 输出
// ==========================================
// 输出: 逗号分隔 UTF-8 CSV，表头为归一化列名
// 列顺序: Schema 字段（按 Schema 顺序，文件中存在者） → 未知列（按原始顺序）
// ==========================================

use crate::domain::schema::SchemaDefinition;
use crate::domain::table::UploadedTable;
use crate::domain::validation::ColumnMapping;
use crate::importer::column_normalizer::ColumnNormalizer;
use crate::importer::error::{ImportError, ImportResult};
use csv::WriterBuilder;

/// 规范化列布局: (输出列名, 源列位置)
pub fn canonical_layout(
    schema: &SchemaDefinition,
    mapping: &ColumnMapping,
    normalizer: &ColumnNormalizer,
) -> Vec<(String, usize)> {
    let mut layout: Vec<(String, usize)> = schema
        .fields
        .iter()
        .filter_map(|rule| {
            let canonical = normalizer.normalize(&rule.name);
            mapping.position_of(&canonical).map(|pos| (canonical, pos))
        })
        .collect();

    for (pos, (_, canonical)) in mapping.entries.iter().enumerate() {
        if !layout.iter().any(|(_, p)| *p == pos) {
            layout.push((canonical.clone(), pos));
        }
    }
    layout
}

/// 写出规范化 CSV 字节
pub fn write_canonical_csv(
    table: &UploadedTable,
    layout: &[(String, usize)],
) -> ImportResult<Vec<u8>> {
    let mut writer = WriterBuilder::new().delimiter(b',').from_writer(Vec::new());

    writer
        .write_record(layout.iter().map(|(name, _)| name.as_str()))
        .map_err(|e| ImportError::CsvWriteError(e.to_string()))?;

    for cells in &table.rows {
        writer
            .write_record(
                layout
                    .iter()
                    .map(|(_, pos)| cells.get(*pos).map(String::as_str).unwrap_or("")),
            )
            .map_err(|e| ImportError::CsvWriteError(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| ImportError::CsvWriteError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::FieldRule;
    use crate::domain::types::FieldType;

    #[test]
    fn test_canonical_csv_orders_schema_fields_first() {
        let schema = SchemaDefinition {
            description: String::new(),
            subject: "vendas".to_string(),
            sub_subject: "produtos".to_string(),
            table_name: "produtos".to_string(),
            fields: vec![
                FieldRule::new("codigo", FieldType::String, true),
                FieldRule::new("preco_rs", FieldType::Float, true),
            ],
            source_file: None,
        };

        let mut table = UploadedTable::new(
            "arquivo.csv",
            vec![
                "Observação".to_string(),
                "Preço (R$)".to_string(),
                "Código".to_string(),
            ],
        );
        table
            .push_row(vec![
                "tem, vírgula".to_string(),
                "9,90".to_string(),
                "A1".to_string(),
            ])
            .unwrap();

        let normalizer = ColumnNormalizer::default();
        let mapping = normalizer.map_headers(&table.headers).unwrap();
        let layout = canonical_layout(&schema, &mapping, &normalizer);
        let bytes = write_canonical_csv(&table, &layout).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(
            text,
            "codigo,preco_rs,observacao\nA1,\"9,90\",\"tem, vírgula\"\n"
        );
    }
}
