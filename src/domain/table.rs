// ==========================================
// 数据上传平台 - 上传表格模型
// ==========================================
// 职责: 文件解析结果（表头有序 + 行按位置存储）
// 说明: 保留原始表头顺序，重复表头由列名归一化阶段报告
// ==========================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ==========================================
// RowWidthError - 行宽超出表头
// ==========================================
// 超出部分含非空值时拒绝整行，不静默丢弃数据
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("第 {row} 行有 {actual} 个值，但表头只有 {expected} 列")]
pub struct RowWidthError {
    pub row: usize,      // 数据行号（从 1 开始，不含表头）
    pub expected: usize,
    pub actual: usize,
}

// ==========================================
// UploadedTable - 上传表格
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadedTable {
    /// 来源文件名（不含路径）
    pub source_name: String,
    /// 原始表头（已 TRIM）
    pub headers: Vec<String>,
    /// 数据行（与 headers 等长，短行以空串补齐）
    pub rows: Vec<Vec<String>>,
}

impl UploadedTable {
    pub fn new(source_name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            source_name: source_name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// 追加一行：短行以空串补齐，超出表头的空白尾部丢弃
    ///
    /// # 返回
    /// - Err(RowWidthError): 超出表头的部分含非空值
    pub fn push_row(&mut self, mut cells: Vec<String>) -> Result<(), RowWidthError> {
        let expected = self.headers.len();
        if cells.len() > expected {
            if cells[expected..].iter().any(|c| !c.trim().is_empty()) {
                return Err(RowWidthError {
                    row: self.rows.len() + 1,
                    expected,
                    actual: cells.len(),
                });
            }
            cells.truncate(expected);
        }
        cells.resize(expected, String::new());
        self.rows.push(cells);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 按行索引取行视图
    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        self.rows.get(index).map(|cells| RowView {
            headers: &self.headers,
            cells,
        })
    }

    /// 前 n 行（预览用）
    pub fn head(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// 某一列的全部取值
    pub fn column_values(&self, column_index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(move |r| r.get(column_index).map(String::as_str))
    }
}

// ==========================================
// RowView - 行视图（原始表头 → 单元格值）
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    headers: &'a [String],
    cells: &'a [String],
}

impl<'a> RowView<'a> {
    /// 按原始表头取值（首个匹配）
    pub fn get(&self, header: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .position(|h| h == header)
            .and_then(|idx| self.cells.get(idx))
            .map(String::as_str)
    }
}
