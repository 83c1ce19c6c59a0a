// ==========================================
// 数据上传平台 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 逐字段校验失败不走此类型（累积为 ValidationReport），
//       此处只放会中断整次运行的错误
// ==========================================

use crate::domain::table::RowWidthError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件过大: {size_mb:.1}MB（上限 {max_mb}MB）")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("文件无表头行: {0}")]
    MissingHeader(String),

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    #[error("{source_name}: 第 {row} 行有 {actual} 个值，但表头只有 {expected} 列")]
    RowWidthMismatch {
        source_name: String,
        row: usize,
        expected: usize,
        actual: usize,
    },

    // ===== 列名归一化错误 =====
    #[error("列名冲突: '{second}' 与 '{first}' 归一化后均为 '{canonical}'")]
    DuplicateColumn {
        canonical: String,
        first: String,
        second: String,
    },

    // ===== 输出错误 =====
    #[error("CSV 输出失败: {0}")]
    CsvWriteError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    pub fn row_width(source_name: &str, err: RowWidthError) -> Self {
        ImportError::RowWidthMismatch {
            source_name: source_name.to_string(),
            row: err.row,
            expected: err.expected,
            actual: err.actual,
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
