// ==========================================
// 数据上传平台 - 导入层
// ==========================================
// 职责: 文件解析 → 列名归一化 → 字段/记录校验 → 规范化 CSV
// 支持: Excel, CSV
// ==========================================

pub mod column_normalizer;
pub mod error;
pub mod field_validator;
pub mod file_parser;
pub mod previewer;
pub mod record_validator;
pub mod table_writer;

// 重导出核心类型
pub use column_normalizer::{strip_diacritics, ColumnNormalizer, HeaderPreview};
pub use error::{ImportError, ImportResult};
pub use field_validator::{validate_field, ValidatorOptions};
pub use file_parser::{
    CsvParser, Delimiter, ExcelParser, ReadOptions, TableParser, UniversalFileParser,
};
pub use previewer::{ColumnSummary, TablePreview};
pub use record_validator::RecordValidator;
pub use table_writer::{canonical_layout, write_canonical_csv};
