// ==========================================
// 数据上传平台 - 领域模型层
// ==========================================
// 职责: Schema / 上传表格 / 校验结果 / 上传记录
// 红线: 不含数据访问逻辑，不含文件解析逻辑
// ==========================================

pub mod schema;
pub mod table;
pub mod types;
pub mod upload;
pub mod validation;

// 重导出核心类型
pub use schema::{FieldConstraints, FieldRule, SchemaDefinition};
pub use table::{RowView, RowWidthError, UploadedTable};
pub use types::{FailureKind, FieldType, InferredType};
pub use upload::{
    FileInfo, HistoryFilter, StoredUpload, UploadMetadata, UploadRecord, UploadStatistics,
};
pub use validation::{
    ColumnMapping, ColumnWarning, FieldError, Outcome, ValidationReport, Violation,
};
