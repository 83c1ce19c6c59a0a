// ==========================================
// 数据上传平台 - API层错误类型
// ==========================================
// 职责: 汇总各层错误，转换为面向用户的错误消息
// 红线: 所有错误信息必须包含显式原因；存储失败原样透传
// ==========================================

use crate::domain::validation::ValidationReport;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use crate::schema::error::SchemaError;
use crate::storage::error::StorageError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Schema 错误
    // ==========================================
    #[error("未找到 Schema: subject={subject}, sub_subject={sub_subject}")]
    SchemaNotFound { subject: String, sub_subject: String },

    #[error("Schema 不可用: {0}")]
    SchemaUnavailable(String),

    // ==========================================
    // 文件与校验错误
    // ==========================================
    #[error("列名冲突: '{second}' 与 '{first}' 归一化后均为 '{canonical}'")]
    DuplicateColumn {
        canonical: String,
        first: String,
        second: String,
    },

    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据校验未通过: {}/{} 行无效", .0.invalid_rows, .0.total_rows)]
    ValidationFailed(Box<ValidationReport>),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 外部协作方错误
    // ==========================================
    #[error("{0}")]
    StorageFailure(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::SchemaNotFound {
                subject,
                sub_subject,
            } => ApiError::SchemaNotFound {
                subject,
                sub_subject,
            },
            SchemaError::Other(e) => ApiError::Other(e),
            other => ApiError::SchemaUnavailable(other.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::DuplicateColumn {
                canonical,
                first,
                second,
            } => ApiError::DuplicateColumn {
                canonical,
                first,
                second,
            },
            ImportError::Other(e) => ApiError::Other(e),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

// 存储失败: 消息原样透传，不做包装
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::StorageFailure(err.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::Other(e) => ApiError::Other(e),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
