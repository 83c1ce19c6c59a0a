// ==========================================
// 数据上传平台 - Schema 模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use std::path::PathBuf;
use thiserror::Error;

/// Schema 注册表错误类型
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("未找到 Schema: subject={subject}, sub_subject={sub_subject}")]
    SchemaNotFound { subject: String, sub_subject: String },

    #[error("Schema 文件格式错误 ({path}): {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Schema 目录不可读 ({path}): {message}")]
    DirectoryError { path: PathBuf, message: String },

    #[error("Schema 缓存锁获取失败: {0}")]
    LockError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SchemaError {
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SchemaError::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result 类型别名
pub type SchemaResult<T> = Result<T, SchemaError>;
