// ==========================================
// 数据上传平台 - 对象存储错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 存储失败原样上抛，核心层不做重试
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("对象存储不可用: {0}")]
    Unavailable(String),

    #[error("非法对象 key: {0}")]
    InvalidKey(String),

    #[error("对象存储 IO 失败: {0}")]
    Io(String),

    #[error("对象元数据序列化失败: {0}")]
    Metadata(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Metadata(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
