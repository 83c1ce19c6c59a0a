// ==========================================
// 数据上传平台 - 数据仓储层
// ==========================================
// 职责: 上传历史持久化（SQLite）
// 红线: Repository 不含业务规则，只做数据读写
// ==========================================

pub mod error;
pub mod upload_history_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use upload_history_repo::UploadHistoryRepository;
