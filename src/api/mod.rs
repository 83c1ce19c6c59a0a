// ==========================================
// 数据上传平台 - API 层
// ==========================================
// 职责: 业务编排接口（上传 / 校验 / 预览 / 历史）
// ==========================================

pub mod error;
pub mod history_api;
pub mod upload_api;

pub use error::{ApiError, ApiResult};
pub use history_api::{parse_stored_key, HistoryApi};
pub use upload_api::{destination_key, sanitize_segment, UploadApi, UploadReceipt};
