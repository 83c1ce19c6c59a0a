// ==========================================
// 数据上传平台 - 应用层
// ==========================================
// 职责: 组装共享状态（配置 / 注册表 / 存储 / 历史）
// ==========================================

pub mod state;

pub use state::AppState;
