// ==========================================
// 数据上传平台 - 配置层
// ==========================================
// 职责: 运行配置（环境变量） + 可覆写的校验参数（config_kv 表）
// ==========================================

pub mod config_manager;
pub mod upload_config;
pub mod validation_config_trait;

pub use config_manager::{config_keys, ConfigManager};
pub use upload_config::{default_data_dir, env_keys, UploadConfig, DEFAULT_REGION};
pub use validation_config_trait::ValidationConfigReader;
