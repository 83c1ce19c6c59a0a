// ==========================================
// 数据上传平台 - 运行配置
// ==========================================
// 来源: 环境变量（缺失或非法时回退默认值）
// 红线: display_info 不输出任何密钥
// ==========================================

use crate::importer::file_parser::DEFAULT_MAX_FILE_SIZE_MB;
use crate::importer::previewer::DEFAULT_PREVIEW_ROWS;
use crate::importer::record_validator::DEFAULT_MAX_REPORTED_ERRORS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// 默认区域
pub const DEFAULT_REGION: &str = "us-east-1";

/// 占位符 bucket 名中的特征片段
const PLACEHOLDER_MARKERS: [&str; 2] = ["EXAMPLE", "YOUR_"];

/// 环境变量名
pub mod env_keys {
    pub const BUCKET_NAME: &str = "S3_BUCKET_NAME";
    pub const REGION: &str = "AWS_DEFAULT_REGION";
    pub const SCHEMA_DIR: &str = "UPLOAD_SCHEMA_DIR";
    pub const STORAGE_ROOT: &str = "UPLOAD_STORAGE_ROOT";
    pub const HISTORY_DB: &str = "UPLOAD_HISTORY_DB";
    pub const KEY_PREFIX: &str = "UPLOAD_KEY_PREFIX";
    pub const MAX_ERRORS: &str = "UPLOAD_MAX_ERRORS";
    pub const MAX_FILE_SIZE_MB: &str = "UPLOAD_MAX_FILE_SIZE_MB";
    pub const PREVIEW_ROWS: &str = "UPLOAD_PREVIEW_ROWS";
}

/// 应用数据目录（用户数据目录/data-upload，取不到时为当前目录）
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("data-upload"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub bucket_name: String,
    pub region: String,
    pub schema_dir: PathBuf,
    pub storage_root: PathBuf,
    pub history_db_path: PathBuf,
    pub key_prefix: Option<String>,
    pub max_reported_errors: usize,
    pub max_file_size_mb: u64,
    pub preview_rows: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            bucket_name: String::new(),
            region: DEFAULT_REGION.to_string(),
            schema_dir: PathBuf::from("schema"),
            storage_root: data_dir.join("objects"),
            history_db_path: data_dir.join("upload_history.db"),
            key_prefix: None,
            max_reported_errors: DEFAULT_MAX_REPORTED_ERRORS,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl UploadConfig {
    /// 从进程环境变量加载
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载（空白值视为未设置）
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(v) = get(env_keys::BUCKET_NAME) {
            config.bucket_name = v;
        }
        if let Some(v) = get(env_keys::REGION) {
            config.region = v;
        }
        if let Some(v) = get(env_keys::SCHEMA_DIR) {
            config.schema_dir = PathBuf::from(v);
        }
        if let Some(v) = get(env_keys::STORAGE_ROOT) {
            config.storage_root = PathBuf::from(v);
        }
        if let Some(v) = get(env_keys::HISTORY_DB) {
            config.history_db_path = PathBuf::from(v);
        }
        config.key_prefix = get(env_keys::KEY_PREFIX).map(|p| p.trim_matches('/').to_string());

        config.max_reported_errors =
            parse_or(get(env_keys::MAX_ERRORS), env_keys::MAX_ERRORS, config.max_reported_errors);
        config.max_file_size_mb = parse_or(
            get(env_keys::MAX_FILE_SIZE_MB),
            env_keys::MAX_FILE_SIZE_MB,
            config.max_file_size_mb,
        );
        config.preview_rows =
            parse_or(get(env_keys::PREVIEW_ROWS), env_keys::PREVIEW_ROWS, config.preview_rows);

        config
    }

    /// 存储目标是否已配置（空白或占位符 bucket 视为未配置）
    pub fn is_configured(&self) -> bool {
        let bucket = self.bucket_name.trim();
        !bucket.is_empty() && !PLACEHOLDER_MARKERS.iter().any(|m| bucket.contains(m))
    }

    /// 展示用配置摘要
    pub fn display_info(&self) -> Vec<(&'static str, String)> {
        let or_dash = |v: &str| {
            if v.trim().is_empty() {
                "-".to_string()
            } else {
                v.to_string()
            }
        };
        vec![
            ("bucket", or_dash(&self.bucket_name)),
            ("region", self.region.clone()),
            ("configured", self.is_configured().to_string()),
            ("schema_dir", self.schema_dir.display().to_string()),
            ("storage_root", self.storage_root.display().to_string()),
            ("history_db", self.history_db_path.display().to_string()),
            ("key_prefix", or_dash(self.key_prefix.as_deref().unwrap_or(""))),
            ("max_reported_errors", self.max_reported_errors.to_string()),
            ("max_file_size_mb", self.max_file_size_mb.to_string()),
            ("preview_rows", self.preview_rows.to_string()),
        ]
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        Some(v) => v.parse::<T>().unwrap_or_else(|_| {
            warn!(key = key, value = %v, default = %default, "配置值非法，使用默认值");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> UploadConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        UploadConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.max_file_size_mb, 50);
        assert_eq!(config.key_prefix, None);
        assert!(!config.is_configured());
    }

    #[test]
    fn test_overrides_and_invalid_numbers() {
        let config = from_pairs(&[
            (env_keys::BUCKET_NAME, "dados-corp"),
            (env_keys::KEY_PREFIX, "/raw/"),
            (env_keys::MAX_ERRORS, "25"),
            (env_keys::PREVIEW_ROWS, "muitos"),
        ]);
        assert!(config.is_configured());
        assert_eq!(config.key_prefix.as_deref(), Some("raw"));
        assert_eq!(config.max_reported_errors, 25);
        assert_eq!(config.preview_rows, DEFAULT_PREVIEW_ROWS);
    }

    #[test]
    fn test_placeholder_bucket_not_configured() {
        for bucket in ["  ", "YOUR_BUCKET_NAME", "my-EXAMPLE-bucket"] {
            let config = from_pairs(&[(env_keys::BUCKET_NAME, bucket)]);
            assert!(!config.is_configured(), "{}", bucket);
        }
    }

    #[test]
    fn test_display_info_lists_bucket() {
        let config = from_pairs(&[(env_keys::BUCKET_NAME, "dados-corp")]);
        let info = config.display_info();
        assert!(info.contains(&("bucket", "dados-corp".to_string())));
        assert!(info.contains(&("configured", "true".to_string())));
    }
}
