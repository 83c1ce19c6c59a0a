// ==========================================
// 数据上传平台 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ApiError, ApiResult, HistoryApi, UploadApi};
use crate::config::{ConfigManager, UploadConfig};
use crate::db::{ensure_schema, open_sqlite_connection, read_schema_version};
use crate::repository::UploadHistoryRepository;
use crate::schema::SchemaRegistry;
use crate::storage::{LocalObjectStore, ObjectStore};

/// 应用状态
///
/// 历史库与 config_kv 共用一个 SQLite 连接
pub struct AppState {
    pub config: UploadConfig,
    pub registry: Arc<SchemaRegistry>,
    pub config_manager: Arc<ConfigManager>,
    pub upload_api: Arc<UploadApi>,
    pub history_api: Arc<HistoryApi>,
}

impl AppState {
    /// 使用本地目录对象存储创建应用状态
    pub fn new(config: UploadConfig) -> ApiResult<Self> {
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(&config.storage_root));
        Self::with_store(config, store)
    }

    /// 使用指定对象存储创建应用状态
    pub fn with_store(config: UploadConfig, store: Arc<dyn ObjectStore>) -> ApiResult<Self> {
        if let Some(parent) = config.history_db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ApiError::DatabaseError(format!("无法创建数据目录 {}: {}", parent.display(), e))
                })?;
            }
        }

        let db_path = config.history_db_path.to_string_lossy().to_string();
        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        ensure_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        let schema_version =
            read_schema_version(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(Arc::clone(&conn), config.clone())
                .map_err(|e| ApiError::ConfigError(e.to_string()))?,
        );
        let history_repo = Arc::new(UploadHistoryRepository::from_connection(conn));
        let registry = Arc::new(SchemaRegistry::new(&config.schema_dir));

        let history_api = Arc::new(HistoryApi::new(history_repo, Arc::clone(&store)));
        let upload_api = Arc::new(UploadApi::new(
            Arc::clone(&registry),
            store,
            Arc::clone(&history_api),
            config_manager.clone(),
            config.key_prefix.clone(),
        ));

        tracing::info!(
            schema_dir = %config.schema_dir.display(),
            history_db = %db_path,
            schema_version = ?schema_version,
            "AppState 初始化完成"
        );

        Ok(Self {
            config,
            registry,
            config_manager,
            upload_api,
            history_api,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_app_state_new_creates_db() {
        let dir = TempDir::new().unwrap();
        let config = UploadConfig {
            schema_dir: dir.path().join("schema"),
            storage_root: dir.path().join("objects"),
            history_db_path: dir.path().join("data").join("history.db"),
            ..Default::default()
        };

        let state = AppState::new(config).unwrap();
        assert!(dir.path().join("data").join("history.db").exists());
        assert!(state.registry.list_categories().unwrap().is_empty());
        assert!(state.history_api.recent_uploads(10).unwrap().is_empty());
    }
}
