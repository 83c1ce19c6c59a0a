// ==========================================
// 数据上传平台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)，缺失时回退 UploadConfig
// ==========================================

use crate::config::upload_config::UploadConfig;
use crate::config::validation_config_trait::ValidationConfigReader;
use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::importer::field_validator::{DEFAULT_DATETIME_FORMATS, DEFAULT_DATE_FORMATS};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
    defaults: UploadConfig,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - defaults: config_kv 中缺失时使用的值
    pub fn new(db_path: &str, defaults: UploadConfig) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            defaults,
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 会对传入连接再次应用统一 PRAGMA 并建表（均幂等）
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        defaults: UploadConfig,
    ) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
            ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn, defaults })
    }

    pub fn defaults(&self) -> &UploadConfig {
        &self.defaults
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON 格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&config_map)?)
    }

    /// 读取数值配置，非法时回退默认值
    fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        match self.get_config_value(key)? {
            Some(raw) => Ok(raw.trim().parse::<T>().unwrap_or_else(|_| {
                warn!(config_key = key, value = %raw, default = %default, "配置值非法，使用默认值");
                default
            })),
            None => Ok(default),
        }
    }

    /// 读取格式列表（JSON 数组），缺失或非法时回退默认列表
    fn get_formats_or(&self, key: &str, default: &[&str]) -> Result<Vec<String>, Box<dyn Error>> {
        let fallback = || default.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        match self.get_config_value(key)? {
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(formats) if !formats.is_empty() => Ok(formats),
                _ => {
                    warn!(config_key = key, value = %raw, "格式列表配置非法，使用默认值");
                    Ok(fallback())
                }
            },
            None => Ok(fallback()),
        }
    }
}

impl ValidationConfigReader for ConfigManager {
    fn get_max_reported_errors(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or(config_keys::MAX_REPORTED_ERRORS, self.defaults.max_reported_errors)
    }

    fn get_max_file_size_mb(&self) -> Result<u64, Box<dyn Error>> {
        self.get_parsed_or(config_keys::MAX_FILE_SIZE_MB, self.defaults.max_file_size_mb)
    }

    fn get_preview_rows(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or(config_keys::PREVIEW_ROWS, self.defaults.preview_rows)
    }

    fn get_date_formats(&self) -> Result<Vec<String>, Box<dyn Error>> {
        self.get_formats_or(config_keys::DATE_FORMATS, DEFAULT_DATE_FORMATS)
    }

    fn get_datetime_formats(&self) -> Result<Vec<String>, Box<dyn Error>> {
        self.get_formats_or(config_keys::DATETIME_FORMATS, DEFAULT_DATETIME_FORMATS)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 校验
    pub const MAX_REPORTED_ERRORS: &str = "max_reported_errors";
    pub const DATE_FORMATS: &str = "date_formats";         // JSON 数组
    pub const DATETIME_FORMATS: &str = "datetime_formats"; // JSON 数组

    // 文件读取
    pub const MAX_FILE_SIZE_MB: &str = "max_file_size_mb";
    pub const PREVIEW_ROWS: &str = "preview_rows";
}
