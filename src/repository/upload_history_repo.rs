// ==========================================
// 数据上传平台 - 上传历史仓储
// ==========================================
// 职责: upload_history 表的写入、条件查询与统计
// 红线: Repository 不含业务逻辑，记录写入后不修改
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::upload::{HistoryFilter, UploadRecord, UploadStatistics};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::sync::{Arc, Mutex};

/// 统计中列出的 Schema 数量上限
const TOP_SCHEMA_LIMIT: usize = 5;

const SELECT_COLUMNS: &str = r#"
    upload_id, filename, subject, sub_subject, schema_used, uploaded_at,
    destination_key, row_count, column_count, size_bytes, original_format
"#;

/// 时间戳统一写为 UTC 微秒 RFC3339，保证字符串序即时间序
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<UploadRecord> {
    Ok(UploadRecord {
        upload_id: row.get(0)?,
        filename: row.get(1)?,
        subject: row.get(2)?,
        sub_subject: row.get(3)?,
        schema_used: row.get(4)?,
        uploaded_at: parse_ts(5, &row.get::<_, String>(5)?)?,
        destination_key: row.get(6)?,
        row_count: row.get::<_, i64>(7)? as usize,
        column_count: row.get::<_, i64>(8)? as usize,
        size_bytes: row.get::<_, i64>(9)? as u64,
        original_format: row.get(10)?,
    })
}

// ==========================================
// UploadHistoryRepository
// ==========================================
pub struct UploadHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UploadHistoryRepository {
    /// 打开（必要时创建）历史库
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn ensure_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        ensure_schema(&conn)?;
        Ok(())
    }

    /// 写入一条上传记录
    pub fn record(&self, record: &UploadRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO upload_history (
                upload_id, filename, subject, sub_subject, schema_used, uploaded_at,
                destination_key, row_count, column_count, size_bytes, original_format
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                record.upload_id,
                record.filename,
                record.subject,
                record.sub_subject,
                record.schema_used,
                format_ts(&record.uploaded_at),
                record.destination_key,
                record.row_count as i64,
                record.column_count as i64,
                record.size_bytes as i64,
                record.original_format,
            ],
        )?;
        Ok(())
    }

    /// 按主键查询
    pub fn find_by_id(&self, upload_id: &str) -> RepositoryResult<Option<UploadRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM upload_history WHERE upload_id = ?1", SELECT_COLUMNS);
        let result = conn.query_row(&sql, params![upload_id], map_record);

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 条件查询（最近上传在前）
    ///
    /// # 参数
    /// - filter.subject / sub_subject: 精确匹配
    /// - filter.since / until: 闭区间
    /// - filter.limit: 返回条数上限
    pub fn query(&self, filter: &HistoryFilter) -> RepositoryResult<Vec<UploadRecord>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(subject) = &filter.subject {
            conditions.push("subject = ?");
            values.push(subject.clone());
        }
        if let Some(sub_subject) = &filter.sub_subject {
            conditions.push("sub_subject = ?");
            values.push(sub_subject.clone());
        }
        if let Some(since) = &filter.since {
            conditions.push("uploaded_at >= ?");
            values.push(format_ts(since));
        }
        if let Some(until) = &filter.until {
            conditions.push("uploaded_at <= ?");
            values.push(format_ts(until));
        }

        let mut sql = format!("SELECT {} FROM upload_history", SELECT_COLUMNS);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY uploaded_at DESC, upload_id");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM upload_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// 汇总统计
    pub fn statistics(&self) -> RepositoryResult<UploadStatistics> {
        let conn = self.get_conn()?;

        let (total_files, total_rows, total_size, upload_days): (i64, i64, i64, i64) = conn
            .query_row(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(row_count), 0),
                       COALESCE(SUM(size_bytes), 0),
                       COUNT(DISTINCT substr(uploaded_at, 1, 10))
                FROM upload_history
                "#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        let mut stmt = conn.prepare(
            r#"
            SELECT schema_used, COUNT(*) AS uses
            FROM upload_history
            GROUP BY schema_used
            ORDER BY uses DESC, schema_used
            LIMIT ?1
            "#,
        )?;
        let top_schemas = stmt
            .query_map(params![TOP_SCHEMA_LIMIT as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let avg_size_bytes = if total_files > 0 {
            total_size as f64 / total_files as f64
        } else {
            0.0
        };

        Ok(UploadStatistics {
            total_files: total_files as usize,
            total_rows: total_rows as u64,
            total_size_bytes: total_size as u64,
            avg_size_bytes,
            upload_days: upload_days as usize,
            top_schemas,
        })
    }
}
