// ==========================================
// 数据上传平台 - 上传记录与元数据
// ==========================================
// 职责: 上传历史记录 / 对象元数据 / 历史查询条件 / 统计
// 红线: UploadRecord 创建后不可修改
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 默认处理方标识
pub const DEFAULT_PROCESSED_BY: &str = "data-platform-upload-system";

// ==========================================
// UploadRecord - 上传历史记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub upload_id: String,
    pub filename: String,             // 原始文件名
    pub subject: String,
    pub sub_subject: String,
    pub schema_used: String,          // Schema 表名
    pub uploaded_at: DateTime<Utc>,
    pub destination_key: String,      // 对象存储 key
    pub row_count: usize,
    pub column_count: usize,
    pub size_bytes: u64,              // 上传内容字节数（规范化 CSV）
    pub original_format: String,      // csv / xlsx / xls
}

// ==========================================
// UploadMetadata - 对象元数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub original_filename: String,
    pub upload_timestamp: DateTime<Utc>,
    pub schema_used: String,
    pub subject: String,
    pub sub_subject: String,
    pub row_count: usize,
    pub column_count: usize,
    pub file_size_bytes: u64,
    pub original_format: String,
    pub processed_by: String,
}

impl UploadMetadata {
    /// 转为字符串键值对（对象存储元数据只接受字符串）
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("original_filename".to_string(), self.original_filename.clone());
        map.insert(
            "upload_timestamp".to_string(),
            self.upload_timestamp.to_rfc3339(),
        );
        map.insert("schema_used".to_string(), self.schema_used.clone());
        map.insert("subject".to_string(), self.subject.clone());
        map.insert("sub_subject".to_string(), self.sub_subject.clone());
        map.insert("row_count".to_string(), self.row_count.to_string());
        map.insert("column_count".to_string(), self.column_count.to_string());
        map.insert("file_size_bytes".to_string(), self.file_size_bytes.to_string());
        map.insert("original_format".to_string(), self.original_format.clone());
        map.insert("processed_by".to_string(), self.processed_by.clone());
        map
    }
}

// ==========================================
// HistoryFilter - 历史查询条件
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub subject: Option<String>,
    pub sub_subject: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn for_category(subject: &str, sub_subject: &str) -> Self {
        Self {
            subject: Some(subject.to_string()),
            sub_subject: Some(sub_subject.to_string()),
            ..Default::default()
        }
    }
}

// ==========================================
// UploadStatistics - 上传统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadStatistics {
    pub total_files: usize,
    pub total_rows: u64,
    pub total_size_bytes: u64,
    pub avg_size_bytes: f64,
    pub upload_days: usize,                 // 有上传的天数
    pub top_schemas: Vec<(String, usize)>,  // 使用最多的 Schema（最多 5 个）
}

// ==========================================
// StoredUpload - 从对象 key 解析出的上传条目
// ==========================================
// key 结构: [prefix/]subject/sub_subject/YYYY/MM/DD/filename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUpload {
    pub key: String,
    pub filename: String,
    pub subject: String,
    pub sub_subject: String,
    pub upload_date: NaiveDate,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
    pub original_filename: Option<String>,
    pub schema_used: Option<String>,
}

impl StoredUpload {
    pub fn size_kb(&self) -> f64 {
        (self.size_bytes as f64 / 1024.0 * 100.0).round() / 100.0
    }
}

// ==========================================
// FileInfo - 上传文件基本信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub extension: String,
}

impl FileInfo {
    /// 人类可读的文件大小
    pub fn size_formatted(&self) -> String {
        format_size(self.size)
    }
}

pub fn format_size(size: u64) -> String {
    if size < 1024 {
        format!("{} bytes", size)
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
    }
}
