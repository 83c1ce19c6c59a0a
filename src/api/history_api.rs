// ==========================================
// 上传历史API
// ==========================================
// 职责: 上传历史查询 / 统计 / 已存储对象列表
// 缓存: 最近上传列表按会话缓存，record()/refresh()/invalidate() 显式失效
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::upload::{HistoryFilter, StoredUpload, UploadRecord, UploadStatistics};
use crate::repository::UploadHistoryRepository;
use crate::storage::{ObjectDescriptor, ObjectStore};
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 会话缓存的最近上传条数
pub const RECENT_CACHE_SIZE: usize = 50;

/// 从对象 key 解析分类与日期
///
/// key 结构: [prefix/]subject/sub_subject/YYYY/MM/DD/filename
pub fn parse_stored_key(key: &str) -> Option<(String, String, NaiveDate, String)> {
    let segments: Vec<&str> = key.split('/').collect();
    if segments.len() < 6 {
        return None;
    }
    let tail = &segments[segments.len() - 6..];
    let year: i32 = tail[2].parse().ok()?;
    let month: u32 = tail[3].parse().ok()?;
    let day: u32 = tail[4].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some((
        tail[0].to_string(),
        tail[1].to_string(),
        date,
        tail[5].to_string(),
    ))
}

fn to_stored_upload(object: ObjectDescriptor) -> Option<StoredUpload> {
    let (subject, sub_subject, upload_date, filename) = parse_stored_key(&object.key)?;
    Some(StoredUpload {
        filename,
        subject,
        sub_subject,
        upload_date,
        size_bytes: object.size_bytes,
        last_modified: object.last_modified,
        original_filename: object.metadata.get("original_filename").cloned(),
        schema_used: object.metadata.get("schema_used").cloned(),
        key: object.key,
    })
}

/// 上传历史API
pub struct HistoryApi {
    repo: Arc<UploadHistoryRepository>,
    store: Arc<dyn ObjectStore>,
    recent_cache: Mutex<Option<Arc<Vec<UploadRecord>>>>,
}

impl HistoryApi {
    pub fn new(repo: Arc<UploadHistoryRepository>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            repo,
            store,
            recent_cache: Mutex::new(None),
        }
    }

    fn lock_cache(&self) -> ApiResult<std::sync::MutexGuard<'_, Option<Arc<Vec<UploadRecord>>>>> {
        self.recent_cache
            .lock()
            .map_err(|e| ApiError::InternalError(format!("历史缓存锁获取失败: {}", e)))
    }

    /// 写入上传记录并使缓存失效
    pub fn record(&self, record: &UploadRecord) -> ApiResult<()> {
        self.repo.record(record)?;
        self.invalidate()?;
        Ok(())
    }

    /// 最近上传（会话缓存，最多 RECENT_CACHE_SIZE 条）
    pub fn recent_uploads(&self, limit: usize) -> ApiResult<Vec<UploadRecord>> {
        let mut cache = self.lock_cache()?;
        let records = match cache.as_ref() {
            Some(cached) => Arc::clone(cached),
            None => {
                let loaded = Arc::new(self.repo.query(&HistoryFilter::recent(RECENT_CACHE_SIZE))?);
                debug!(count = loaded.len(), "最近上传缓存已加载");
                *cache = Some(Arc::clone(&loaded));
                loaded
            }
        };
        Ok(records.iter().take(limit).cloned().collect())
    }

    /// 条件查询（不走缓存）
    pub fn query(&self, filter: &HistoryFilter) -> ApiResult<Vec<UploadRecord>> {
        Ok(self.repo.query(filter)?)
    }

    pub fn statistics(&self) -> ApiResult<UploadStatistics> {
        Ok(self.repo.statistics()?)
    }

    /// 丢弃缓存
    pub fn invalidate(&self) -> ApiResult<()> {
        *self.lock_cache()? = None;
        Ok(())
    }

    /// 立即重新加载缓存，返回条数
    pub fn refresh(&self) -> ApiResult<usize> {
        self.invalidate()?;
        let count = self.recent_uploads(RECENT_CACHE_SIZE)?.len();
        info!(count = count, "上传历史已刷新");
        Ok(count)
    }

    /// 列出对象存储中的上传文件（最近在前，最多 limit 个）
    ///
    /// key 不符合分区布局的对象先被过滤，不占用 limit 名额
    pub async fn list_stored_uploads(
        &self,
        prefix: Option<&str>,
        limit: usize,
    ) -> ApiResult<Vec<StoredUpload>> {
        let objects = self.store.list(prefix.unwrap_or(""), usize::MAX).await?;
        Ok(objects
            .into_iter()
            .filter_map(to_stored_upload)
            .take(limit)
            .collect())
    }
}
