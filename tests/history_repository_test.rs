// ==========================================
// 上传历史仓储集成测试
// ==========================================
// 测试目标: 文件库持久化、重开后可读、历史缓存失效
// ==========================================

use chrono::{TimeZone, Utc};
use data_upload::api::HistoryApi;
use data_upload::domain::upload::{HistoryFilter, UploadRecord};
use data_upload::repository::UploadHistoryRepository;
use data_upload::storage::InMemoryObjectStore;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn sample_record(id: &str, hour: u32) -> UploadRecord {
    UploadRecord {
        upload_id: id.to_string(),
        filename: "vendas.xlsx".to_string(),
        subject: "vendas".to_string(),
        sub_subject: "produtos".to_string(),
        schema_used: "produtos".to_string(),
        uploaded_at: Utc.with_ymd_and_hms(2024, 1, 15, hour, 30, 22).unwrap(),
        destination_key: format!("vendas/produtos/2024/01/15/vendas_20240115{:02}3022.csv", hour),
        row_count: 42,
        column_count: 4,
        size_bytes: 2048,
        original_format: "xlsx".to_string(),
    }
}

#[test]
fn test_history_persists_across_reopen() {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap().to_string();

    {
        let repo = UploadHistoryRepository::new(&db_path).unwrap();
        repo.record(&sample_record("u1", 9)).unwrap();
        repo.record(&sample_record("u2", 14)).unwrap();
    }

    let repo = UploadHistoryRepository::new(&db_path).unwrap();
    assert_eq!(repo.count().unwrap(), 2);

    let found = repo.find_by_id("u2").unwrap().unwrap();
    assert_eq!(found, sample_record("u2", 14));

    let newest = repo.query(&HistoryFilter::recent(1)).unwrap();
    assert_eq!(newest[0].upload_id, "u2");
}

#[test]
fn test_category_filter_is_exact() {
    let temp_file = NamedTempFile::new().unwrap();
    let repo = UploadHistoryRepository::new(temp_file.path().to_str().unwrap()).unwrap();
    repo.record(&sample_record("u1", 9)).unwrap();

    let hits = repo
        .query(&HistoryFilter::for_category("vendas", "produtos"))
        .unwrap();
    assert_eq!(hits.len(), 1);

    let misses = repo
        .query(&HistoryFilter::for_category("vendas", "servicos"))
        .unwrap();
    assert!(misses.is_empty());
}

#[test]
fn test_history_api_cache_refreshes_after_record() {
    let temp_file = NamedTempFile::new().unwrap();
    let repo =
        Arc::new(UploadHistoryRepository::new(temp_file.path().to_str().unwrap()).unwrap());
    let api = HistoryApi::new(Arc::clone(&repo), Arc::new(InMemoryObjectStore::new()));

    assert!(api.recent_uploads(10).unwrap().is_empty());

    // 绕过 API 直接写库: 缓存仍为旧值
    repo.record(&sample_record("u1", 9)).unwrap();
    assert!(api.recent_uploads(10).unwrap().is_empty());
    assert_eq!(api.refresh().unwrap(), 1);

    // 经 API 写入: 缓存自动失效
    api.record(&sample_record("u2", 14)).unwrap();
    let recent = api.recent_uploads(10).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].upload_id, "u2");
    assert_eq!(api.recent_uploads(1).unwrap().len(), 1);
}
