// ==========================================
// 数据上传平台 - 对象存储 Trait
// ==========================================
// 职责: 定义对象存储协作接口（不包含实现）
// 实现者: LocalObjectStore（本地目录），InMemoryObjectStore（测试）
// ==========================================

use crate::storage::error::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 对象描述（list/head 返回）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub key: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 写入对象（同 key 覆盖）
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        metadata: BTreeMap<String, String>,
    ) -> StorageResult<()>;

    /// 按前缀列出对象，最近修改在前，最多 limit 个
    async fn list(&self, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectDescriptor>>;

    /// 读取对象描述，不存在返回 None
    async fn head(&self, key: &str) -> StorageResult<Option<ObjectDescriptor>>;

    /// 展示用目标描述（如 bucket/目录）
    fn describe(&self) -> String;
}

/// key 合法性: 非空、相对路径、不含 '..' 段与空段
pub fn validate_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

/// 最近修改在前，同时刻按 key 排序，截断到 limit
pub(crate) fn sort_and_limit(mut objects: Vec<ObjectDescriptor>, limit: usize) -> Vec<ObjectDescriptor> {
    objects.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| a.key.cmp(&b.key))
    });
    objects.truncate(limit);
    objects
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("vendas/produtos/2024/01/15/a.csv"));
        assert!(!validate_key(""));
        assert!(!validate_key("/abs/a.csv"));
        assert!(!validate_key("vendas/../a.csv"));
        assert!(!validate_key("vendas//a.csv"));
    }
}
