// ==========================================
// 数据上传平台 - 内存对象存储
// ==========================================
// 用途: 测试与演示；可构造为"始终失败"以模拟存储不可用
// ==========================================

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::object_store::{sort_and_limit, validate_key, ObjectDescriptor, ObjectStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    descriptor: ObjectDescriptor,
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    failure: Option<String>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有写入都以给定消息失败
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            objects: RwLock::default(),
            failure: Some(message.into()),
        }
    }

    /// 读取对象内容
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).map(|o| o.body.clone())
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        metadata: BTreeMap<String, String>,
    ) -> StorageResult<()> {
        if let Some(message) = &self.failure {
            return Err(StorageError::Unavailable(message.clone()));
        }
        if !validate_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        let descriptor = ObjectDescriptor {
            key: key.to_string(),
            size_bytes: body.len() as u64,
            last_modified: Utc::now(),
            metadata,
        };
        self.objects
            .write()
            .await
            .insert(key.to_string(), StoredObject { body, descriptor });
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectDescriptor>> {
        let objects = self
            .objects
            .read()
            .await
            .values()
            .filter(|o| o.descriptor.key.starts_with(prefix))
            .map(|o| o.descriptor.clone())
            .collect();
        Ok(sort_and_limit(objects, limit))
    }

    async fn head(&self, key: &str) -> StorageResult<Option<ObjectDescriptor>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|o| o.descriptor.clone()))
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_store_reports_message_verbatim() {
        let store = InMemoryObjectStore::failing("bucket indisponível");
        let err = store
            .put("a/b.csv", Vec::new(), BTreeMap::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bucket indisponível"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = InMemoryObjectStore::new();
        store
            .put("a/b.csv", b"x".to_vec(), BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(store.get("a/b.csv").await, Some(b"x".to_vec()));
        assert_eq!(store.head("a/b.csv").await.unwrap().unwrap().size_bytes, 1);
    }
}
