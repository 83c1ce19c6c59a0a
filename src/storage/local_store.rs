// ==========================================
// 数据上传平台 - 本地目录对象存储
// ==========================================
// 布局: <root>/<key> 存对象内容，<root>/<key>.meta.json 存元数据
// ==========================================

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::object_store::{sort_and_limit, validate_key, ObjectDescriptor, ObjectStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const METADATA_SUFFIX: &str = ".meta.json";

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> StorageResult<PathBuf> {
        if !validate_key(key) || key.ends_with(METADATA_SUFFIX) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

fn metadata_path(object_path: &Path) -> PathBuf {
    let mut name = object_path.as_os_str().to_owned();
    name.push(METADATA_SUFFIX);
    PathBuf::from(name)
}

/// 读取单个对象描述（同步，在 blocking 线程中调用）
fn describe_object(root: &Path, path: &Path) -> StorageResult<ObjectDescriptor> {
    let meta = fs::metadata(path)?;
    let last_modified: DateTime<Utc> = meta.modified()?.into();

    let sidecar = metadata_path(path);
    let metadata: BTreeMap<String, String> = if sidecar.exists() {
        serde_json::from_slice(&fs::read(&sidecar)?)?
    } else {
        BTreeMap::new()
    };

    let key = path
        .strip_prefix(root)
        .map_err(|e| StorageError::Io(e.to_string()))?
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/");

    Ok(ObjectDescriptor {
        key,
        size_bytes: meta.len(),
        last_modified,
        metadata,
    })
}

fn walk(root: &Path, dir: &Path, prefix: &str, out: &mut Vec<ObjectDescriptor>) -> StorageResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(root, &path, prefix, out)?;
        } else if !path.to_string_lossy().ends_with(METADATA_SUFFIX) {
            let descriptor = describe_object(root, &path)?;
            if descriptor.key.starts_with(prefix) {
                out.push(descriptor);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        metadata: BTreeMap<String, String>,
    ) -> StorageResult<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let sidecar = serde_json::to_vec_pretty(&metadata)?;
        tokio::fs::write(&path, &body).await?;
        tokio::fs::write(metadata_path(&path), sidecar).await?;

        debug!(key = key, bytes = body.len(), "对象已写入本地存储");
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectDescriptor>> {
        let root = self.root.clone();
        let prefix = prefix.to_string();

        let objects = tokio::task::spawn_blocking(move || -> StorageResult<Vec<ObjectDescriptor>> {
            let mut out = Vec::new();
            if root.exists() {
                walk(&root, &root, &prefix, &mut out)?;
            }
            Ok(out)
        })
        .await??;

        Ok(sort_and_limit(objects, limit))
    }

    async fn head(&self, key: &str) -> StorageResult<Option<ObjectDescriptor>> {
        let path = self.object_path(key)?;
        let root = self.root.clone();

        tokio::task::spawn_blocking(move || {
            if path.is_file() {
                describe_object(&root, &path).map(Some)
            } else {
                Ok(None)
            }
        })
        .await?
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}
