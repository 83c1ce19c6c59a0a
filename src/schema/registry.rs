// ==========================================
// 数据上传平台 - Schema 注册表
// ==========================================
// 职责: 扫描 Schema 目录，按 (subject, sub_subject) 提供查找
// 缓存: 显式对象，reload()/invalidate() 显式失效；
//       调用方持有 Arc 快照，重载不影响进行中的校验
// 红线: 单个文件格式错误只跳过并记录，不使整个注册表失败
// ==========================================

use crate::domain::schema::SchemaDefinition;
use crate::importer::column_normalizer::ColumnNormalizer;
use crate::schema::error::{SchemaError, SchemaResult};
use crate::schema::loader::load_schema_file;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// 分类查找键: 大小写不敏感，空格与下划线等价
pub fn category_key(subject: &str, sub_subject: &str) -> (String, String) {
    fn fold(s: &str) -> String {
        s.trim().to_lowercase().replace(' ', "_")
    }
    (fold(subject), fold(sub_subject))
}

// ==========================================
// SkippedSchema - 被跳过的文件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSchema {
    pub path: PathBuf,
    pub reason: String,
}

// ==========================================
// SchemaCatalog - 一次扫描的结果（不可变快照）
// ==========================================
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    schemas: BTreeMap<(String, String), Arc<SchemaDefinition>>,
    skipped: Vec<SkippedSchema>,
}

impl SchemaCatalog {
    /// 扫描目录（文件名排序，同一分类先出现者生效）
    pub fn scan(dir: &Path, normalizer: &ColumnNormalizer) -> SchemaResult<Self> {
        let mut catalog = SchemaCatalog::default();

        if !dir.exists() {
            warn!(dir = %dir.display(), "Schema 目录不存在，注册表为空");
            return Ok(catalog);
        }

        let entries = fs::read_dir(dir).map_err(|e| SchemaError::DirectoryError {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("yaml") | Some("yml")
                    )
            })
            .collect();
        paths.sort();

        for path in paths {
            match load_schema_file(&path, normalizer) {
                Ok(schema) => {
                    let key = category_key(&schema.subject, &schema.sub_subject);
                    if let Some(existing) = catalog.schemas.get(&key) {
                        let reason = format!(
                            "分类 {}/{} 已由 {} 定义",
                            schema.subject,
                            schema.sub_subject,
                            existing
                                .source_file
                                .as_ref()
                                .map(|p| p.display().to_string())
                                .unwrap_or_default()
                        );
                        warn!(file = %path.display(), reason = %reason, "跳过重复分类的 Schema");
                        catalog.skipped.push(SkippedSchema { path, reason });
                        continue;
                    }
                    catalog.schemas.insert(key, Arc::new(schema));
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "跳过格式错误的 Schema 文件");
                    catalog.skipped.push(SkippedSchema {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(catalog)
    }

    pub fn get(&self, subject: &str, sub_subject: &str) -> Option<Arc<SchemaDefinition>> {
        self.schemas.get(&category_key(subject, sub_subject)).cloned()
    }

    /// 全部分类（按 subject, sub_subject 排序）
    pub fn categories(&self) -> Vec<(String, String)> {
        let mut categories: Vec<(String, String)> =
            self.schemas.values().map(|s| s.category()).collect();
        categories.sort();
        categories
    }

    pub fn skipped(&self) -> &[SkippedSchema] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

// ==========================================
// SchemaRegistry
// ==========================================
pub struct SchemaRegistry {
    schema_dir: PathBuf,
    normalizer: ColumnNormalizer,
    cache: Mutex<Option<Arc<SchemaCatalog>>>,
}

impl SchemaRegistry {
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self::with_normalizer(schema_dir, ColumnNormalizer::default())
    }

    pub fn with_normalizer(schema_dir: impl Into<PathBuf>, normalizer: ColumnNormalizer) -> Self {
        Self {
            schema_dir: schema_dir.into(),
            normalizer,
            cache: Mutex::new(None),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// 当前快照（首次访问时扫描目录）
    pub fn snapshot(&self) -> SchemaResult<Arc<SchemaCatalog>> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| SchemaError::LockError(e.to_string()))?;

        if let Some(catalog) = cache.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let catalog = Arc::new(SchemaCatalog::scan(&self.schema_dir, &self.normalizer)?);
        info!(
            dir = %self.schema_dir.display(),
            schemas = catalog.len(),
            skipped = catalog.skipped().len(),
            "Schema 注册表已加载"
        );
        *cache = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// 按分类加载 Schema
    #[instrument(skip(self))]
    pub fn load(&self, subject: &str, sub_subject: &str) -> SchemaResult<Arc<SchemaDefinition>> {
        self.snapshot()?
            .get(subject, sub_subject)
            .ok_or_else(|| SchemaError::SchemaNotFound {
                subject: subject.to_string(),
                sub_subject: sub_subject.to_string(),
            })
    }

    pub fn list_categories(&self) -> SchemaResult<Vec<(String, String)>> {
        Ok(self.snapshot()?.categories())
    }

    /// 去重排序后的 subject 列表
    pub fn subjects(&self) -> SchemaResult<Vec<String>> {
        let mut subjects: Vec<String> = self
            .list_categories()?
            .into_iter()
            .map(|(subject, _)| subject)
            .collect();
        subjects.dedup();
        Ok(subjects)
    }

    /// 某 subject 下的 sub_subject 列表
    pub fn sub_subjects(&self, subject: &str) -> SchemaResult<Vec<String>> {
        let wanted = category_key(subject, "").0;
        Ok(self
            .list_categories()?
            .into_iter()
            .filter(|(s, _)| category_key(s, "").0 == wanted)
            .map(|(_, sub)| sub)
            .collect())
    }

    pub fn skipped(&self) -> SchemaResult<Vec<SkippedSchema>> {
        Ok(self.snapshot()?.skipped().to_vec())
    }

    /// 丢弃缓存，下次访问时重新扫描
    pub fn invalidate(&self) -> SchemaResult<()> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| SchemaError::LockError(e.to_string()))?;
        *cache = None;
        Ok(())
    }

    /// 立即重新扫描，返回有效 Schema 数量
    pub fn reload(&self) -> SchemaResult<usize> {
        self.invalidate()?;
        Ok(self.snapshot()?.len())
    }
}
