// ==========================================
// 数据上传API
// ==========================================
// 职责: 上传主流程编排
// 流程: 读取文件 → 按分类取 Schema 快照 → 校验 → 规范化 CSV
//       → 分区 key → 写入对象存储 → 记录历史
// 红线: 校验未通过不上传；存储失败原样上抛、不重试；
//       历史记录失败不回滚已成功的上传（receipt 标记 history_recorded=false）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::history_api::HistoryApi;
use crate::config::ValidationConfigReader;
use crate::domain::schema::SchemaDefinition;
use crate::domain::table::UploadedTable;
use crate::domain::upload::{UploadMetadata, UploadRecord, DEFAULT_PROCESSED_BY};
use crate::domain::validation::ValidationReport;
use crate::importer::{
    canonical_layout, strip_diacritics, write_canonical_csv, ColumnNormalizer, ReadOptions,
    RecordValidator, TablePreview, UniversalFileParser, ValidatorOptions,
};
use crate::schema::SchemaRegistry;
use crate::storage::ObjectStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 清洗后为空的 key 段使用的占位名
const EMPTY_SEGMENT: &str = "unnamed";

/// 上传结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub record: UploadRecord,
    pub metadata: UploadMetadata,
    pub report: ValidationReport,
    /// 存储目标描述（如 file:///data/objects）
    pub storage_target: String,
    /// 历史是否成功写入
    pub history_recorded: bool,
}

/// key 段清洗: 去重音、小写、空白转 '_'，仅保留 [a-z0-9._-]
pub fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = strip_diacritics(raw.trim())
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '_' || c == '.').to_string();
    if cleaned.is_empty() {
        EMPTY_SEGMENT.to_string()
    } else {
        cleaned
    }
}

/// 生成分区 key
///
/// 格式: [prefix/]subject/sub_subject/YYYY/MM/DD/<basename>_<YYYYMMDDHHMMSS>.csv
pub fn destination_key(
    prefix: Option<&str>,
    subject: &str,
    sub_subject: &str,
    original_filename: &str,
    uploaded_at: DateTime<Utc>,
) -> String {
    let basename = Path::new(original_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut key = String::new();
    if let Some(prefix) = prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        key.push_str(prefix);
        key.push('/');
    }
    key.push_str(&format!(
        "{}/{}/{}/{}_{}.csv",
        sanitize_segment(subject),
        sanitize_segment(sub_subject),
        uploaded_at.format("%Y/%m/%d"),
        sanitize_segment(&basename),
        uploaded_at.format("%Y%m%d%H%M%S"),
    ));
    key
}

/// 数据上传API
pub struct UploadApi {
    registry: Arc<SchemaRegistry>,
    store: Arc<dyn ObjectStore>,
    history: Arc<HistoryApi>,
    config: Arc<dyn ValidationConfigReader>,
    normalizer: ColumnNormalizer,
    parser: UniversalFileParser,
    key_prefix: Option<String>,
}

impl UploadApi {
    /// 创建新的UploadApi实例
    pub fn new(
        registry: Arc<SchemaRegistry>,
        store: Arc<dyn ObjectStore>,
        history: Arc<HistoryApi>,
        config: Arc<dyn ValidationConfigReader>,
        key_prefix: Option<String>,
    ) -> Self {
        Self {
            registry,
            store,
            history,
            config,
            normalizer: ColumnNormalizer::default(),
            parser: UniversalFileParser,
            key_prefix,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    fn config_err(e: Box<dyn std::error::Error>) -> ApiError {
        ApiError::ConfigError(e.to_string())
    }

    /// 按配置构造记录校验器
    fn record_validator(&self) -> ApiResult<RecordValidator> {
        let options = ValidatorOptions {
            date_formats: self.config.get_date_formats().map_err(Self::config_err)?,
            datetime_formats: self.config.get_datetime_formats().map_err(Self::config_err)?,
        };
        let max_errors = self.config.get_max_reported_errors().map_err(Self::config_err)?;
        Ok(RecordValidator::new(self.normalizer.clone(), options, max_errors))
    }

    /// 读取文件（文件大小上限取自配置）
    pub fn read_file(&self, file_path: &Path, options: &ReadOptions) -> ApiResult<UploadedTable> {
        let mut options = options.clone();
        options.max_file_size_mb = self.config.get_max_file_size_mb().map_err(Self::config_err)?;
        Ok(self.parser.parse(file_path, &options)?)
    }

    /// 文件预览（不依赖 Schema）
    pub fn preview_file(&self, file_path: &Path, options: &ReadOptions) -> ApiResult<TablePreview> {
        let table = self.read_file(file_path, options)?;
        let rows = self.config.get_preview_rows().map_err(Self::config_err)?;
        let info = self.parser.file_info(file_path)?;
        Ok(TablePreview::build(&table, rows, &self.normalizer, Some(info)))
    }

    /// Excel 工作表列表
    pub fn list_sheets(&self, file_path: &Path) -> ApiResult<Vec<String>> {
        Ok(self.parser.list_sheets(file_path)?)
    }

    /// 按分类校验已解析的表格
    pub fn validate_table(
        &self,
        subject: &str,
        sub_subject: &str,
        table: &UploadedTable,
    ) -> ApiResult<ValidationReport> {
        let schema = self.registry.load(subject, sub_subject)?;
        self.validate_with(&schema, table)
    }

    fn validate_with(
        &self,
        schema: &SchemaDefinition,
        table: &UploadedTable,
    ) -> ApiResult<ValidationReport> {
        Ok(self.record_validator()?.validate(schema, table)?)
    }

    /// 读取并校验文件
    pub fn validate_file(
        &self,
        file_path: &Path,
        subject: &str,
        sub_subject: &str,
        options: &ReadOptions,
    ) -> ApiResult<ValidationReport> {
        let table = self.read_file(file_path, options)?;
        self.validate_table(subject, sub_subject, &table)
    }

    /// 预览目标 key（不上传）
    pub fn destination_key_preview(
        &self,
        subject: &str,
        sub_subject: &str,
        original_filename: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<String> {
        let schema = self.registry.load(subject, sub_subject)?;
        Ok(destination_key(
            self.key_prefix.as_deref(),
            &schema.subject,
            &schema.sub_subject,
            original_filename,
            at,
        ))
    }

    /// 上传文件（当前时间作为上传时间）
    pub async fn upload_file(
        &self,
        file_path: &Path,
        subject: &str,
        sub_subject: &str,
        options: &ReadOptions,
    ) -> ApiResult<UploadReceipt> {
        let info = self.parser.file_info(file_path)?;
        let table = self.read_file(file_path, options)?;
        self.upload_table(subject, sub_subject, &table, &info.name, &info.extension, Utc::now())
            .await
    }

    /// 上传已解析的表格
    ///
    /// # 返回
    /// - Ok(UploadReceipt): 已写入对象存储
    /// - Err(ValidationFailed): 校验未通过，未上传
    /// - Err(StorageFailure): 存储失败（原样消息）
    #[instrument(skip(self, table), fields(rows = table.row_count()))]
    pub async fn upload_table(
        &self,
        subject: &str,
        sub_subject: &str,
        table: &UploadedTable,
        original_filename: &str,
        original_format: &str,
        uploaded_at: DateTime<Utc>,
    ) -> ApiResult<UploadReceipt> {
        // 整次运行持有同一份 Schema 快照
        let schema = self.registry.load(subject, sub_subject)?;

        let report = self.validate_with(&schema, table)?;
        if !report.accepted {
            warn!(
                invalid_rows = report.invalid_rows,
                total_failures = report.total_failures,
                "校验未通过，取消上传"
            );
            return Err(ApiError::ValidationFailed(Box::new(report)));
        }

        let layout = canonical_layout(&schema, &report.column_mapping, &self.normalizer);
        let body = write_canonical_csv(table, &layout)?;

        let key = destination_key(
            self.key_prefix.as_deref(),
            &schema.subject,
            &schema.sub_subject,
            original_filename,
            uploaded_at,
        );

        let metadata = UploadMetadata {
            original_filename: original_filename.to_string(),
            upload_timestamp: uploaded_at,
            schema_used: schema.table_name.clone(),
            subject: schema.subject.clone(),
            sub_subject: schema.sub_subject.clone(),
            row_count: table.row_count(),
            column_count: layout.len(),
            file_size_bytes: body.len() as u64,
            original_format: original_format.to_lowercase(),
            processed_by: DEFAULT_PROCESSED_BY.to_string(),
        };

        let size_bytes = body.len() as u64;
        self.store.put(&key, body, metadata.to_map()).await?;
        info!(key = %key, bytes = size_bytes, target = %self.store.describe(), "文件已上传");

        let record = UploadRecord {
            upload_id: Uuid::new_v4().to_string(),
            filename: original_filename.to_string(),
            subject: schema.subject.clone(),
            sub_subject: schema.sub_subject.clone(),
            schema_used: schema.table_name.clone(),
            uploaded_at,
            destination_key: key,
            row_count: table.row_count(),
            column_count: layout.len(),
            size_bytes,
            original_format: metadata.original_format.clone(),
        };

        let history_recorded = match self.history.record(&record) {
            Ok(()) => true,
            Err(e) => {
                warn!(upload_id = %record.upload_id, error = %e, "上传历史写入失败，上传本身已成功");
                false
            }
        };

        Ok(UploadReceipt {
            record,
            metadata,
            report,
            storage_target: self.store.describe(),
            history_recorded,
        })
    }
}
