// ==========================================
// 数据上传平台 - 记录校验器
// ==========================================
// 职责: 按 Schema 逐行逐字段校验上传表格，汇总为 ValidationReport
// 流程: 表头归一化（每次运行一次） → 规则定位列 → 逐行校验 → 汇总
// 红线: DuplicateColumn 中断运行；字段级失败只累积，不中断
// ==========================================

use crate::domain::schema::{FieldRule, SchemaDefinition};
use crate::domain::table::UploadedTable;
use crate::domain::validation::{ColumnWarning, FieldError, ValidationReport};
use crate::importer::column_normalizer::ColumnNormalizer;
use crate::importer::error::ImportResult;
use crate::importer::field_validator::{validate_field, ValidatorOptions};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// 报告中最多列出的错误条数
pub const DEFAULT_MAX_REPORTED_ERRORS: usize = 100;

// ==========================================
// RecordValidator
// ==========================================
#[derive(Debug, Clone)]
pub struct RecordValidator {
    normalizer: ColumnNormalizer,
    options: ValidatorOptions,
    max_reported_errors: usize,
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new(
            ColumnNormalizer::default(),
            ValidatorOptions::default(),
            DEFAULT_MAX_REPORTED_ERRORS,
        )
    }
}

impl RecordValidator {
    pub fn new(
        normalizer: ColumnNormalizer,
        options: ValidatorOptions,
        max_reported_errors: usize,
    ) -> Self {
        Self {
            normalizer,
            options,
            max_reported_errors,
        }
    }

    pub fn with_max_reported_errors(mut self, max_reported_errors: usize) -> Self {
        self.max_reported_errors = max_reported_errors;
        self
    }

    pub fn normalizer(&self) -> &ColumnNormalizer {
        &self.normalizer
    }

    /// 校验整张表
    ///
    /// # 返回
    /// - Ok(ValidationReport): accepted 当且仅当所有行有效（0 行视为通过）
    /// - Err(DuplicateColumn): 两个表头归一化后相同
    #[instrument(skip(self, schema, table), fields(
        subject = %schema.subject,
        sub_subject = %schema.sub_subject,
        source = %table.source_name,
    ))]
    pub fn validate(
        &self,
        schema: &SchemaDefinition,
        table: &UploadedTable,
    ) -> ImportResult<ValidationReport> {
        let mapping = self.normalizer.map_headers(&table.headers)?;

        // 规则 → 列位置（None 表示文件中没有该列）
        let bound: Vec<(&FieldRule, Option<usize>)> = schema
            .fields
            .iter()
            .map(|rule| {
                let canonical = self.normalizer.normalize(&rule.name);
                (rule, mapping.position_of(&canonical))
            })
            .collect();

        let known: HashSet<String> = schema
            .fields
            .iter()
            .map(|rule| self.normalizer.normalize(&rule.name))
            .collect();

        let warnings: Vec<ColumnWarning> = mapping
            .entries
            .iter()
            .filter(|(_, canonical)| !known.contains(canonical))
            .map(|(original, canonical)| ColumnWarning {
                column: original.clone(),
                canonical: canonical.clone(),
                message: format!("列 '{}' 不在 Schema 中，将原样保留", original),
            })
            .collect();

        for (rule, position) in &bound {
            if position.is_none() {
                debug!(field = %rule.name, required = rule.required, "文件中缺少 Schema 字段");
            }
        }

        let mut errors = Vec::new();
        let mut total_failures = 0usize;
        let mut invalid_rows = 0usize;

        for (idx, cells) in table.rows.iter().enumerate() {
            let row_number = idx + 1;
            let mut row_valid = true;

            for (rule, position) in &bound {
                let value = position.and_then(|p| cells.get(p)).map(String::as_str);
                let outcome = validate_field(value, rule, &self.options);
                if outcome.is_valid() {
                    continue;
                }

                row_valid = false;
                total_failures += 1;
                if errors.len() < self.max_reported_errors {
                    if let (Some(kind), Some(reason)) = (outcome.kind(), outcome.reason()) {
                        errors.push(FieldError {
                            row_number,
                            field: rule.name.clone(),
                            kind,
                            value: value.unwrap_or_default().to_string(),
                            reason,
                            violations: outcome.violations,
                        });
                    }
                }
            }

            if !row_valid {
                invalid_rows += 1;
            }
        }

        let total_rows = table.row_count();
        let report = ValidationReport {
            subject: schema.subject.clone(),
            sub_subject: schema.sub_subject.clone(),
            table_name: schema.table_name.clone(),
            accepted: invalid_rows == 0,
            total_rows,
            valid_rows: total_rows - invalid_rows,
            invalid_rows,
            suppressed_failures: total_failures - errors.len(),
            errors,
            total_failures,
            warnings,
            column_mapping: mapping,
        };

        info!(
            accepted = report.accepted,
            total_rows = report.total_rows,
            invalid_rows = report.invalid_rows,
            total_failures = report.total_failures,
            unknown_columns = report.warnings.len(),
            "表格校验完成"
        );

        Ok(report)
    }
}
