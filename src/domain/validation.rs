// ==========================================
// 数据上传平台 - 校验结果模型
// ==========================================
// 职责: 字段级 Outcome / 行级错误描述 / 表级校验报告
// 说明: 每次校验运行重新创建，不落库
// ==========================================

use crate::domain::types::FailureKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ==========================================
// Violation - 单条违规
// ==========================================
// Display 文本必须包含被违反的约束（如 min_value=18），便于用户自行修正
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    #[error("必填字段缺失 (required=true)")]
    MissingRequired,

    #[error("类型不匹配: 期望 {expected}，实际值 '{value}'")]
    TypeMismatch { expected: String, value: String },

    #[error("长度 {actual} 小于下限 (min_length={min})")]
    MinLength { min: usize, actual: usize },

    #[error("长度 {actual} 超过上限 (max_length={max})")]
    MaxLength { max: usize, actual: usize },

    #[error("数值 {value} 低于下限 (min_value={min})")]
    BelowMin { min: f64, value: f64 },

    #[error("数值 {value} 超过上限 (max_value={max})")]
    AboveMax { max: f64, value: f64 },

    #[error("值 '{value}' 不在允许范围内 (allowed_values=[{allowed}])")]
    NotAllowed { value: String, allowed: String },

    #[error("值 '{value}' 不匹配格式 (pattern={pattern})")]
    PatternMismatch { value: String, pattern: String },
}

impl Violation {
    pub fn kind(&self) -> FailureKind {
        match self {
            Violation::MissingRequired => FailureKind::MissingRequired,
            Violation::TypeMismatch { .. } => FailureKind::TypeMismatch,
            _ => FailureKind::ConstraintViolation,
        }
    }

    /// i18n 消息键及参数
    pub fn message_args(&self) -> (&'static str, Vec<(&'static str, String)>) {
        match self {
            Violation::MissingRequired => ("validation.missing_required", vec![]),
            Violation::TypeMismatch { expected, value } => (
                "validation.type_mismatch",
                vec![("expected", expected.clone()), ("value", value.clone())],
            ),
            Violation::MinLength { min, actual } => (
                "validation.min_length",
                vec![("min", min.to_string()), ("actual", actual.to_string())],
            ),
            Violation::MaxLength { max, actual } => (
                "validation.max_length",
                vec![("max", max.to_string()), ("actual", actual.to_string())],
            ),
            Violation::BelowMin { min, value } => (
                "validation.min_value",
                vec![("min", min.to_string()), ("value", value.to_string())],
            ),
            Violation::AboveMax { max, value } => (
                "validation.max_value",
                vec![("max", max.to_string()), ("value", value.to_string())],
            ),
            Violation::NotAllowed { value, allowed } => (
                "validation.allowed_values",
                vec![("value", value.clone()), ("allowed", allowed.clone())],
            ),
            Violation::PatternMismatch { value, pattern } => (
                "validation.pattern",
                vec![("value", value.clone()), ("pattern", pattern.clone())],
            ),
        }
    }
}

// ==========================================
// Outcome - 字段校验结果
// ==========================================
// 红线: TypeMismatch 出现时不再评估约束，因此同一 Outcome 内
//       所有违规同属一个 FailureKind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub violations: Vec<Violation>,
}

impl Outcome {
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn invalid(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn kind(&self) -> Option<FailureKind> {
        self.violations.first().map(Violation::kind)
    }

    /// 合并后的可读原因
    pub fn reason(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }
        Some(
            self.violations
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

// ==========================================
// FieldError - 行级错误描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub row_number: usize,             // 数据行号（从 1 开始，不含表头）
    pub field: String,                 // Schema 字段名
    pub kind: FailureKind,             // 失败分类
    pub value: String,                 // 原始单元格值
    pub reason: String,                // 可读原因
    pub violations: Vec<Violation>,    // 结构化违规明细
}

// ==========================================
// ColumnWarning - 列级警告（不阻断）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnWarning {
    pub column: String,     // 原始列名
    pub canonical: String,  // 归一化列名
    pub message: String,
}

// ==========================================
// ColumnMapping - 原始列名 → 归一化列名
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// 按原始列顺序: (原始列名, 归一化列名)
    pub entries: Vec<(String, String)>,
}

impl ColumnMapping {
    /// 归一化列名对应的列位置
    pub fn position_of(&self, canonical: &str) -> Option<usize> {
        self.entries.iter().position(|(_, c)| c == canonical)
    }

    pub fn canonical_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, c)| c.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==========================================
// ValidationReport - 表级校验报告
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub subject: String,
    pub sub_subject: String,
    pub table_name: String,
    pub accepted: bool,                  // 是否允许上传
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub errors: Vec<FieldError>,         // 有序错误（已截断）
    pub total_failures: usize,           // 失败总数（含截断部分）
    pub suppressed_failures: usize,      // 超出上限未列出的失败数
    pub warnings: Vec<ColumnWarning>,
    pub column_mapping: ColumnMapping,
}

impl ValidationReport {
    /// 按字段统计失败数（含截断部分无法统计，仅统计已列出的错误）
    pub fn failures_by_field(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.errors {
            *counts.entry(e.field.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// 渲染为用户可读的多行文本（当前语言）
    pub fn display_lines(&self) -> Vec<String> {
        use crate::i18n::t_with_args;

        let mut lines = Vec::new();
        if self.accepted {
            lines.push(t_with_args(
                "validation.accepted",
                &[("rows", &self.total_rows.to_string())],
            ));
        } else {
            lines.push(t_with_args(
                "validation.rejected",
                &[
                    ("invalid", &self.invalid_rows.to_string()),
                    ("rows", &self.total_rows.to_string()),
                ],
            ));
        }

        for w in &self.warnings {
            lines.push(t_with_args("validation.unknown_column", &[("column", &w.column)]));
        }

        for e in &self.errors {
            let reason = e
                .violations
                .iter()
                .map(|v| {
                    let (key, args) = v.message_args();
                    let borrowed: Vec<(&str, &str)> =
                        args.iter().map(|(k, v)| (*k, v.as_str())).collect();
                    t_with_args(key, &borrowed)
                })
                .collect::<Vec<_>>()
                .join("; ");
            lines.push(t_with_args(
                "validation.row_error",
                &[
                    ("row", &e.row_number.to_string()),
                    ("field", &e.field),
                    ("reason", &reason),
                ],
            ));
        }

        if self.suppressed_failures > 0 {
            lines.push(t_with_args(
                "validation.suppressed",
                &[("count", &self.suppressed_failures.to_string())],
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_message_contains_constraint() {
        let v = Violation::BelowMin {
            min: 18.0,
            value: 17.0,
        };
        assert!(v.to_string().contains("min_value=18"));
        assert_eq!(v.kind(), FailureKind::ConstraintViolation);
    }

    #[test]
    fn test_outcome_reason_joins_violations() {
        let outcome = Outcome::from_violations(vec![
            Violation::MinLength { min: 3, actual: 2 },
            Violation::NotAllowed {
                value: "xy".to_string(),
                allowed: "abc, def".to_string(),
            },
        ]);
        assert!(!outcome.is_valid());
        assert_eq!(outcome.kind(), Some(FailureKind::ConstraintViolation));
        let reason = outcome.reason().unwrap();
        assert!(reason.contains("min_length=3"));
        assert!(reason.contains("allowed_values=[abc, def]"));
    }

    #[test]
    fn test_valid_outcome_has_no_reason() {
        let outcome = Outcome::valid();
        assert!(outcome.is_valid());
        assert_eq!(outcome.kind(), None);
        assert_eq!(outcome.reason(), None);
    }
}
