// ==========================================
// 数据上传平台 - 字段校验器
// ==========================================
// 职责: (单元格值, 字段规则) → Outcome
// 流程: 缺失判定 → 类型检查（按 FieldType 分派） → 约束检查（逻辑 AND）
// 红线: 纯函数，不读写任何共享状态
// ==========================================

use crate::domain::schema::FieldRule;
use crate::domain::types::FieldType;
use crate::domain::validation::{Outcome, Violation};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// 默认日期格式
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y", "%m-%d-%Y",
];

/// 默认日期时间格式
pub const DEFAULT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
];

/// 电话号码有效位数范围
pub const MIN_PHONE_DIGITS: usize = 8;
pub const MAX_PHONE_DIGITS: usize = 15;

const TRUTHY: &[&str] = &["true", "1", "yes", "sim", "verdadeiro"];
const FALSY: &[&str] = &["false", "0", "no", "não", "nao", "falso"];

const PHONE_SEPARATORS: &[char] = &[' ', '-', '(', ')', '.', '/'];

// ==========================================
// ValidatorOptions - 校验参数
// ==========================================
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    pub date_formats: Vec<String>,
    pub datetime_formats: Vec<String>,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
            datetime_formats: DEFAULT_DATETIME_FORMATS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ==========================================
// TypedValue - 类型检查通过后的值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text,
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Boolean(bool),
}

impl TypedValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            TypedValue::Integer(n) => Some(*n as f64),
            TypedValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

type TypeCheck = fn(&str, &FieldRule, &ValidatorOptions) -> Result<TypedValue, Violation>;

/// 类型 → 类型检查函数（封闭分派表）
fn type_check_for(field_type: FieldType) -> TypeCheck {
    match field_type {
        FieldType::String => check_string,
        FieldType::Integer => check_integer,
        FieldType::Float => check_float,
        FieldType::Date => check_date,
        FieldType::DateTime => check_datetime,
        FieldType::Email => check_email,
        FieldType::Phone => check_phone,
        FieldType::Boolean => check_boolean,
    }
}

/// 校验单个字段值
///
/// # 参数
/// - value: 单元格原始值（None 表示该列不存在）
/// - rule: 字段规则
/// - options: 日期格式等参数
///
/// # 规则
/// - 空值 + required → MissingRequired（与类型无关）
/// - 空值 + 非必填 → 直接通过，不做类型检查
/// - 类型检查失败 → TypeMismatch，不再检查约束
/// - 约束全部按 AND 评估，违规全部列出
pub fn validate_field(value: Option<&str>, rule: &FieldRule, options: &ValidatorOptions) -> Outcome {
    let text = match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(text) => text,
        None if rule.required => return Outcome::invalid(Violation::MissingRequired),
        None => return Outcome::valid(),
    };

    let typed = match type_check_for(rule.field_type)(text, rule, options) {
        Ok(typed) => typed,
        Err(violation) => return Outcome::invalid(violation),
    };

    Outcome::from_violations(check_constraints(text, &typed, rule))
}

// ==========================================
// 类型检查
// ==========================================

fn check_string(_text: &str, _rule: &FieldRule, _options: &ValidatorOptions) -> Result<TypedValue, Violation> {
    Ok(TypedValue::Text)
}

fn check_integer(text: &str, _rule: &FieldRule, _options: &ValidatorOptions) -> Result<TypedValue, Violation> {
    text.parse::<i64>()
        .map(TypedValue::Integer)
        .map_err(|_| mismatch("int", text))
}

fn check_float(text: &str, _rule: &FieldRule, _options: &ValidatorOptions) -> Result<TypedValue, Violation> {
    parse_decimal(text)
        .map(TypedValue::Float)
        .ok_or_else(|| mismatch("float", text))
}

fn check_date(text: &str, rule: &FieldRule, options: &ValidatorOptions) -> Result<TypedValue, Violation> {
    let formats = rule.formats.as_ref().unwrap_or(&options.date_formats);
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(TypedValue::Date)
        .ok_or_else(|| mismatch(&format!("date ({})", formats.join(" | ")), text))
}

fn check_datetime(text: &str, rule: &FieldRule, options: &ValidatorOptions) -> Result<TypedValue, Violation> {
    let formats = rule.formats.as_ref().unwrap_or(&options.datetime_formats);
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_utc()))
        .map(TypedValue::DateTime)
        .ok_or_else(|| mismatch(&format!("datetime ({})", formats.join(" | ")), text))
}

fn check_email(text: &str, _rule: &FieldRule, _options: &ValidatorOptions) -> Result<TypedValue, Violation> {
    if is_email(text) {
        Ok(TypedValue::Text)
    } else {
        Err(mismatch("email (local@dominio.tld)", text))
    }
}

fn check_phone(text: &str, _rule: &FieldRule, _options: &ValidatorOptions) -> Result<TypedValue, Violation> {
    if is_phone(text) {
        Ok(TypedValue::Text)
    } else {
        Err(mismatch(
            &format!("phone ({}-{} dígitos)", MIN_PHONE_DIGITS, MAX_PHONE_DIGITS),
            text,
        ))
    }
}

fn check_boolean(text: &str, _rule: &FieldRule, _options: &ValidatorOptions) -> Result<TypedValue, Violation> {
    parse_bool(text)
        .map(TypedValue::Boolean)
        .ok_or_else(|| mismatch("bool (true/false, 1/0, sim/não)", text))
}

fn mismatch(expected: &str, text: &str) -> Violation {
    Violation::TypeMismatch {
        expected: expected.to_string(),
        value: text.to_string(),
    }
}

// ==========================================
// 约束检查
// ==========================================

fn check_constraints(text: &str, typed: &TypedValue, rule: &FieldRule) -> Vec<Violation> {
    let c = &rule.constraints;
    let mut violations = Vec::new();

    let length = text.chars().count();
    if let Some(min) = c.min_length {
        if length < min {
            violations.push(Violation::MinLength { min, actual: length });
        }
    }
    if let Some(max) = c.max_length {
        if length > max {
            violations.push(Violation::MaxLength { max, actual: length });
        }
    }

    // 数值边界（闭区间）
    if let Some(number) = typed.as_number() {
        if let Some(min) = c.min_value {
            if number < min {
                violations.push(Violation::BelowMin { min, value: number });
            }
        }
        if let Some(max) = c.max_value {
            if number > max {
                violations.push(Violation::AboveMax { max, value: number });
            }
        }
    }

    if let Some(allowed) = &c.allowed_values {
        if !allowed.iter().any(|a| allowed_matches(a, text, typed)) {
            violations.push(Violation::NotAllowed {
                value: text.to_string(),
                allowed: allowed.join(", "),
            });
        }
    }

    if let Some(pattern) = &c.pattern {
        if !pattern.is_match(text) {
            violations.push(Violation::PatternMismatch {
                value: text.to_string(),
                pattern: pattern.as_str().to_string(),
            });
        }
    }

    violations
}

/// 枚举值匹配: 数值按数值相等，布尔按语义相等，其余按原文相等
fn allowed_matches(allowed: &str, text: &str, typed: &TypedValue) -> bool {
    match typed {
        TypedValue::Integer(_) | TypedValue::Float(_) => {
            match (parse_decimal(allowed), typed.as_number()) {
                (Some(a), Some(n)) => a == n,
                _ => allowed.trim() == text,
            }
        }
        TypedValue::Boolean(b) => parse_bool(allowed) == Some(*b),
        _ => allowed.trim() == text,
    }
}

// ==========================================
// 解析工具
// ==========================================

/// 解析小数，兼容逗号小数点（"3,14"）；拒绝 NaN / inf
pub fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim();
    let parsed = text.parse::<f64>().ok().or_else(|| {
        if text.matches(',').count() == 1 && !text.contains('.') {
            text.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    })?;
    parsed.is_finite().then_some(parsed)
}

/// 解析布尔字面量（大小写不敏感）
pub fn parse_bool(text: &str) -> Option<bool> {
    let lowered = text.trim().to_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSY.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// 邮箱结构检查: local@domain,domain 含 '.' 且各段非空
pub fn is_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = text.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return false,
    };
    !local.is_empty() && domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

/// 电话检查: 允许分隔符与前导 '+'，有效位数在范围内
pub fn is_phone(text: &str) -> bool {
    let body = text.strip_prefix('+').unwrap_or(text);
    let mut digits = 0usize;
    for c in body.chars() {
        if c.is_ascii_digit() {
            digits += 1;
        } else if !PHONE_SEPARATORS.contains(&c) {
            return false;
        }
    }
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::FieldConstraints;
    use crate::domain::types::FailureKind;
    use regex::Regex;

    fn rule(field_type: FieldType, required: bool) -> FieldRule {
        FieldRule::new("campo", field_type, required)
    }

    fn idade_rule() -> FieldRule {
        FieldRule::new("idade", FieldType::Integer, true).with_constraints(FieldConstraints {
            min_value: Some(18.0),
            max_value: Some(120.0),
            ..Default::default()
        })
    }

    fn check(value: Option<&str>, rule: &FieldRule) -> Outcome {
        validate_field(value, rule, &ValidatorOptions::default())
    }

    const ALL_TYPES: [FieldType; 8] = [
        FieldType::String,
        FieldType::Integer,
        FieldType::Float,
        FieldType::Date,
        FieldType::DateTime,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Boolean,
    ];

    #[test]
    fn test_required_missing_for_every_type() {
        for ft in ALL_TYPES {
            let r = rule(ft, true);
            for value in [None, Some(""), Some("   ")] {
                let outcome = check(value, &r);
                assert_eq!(outcome.kind(), Some(FailureKind::MissingRequired), "{:?}", ft);
            }
        }
    }

    #[test]
    fn test_optional_missing_is_valid_for_every_type() {
        for ft in ALL_TYPES {
            let mut r = rule(ft, false);
            r.constraints.min_length = Some(5);
            assert!(check(None, &r).is_valid());
            assert!(check(Some(" "), &r).is_valid());
        }
    }

    #[test]
    fn test_idade_below_min_references_constraint() {
        let outcome = check(Some("17"), &idade_rule());
        assert_eq!(outcome.kind(), Some(FailureKind::ConstraintViolation));
        assert!(outcome.reason().unwrap().contains("min_value=18"));
    }

    #[test]
    fn test_idade_non_numeric_is_type_mismatch() {
        let outcome = check(Some("abc"), &idade_rule());
        assert_eq!(outcome.kind(), Some(FailureKind::TypeMismatch));
    }

    #[test]
    fn test_numeric_bounds_inclusive() {
        let r = idade_rule();
        assert!(check(Some("18"), &r).is_valid());
        assert!(check(Some("120"), &r).is_valid());
        assert!(!check(Some("121"), &r).is_valid());

        let mut f = rule(FieldType::Float, true);
        f.constraints.min_value = Some(0.5);
        f.constraints.max_value = Some(1.5);
        assert!(check(Some("0.5"), &f).is_valid());
        assert!(check(Some("1,5"), &f).is_valid());
        assert!(!check(Some("1.51"), &f).is_valid());
    }

    #[test]
    fn test_integer_rejects_decimal_text() {
        let r = rule(FieldType::Integer, true);
        assert_eq!(check(Some("12.5"), &r).kind(), Some(FailureKind::TypeMismatch));
        assert!(check(Some(" 42 "), &r).is_valid());
    }

    #[test]
    fn test_float_rejects_non_finite() {
        let r = rule(FieldType::Float, true);
        assert_eq!(check(Some("NaN"), &r).kind(), Some(FailureKind::TypeMismatch));
        assert_eq!(check(Some("inf"), &r).kind(), Some(FailureKind::TypeMismatch));
        assert_eq!(check(Some("1,2,3"), &r).kind(), Some(FailureKind::TypeMismatch));
    }

    #[test]
    fn test_string_length_and_allowed_values() {
        let mut r = rule(FieldType::String, true);
        r.constraints.min_length = Some(2);
        r.constraints.max_length = Some(4);
        r.constraints.allowed_values = Some(vec!["SP".to_string(), "RJ".to_string()]);

        assert!(check(Some("SP"), &r).is_valid());
        let outcome = check(Some("MG"), &r);
        assert!(outcome.reason().unwrap().contains("allowed_values=[SP, RJ]"));

        // 长度与枚举同时违反，两条都列出
        let outcome = check(Some("Paraná"), &r);
        assert_eq!(outcome.violations.len(), 2);
        assert!(outcome.reason().unwrap().contains("max_length=4"));
    }

    #[test]
    fn test_allowed_values_and_bounds_are_anded() {
        let mut r = rule(FieldType::Integer, true);
        r.constraints.allowed_values = Some(vec!["1".to_string(), "5".to_string(), "10".to_string()]);
        r.constraints.max_value = Some(5.0);

        assert!(check(Some("5"), &r).is_valid());
        assert!(check(Some("05"), &r).is_valid());
        let outcome = check(Some("10"), &r);
        assert!(outcome.reason().unwrap().contains("max_value=5"));
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(check(Some("3"), &r).violations.len(), 1);
    }

    #[test]
    fn test_date_formats() {
        let r = rule(FieldType::Date, true);
        assert!(check(Some("2024-01-15"), &r).is_valid());
        assert!(check(Some("15/01/2024"), &r).is_valid());
        assert_eq!(check(Some("2024-13-45"), &r).kind(), Some(FailureKind::TypeMismatch));

        let mut custom = rule(FieldType::Date, true);
        custom.formats = Some(vec!["%Y%m%d".to_string()]);
        assert!(check(Some("20240115"), &custom).is_valid());
        assert!(!check(Some("2024-01-15"), &custom).is_valid());
    }

    #[test]
    fn test_datetime_formats() {
        let r = rule(FieldType::DateTime, true);
        assert!(check(Some("2024-01-15 14:30:22"), &r).is_valid());
        assert!(check(Some("2024-01-15T14:30:22Z"), &r).is_valid());
        assert!(check(Some("2024-01-15T14:30:22-03:00"), &r).is_valid());
        assert!(!check(Some("ontem"), &r).is_valid());
    }

    #[test]
    fn test_email() {
        let r = rule(FieldType::Email, true);
        assert!(check(Some("ana.silva@empresa.com.br"), &r).is_valid());
        for bad in ["ana@empresa", "@empresa.com", "ana@@empresa.com", "ana silva@x.com", "ana@.com"] {
            assert_eq!(check(Some(bad), &r).kind(), Some(FailureKind::TypeMismatch), "{}", bad);
        }
    }

    #[test]
    fn test_phone() {
        let r = rule(FieldType::Phone, true);
        assert!(check(Some("(11) 98765-4321"), &r).is_valid());
        assert!(check(Some("+55 11 98765.4321"), &r).is_valid());
        assert!(!check(Some("1234"), &r).is_valid());
        assert!(!check(Some("11 9876x4321"), &r).is_valid());
    }

    #[test]
    fn test_boolean_spellings() {
        let r = rule(FieldType::Boolean, true);
        for ok in ["true", "FALSE", "1", "0", "sim", "Não", "yes", "no"] {
            assert!(check(Some(ok), &r).is_valid(), "{}", ok);
        }
        assert_eq!(check(Some("talvez"), &r).kind(), Some(FailureKind::TypeMismatch));
    }

    #[test]
    fn test_pattern_constraint() {
        let mut r = rule(FieldType::String, true);
        r.constraints.pattern = Some(Regex::new(r"^[A-Z]{3}-\d{4}$").unwrap());
        assert!(check(Some("ABC-1234"), &r).is_valid());
        let outcome = check(Some("abc-1234"), &r);
        assert_eq!(outcome.kind(), Some(FailureKind::ConstraintViolation));
        assert!(outcome.reason().unwrap().contains("pattern="));
    }
}
