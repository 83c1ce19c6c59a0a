// ==========================================
// 数据上传平台 - 领域类型定义
// ==========================================
// 职责: 字段类型 / 校验失败分类 / 预览推断类型
// 红线: 字段类型是封闭枚举，校验器按枚举分派
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 字段类型 (Field Type)
// ==========================================
// Schema 文件中的 type 字符串在加载时解析为此枚举，
// 未知类型视为 Schema 格式错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Date,
    DateTime,
    Email,
    Phone,
    Boolean,
}

impl FieldType {
    /// 是否为数值类型（允许 min_value / max_value 约束）
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Integer => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
            FieldType::Date => write!(f, "date"),
            FieldType::DateTime => write!(f, "datetime"),
            FieldType::Email => write!(f, "email"),
            FieldType::Phone => write!(f, "phone"),
            FieldType::Boolean => write!(f, "bool"),
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" | "str" | "text" => Ok(FieldType::String),
            "int" | "integer" => Ok(FieldType::Integer),
            "float" | "number" | "double" | "decimal" => Ok(FieldType::Float),
            "date" => Ok(FieldType::Date),
            "datetime" | "timestamp" => Ok(FieldType::DateTime),
            "email" => Ok(FieldType::Email),
            "phone" | "telefone" => Ok(FieldType::Phone),
            "bool" | "boolean" => Ok(FieldType::Boolean),
            other => Err(format!("未知字段类型: {}", other)),
        }
    }
}

// ==========================================
// 校验失败分类 (Failure Kind)
// ==========================================
// 逐字段失败只累积，不中断校验
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    MissingRequired,     // 必填字段缺失
    TypeMismatch,        // 类型不匹配
    ConstraintViolation, // 长度/数值范围/枚举/正则约束违反
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::MissingRequired => write!(f, "MISSING_REQUIRED"),
            FailureKind::TypeMismatch => write!(f, "TYPE_MISMATCH"),
            FailureKind::ConstraintViolation => write!(f, "CONSTRAINT_VIOLATION"),
        }
    }
}

// ==========================================
// 预览推断类型 (Inferred Type)
// ==========================================
// 仅用于预览展示，不参与校验
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredType {
    Integer,
    Float,
    Boolean,
    Date,
    Text,
    Empty,
}

impl InferredType {
    /// 面向用户的类型说明
    pub fn friendly_name(&self) -> &'static str {
        match self {
            InferredType::Integer => "Números inteiros",
            InferredType::Float => "Números decimais",
            InferredType::Boolean => "Verdadeiro/Falso",
            InferredType::Date => "Data/Hora",
            InferredType::Text => "Texto",
            InferredType::Empty => "Vazio",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferredType::Integer => write!(f, "int64"),
            InferredType::Float => write!(f, "float64"),
            InferredType::Boolean => write!(f, "bool"),
            InferredType::Date => write!(f, "datetime64"),
            InferredType::Text => write!(f, "object"),
            InferredType::Empty => write!(f, "empty"),
        }
    }
}
