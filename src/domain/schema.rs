// ==========================================
// 数据上传平台 - Schema 领域模型
// ==========================================
// 职责: 已校验、不可变的 Schema 定义
// 红线: 实例只能由 schema::loader 构造，加载后不再修改
// ==========================================

use crate::domain::types::FieldType;
use regex::Regex;
use std::path::PathBuf;

// ==========================================
// FieldConstraints - 字段约束
// ==========================================
// 所有声明的约束按逻辑 AND 组合
#[derive(Debug, Clone, Default)]
pub struct FieldConstraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub allowed_values: Option<Vec<String>>,
    pub pattern: Option<Regex>,
}

// ==========================================
// FieldRule - 字段规则
// ==========================================
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub constraints: FieldConstraints,
    /// 字段级日期格式（覆盖全局配置）
    pub formats: Option<Vec<String>>,
    pub description: Option<String>,
}

impl FieldRule {
    /// 构造无约束字段规则（测试与代码内建 Schema 使用）
    pub fn new(name: impl Into<String>, field_type: FieldType, required: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            required,
            constraints: FieldConstraints::default(),
            formats: None,
            description: None,
        }
    }

    pub fn with_constraints(mut self, constraints: FieldConstraints) -> Self {
        self.constraints = constraints;
        self
    }
}

// ==========================================
// SchemaDefinition - Schema 定义
// ==========================================
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    pub description: String,
    pub subject: String,
    pub sub_subject: String,
    pub table_name: String,
    pub fields: Vec<FieldRule>,
    /// 来源文件（代码内建 Schema 为 None）
    pub source_file: Option<PathBuf>,
}

impl SchemaDefinition {
    /// (subject, sub_subject) 分类键
    pub fn category(&self) -> (String, String) {
        (self.subject.clone(), self.sub_subject.clone())
    }

    /// 下拉选项展示文本: "table (N campos) - arquivo.yaml"
    pub fn display_label(&self) -> String {
        let file = self
            .source_file
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "-".to_string());
        format!("{} ({} campos) - {}", self.table_name, self.fields.len(), file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> SchemaDefinition {
        SchemaDefinition {
            description: "Clientes".to_string(),
            subject: "usuarios".to_string(),
            sub_subject: "cadastro".to_string(),
            table_name: "clientes".to_string(),
            fields: vec![
                FieldRule::new("nome", FieldType::String, true),
                FieldRule::new("idade", FieldType::Integer, false),
            ],
            source_file: Some(PathBuf::from("schema/clientes.yaml")),
        }
    }

    #[test]
    fn test_display_label() {
        assert_eq!(
            sample_schema().display_label(),
            "clientes (2 campos) - clientes.yaml"
        );
    }
}
