// ==========================================
// 数据上传平台 - Schema 文件加载器
// ==========================================
// 职责: YAML 文件 → 已校验的 SchemaDefinition
// 红线: 所有结构问题在加载时拒绝（未知类型 / 非法正则 / 边界颠倒 /
//       非数值类型声明数值边界 / 字段名归一化后重复），校验阶段不再检查
// ==========================================

use crate::domain::schema::{FieldConstraints, FieldRule, SchemaDefinition};
use crate::domain::types::FieldType;
use crate::importer::column_normalizer::ColumnNormalizer;
use crate::schema::error::{SchemaError, SchemaResult};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::warn;

/// subject 缺省值
pub const DEFAULT_SUBJECT: &str = "Indefinido";

// ==========================================
// 原始 YAML 结构
// ==========================================
#[derive(Debug, Deserialize)]
struct RawSchemaFile {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    sub_subject: Option<String>,
    schema: RawSchemaBody,
}

#[derive(Debug, Deserialize)]
struct RawSchemaBody {
    #[serde(default)]
    table_name: Option<String>,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type", default = "default_type")]
    field_type: String,
    #[serde(default)]
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    allowed_values: Option<Vec<serde_yaml::Value>>,
    pattern: Option<String>,
    formats: Option<Vec<String>>,
    description: Option<String>,
    /// 未识别的键：记录告警后忽略
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_type() -> String {
    "string".to_string()
}

/// 读取并校验单个 Schema 文件
pub fn load_schema_file(path: &Path, normalizer: &ColumnNormalizer) -> SchemaResult<SchemaDefinition> {
    let content = fs::read_to_string(path)
        .map_err(|e| SchemaError::malformed(path, format!("读取失败: {}", e)))?;
    parse_schema(&content, path, normalizer)
}

/// 解析 YAML 文本（path 用于缺省值与错误信息）
pub fn parse_schema(
    content: &str,
    path: &Path,
    normalizer: &ColumnNormalizer,
) -> SchemaResult<SchemaDefinition> {
    let raw: RawSchemaFile = serde_yaml::from_str(content)
        .map_err(|e| SchemaError::malformed(path, e.to_string()))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    if raw.schema.fields.is_empty() {
        return Err(SchemaError::malformed(path, "schema.fields 为空"));
    }

    let mut seen: HashMap<String, String> = HashMap::new();
    let mut fields = Vec::with_capacity(raw.schema.fields.len());
    for raw_field in raw.schema.fields {
        let rule = build_field(raw_field, path)?;
        let canonical = normalizer.normalize(&rule.name);
        if let Some(previous) = seen.insert(canonical.clone(), rule.name.clone()) {
            return Err(SchemaError::malformed(
                path,
                format!(
                    "字段 '{}' 与 '{}' 归一化后重复 ({})",
                    rule.name, previous, canonical
                ),
            ));
        }
        fields.push(rule);
    }

    Ok(SchemaDefinition {
        description: raw.description.unwrap_or_default(),
        subject: non_blank(raw.subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        sub_subject: non_blank(raw.sub_subject).unwrap_or_else(|| stem.clone()),
        table_name: non_blank(raw.schema.table_name).unwrap_or(stem),
        fields,
        source_file: Some(path.to_path_buf()),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn build_field(raw: RawField, path: &Path) -> SchemaResult<FieldRule> {
    let name = raw.name.trim().to_string();
    if name.is_empty() {
        return Err(SchemaError::malformed(path, "字段名为空"));
    }
    let field_err = |msg: String| SchemaError::malformed(path, format!("字段 '{}': {}", name, msg));

    for key in raw.extra.keys() {
        warn!(
            file = %path.display(),
            field = %name,
            key = %key,
            "忽略未识别的字段属性"
        );
    }

    let field_type: FieldType = raw.field_type.parse().map_err(|e: String| field_err(e))?;

    if let (Some(min), Some(max)) = (raw.min_length, raw.max_length) {
        if min > max {
            return Err(field_err(format!("min_length={} 大于 max_length={}", min, max)));
        }
    }

    if (raw.min_value.is_some() || raw.max_value.is_some()) && !field_type.is_numeric() {
        return Err(field_err(format!(
            "类型 {} 不支持 min_value/max_value",
            field_type
        )));
    }
    for bound in [raw.min_value, raw.max_value].into_iter().flatten() {
        if !bound.is_finite() {
            return Err(field_err("数值边界必须为有限数".to_string()));
        }
    }
    if let (Some(min), Some(max)) = (raw.min_value, raw.max_value) {
        if min > max {
            return Err(field_err(format!("min_value={} 大于 max_value={}", min, max)));
        }
    }

    let allowed_values = match raw.allowed_values {
        Some(values) => {
            let converted = values
                .iter()
                .map(yaml_scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| field_err("allowed_values 只能包含标量".to_string()))?;
            if converted.is_empty() {
                return Err(field_err("allowed_values 为空".to_string()));
            }
            Some(converted)
        }
        None => None,
    };

    let pattern = match raw.pattern {
        Some(p) => Some(
            Regex::new(&p).map_err(|e| field_err(format!("pattern 非法: {}", e)))?,
        ),
        None => None,
    };

    let formats = match raw.formats {
        Some(formats) if !matches!(field_type, FieldType::Date | FieldType::DateTime) => {
            return Err(field_err(format!(
                "类型 {} 不支持 formats（仅 date/datetime）: {:?}",
                field_type, formats
            )));
        }
        Some(formats) if formats.is_empty() => {
            return Err(field_err("formats 为空".to_string()));
        }
        other => other,
    };

    Ok(FieldRule {
        name,
        field_type,
        required: raw.required,
        constraints: FieldConstraints {
            min_length: raw.min_length,
            max_length: raw.max_length,
            min_value: raw.min_value,
            max_value: raw.max_value,
            allowed_values,
            pattern,
        },
        formats,
        description: raw.description,
    })
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUTOS: &str = r#"
description: Cadastro de produtos
subject: vendas
sub_subject: produtos
schema:
  table_name: produtos
  fields:
    - name: codigo
      type: string
      required: true
      pattern: "^[A-Z]{2}\\d+$"
    - name: preco
      type: number
      required: true
      min_value: 0
    - name: categoria
      type: str
      allowed_values: [eletronicos, moveis]
    - name: lancamento
      type: date
      formats: ["%d/%m/%Y"]
"#;

    fn parse(content: &str, file: &str) -> SchemaResult<SchemaDefinition> {
        parse_schema(content, Path::new(file), &ColumnNormalizer::default())
    }

    #[test]
    fn test_parse_valid_schema() {
        let schema = parse(PRODUTOS, "schema/produtos.yaml").unwrap();
        assert_eq!(schema.category(), ("vendas".to_string(), "produtos".to_string()));
        assert_eq!(schema.fields.len(), 4);
        assert_eq!(schema.fields[1].field_type, FieldType::Float);
        assert_eq!(schema.fields[1].constraints.min_value, Some(0.0));
        assert!(schema.fields[0].constraints.pattern.is_some());
        assert_eq!(
            schema.fields[3].formats,
            Some(vec!["%d/%m/%Y".to_string()])
        );
    }

    #[test]
    fn test_defaults_from_file_stem() {
        let content = "schema:\n  fields:\n    - name: id\n      type: int\n";
        let schema = parse(content, "schema/clientes.yml").unwrap();
        assert_eq!(schema.subject, DEFAULT_SUBJECT);
        assert_eq!(schema.sub_subject, "clientes");
        assert_eq!(schema.table_name, "clientes");
        assert_eq!(schema.fields[0].field_type, FieldType::Integer);
        assert!(!schema.fields[0].required);
    }

    #[test]
    fn test_rejects_unknown_type() {
        let content = "schema:\n  fields:\n    - name: id\n      type: uuid\n";
        assert!(matches!(parse(content, "x.yaml"), Err(SchemaError::Malformed { .. })));
    }

    #[test]
    fn test_rejects_numeric_bounds_on_string() {
        let content = "schema:\n  fields:\n    - name: nome\n      type: string\n      min_value: 1\n";
        let err = parse(content, "x.yaml").unwrap_err();
        assert!(err.to_string().contains("min_value"));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let content = "schema:\n  fields:\n    - name: idade\n      type: int\n      min_value: 10\n      max_value: 5\n";
        assert!(parse(content, "x.yaml").is_err());
    }

    #[test]
    fn test_rejects_invalid_pattern() {
        let content = "schema:\n  fields:\n    - name: cod\n      pattern: \"([a-z\"\n";
        assert!(parse(content, "x.yaml").is_err());
    }

    #[test]
    fn test_rejects_duplicate_names_after_normalization() {
        let content = "schema:\n  fields:\n    - name: Nome Cliente\n    - name: nome_cliente\n";
        let err = parse(content, "x.yaml").unwrap_err();
        assert!(err.to_string().contains("nome_cliente"));
    }

    #[test]
    fn test_rejects_missing_schema_block() {
        assert!(parse("subject: vendas\n", "x.yaml").is_err());
        assert!(parse("schema:\n  fields: []\n", "x.yaml").is_err());
    }

    #[test]
    fn test_unrecognized_field_keys_are_ignored() {
        let content = "schema:\n  fields:\n    - name: codigo\n      type: string\n      required: true\n      unique: true\n      max_length: 10\n";
        let schema = parse(content, "x.yaml").unwrap();
        assert_eq!(schema.fields.len(), 1);
        assert!(schema.fields[0].required);
        assert_eq!(schema.fields[0].constraints.max_length, Some(10));
    }

    #[test]
    fn test_numeric_allowed_values_become_strings() {
        let content = "schema:\n  fields:\n    - name: nivel\n      type: int\n      allowed_values: [1, 2, 3]\n";
        let schema = parse(content, "x.yaml").unwrap();
        assert_eq!(
            schema.fields[0].constraints.allowed_values,
            Some(vec!["1".to_string(), "2".to_string(), "3".to_string()])
        );
    }
}
