// ==========================================
// 数据上传平台 - 列名归一化器
// ==========================================
// 职责: 原始表头 → 规范列名（与 Schema 字段名匹配）
// 规则: 小写 / TRIM / 替换规则 / 去重音 / 非单词字符折叠为 '_'
// 红线: 两个表头归一化结果相同 → DuplicateColumn，不静默覆盖
// ==========================================

use crate::domain::validation::ColumnMapping;
use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashMap;
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 归一化结果为空时使用的列名
pub const UNNAMED_COLUMN: &str = "unnamed_column";

/// 数字开头列名的前缀
const DIGIT_PREFIX: &str = "col_";

/// 内建替换规则（在去重音之前匹配，因此键中保留重音）
const DEFAULT_RULES: &[(&str, &str)] = &[
    ("tipo (r$)", "tipo_rs"),
    ("tipo(r$)", "tipo_rs"),
    ("valor (r$)", "valor_rs"),
    ("valor(r$)", "valor_rs"),
    ("preço (r$)", "preco_rs"),
    ("preço(r$)", "preco_rs"),
    ("custo (r$)", "custo_rs"),
    ("custo(r$)", "custo_rs"),
];

/// 去除变音符号（NFD 分解后丢弃组合字符）
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

// ==========================================
// HeaderPreview - 归一化预览条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPreview {
    pub original: String,
    pub canonical: String,
    /// 与之冲突的先出现表头
    pub conflicts_with: Option<String>,
}

// ==========================================
// ColumnNormalizer
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnNormalizer {
    rules: Vec<(String, String)>,
}

impl Default for ColumnNormalizer {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl ColumnNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 不带任何替换规则的归一化器
    pub fn without_rules() -> Self {
        Self { rules: Vec::new() }
    }

    /// 归一化单个列名
    pub fn normalize(&self, raw: &str) -> String {
        let mut lowered = raw.trim().to_lowercase();

        for (original, replacement) in &self.rules {
            if lowered.contains(original.as_str()) {
                lowered = lowered.replace(original.as_str(), replacement);
            }
        }

        let stripped = strip_diacritics(&lowered);

        // 非字母数字字符（含 '_'）折叠为单个 '_'
        let mut collapsed = String::with_capacity(stripped.len());
        let mut pending_separator = false;
        for c in stripped.chars() {
            if c.is_alphanumeric() {
                if pending_separator && !collapsed.is_empty() {
                    collapsed.push('_');
                }
                pending_separator = false;
                collapsed.push(c);
            } else {
                pending_separator = true;
            }
        }

        if collapsed.is_empty() {
            return UNNAMED_COLUMN.to_string();
        }

        if collapsed.starts_with(|c: char| c.is_ascii_digit()) {
            format!("{}{}", DIGIT_PREFIX, collapsed)
        } else {
            collapsed
        }
    }

    /// 归一化整组表头（冲突即失败）
    pub fn map_headers(&self, headers: &[String]) -> ImportResult<ColumnMapping> {
        let mut seen: HashMap<String, &str> = HashMap::with_capacity(headers.len());
        let mut entries = Vec::with_capacity(headers.len());

        for raw in headers {
            let canonical = self.normalize(raw);
            if let Some(first) = seen.get(canonical.as_str()) {
                return Err(ImportError::DuplicateColumn {
                    canonical,
                    first: first.to_string(),
                    second: raw.clone(),
                });
            }
            seen.insert(canonical.clone(), raw.as_str());
            entries.push((raw.clone(), canonical));
        }

        debug!(columns = entries.len(), "表头归一化完成");
        Ok(ColumnMapping { entries })
    }

    /// 归一化预览（不失败，冲突以标记返回）
    pub fn preview_mapping(&self, headers: &[String]) -> Vec<HeaderPreview> {
        let mut seen: HashMap<String, String> = HashMap::new();
        headers
            .iter()
            .map(|raw| {
                let canonical = self.normalize(raw);
                let conflicts_with = seen.get(&canonical).cloned();
                seen.entry(canonical.clone()).or_insert_with(|| raw.clone());
                HeaderPreview {
                    original: raw.clone(),
                    canonical,
                    conflicts_with,
                }
            })
            .collect()
    }

    /// 添加自定义替换规则（同键覆盖）
    pub fn add_rule(&mut self, original: &str, replacement: &str) {
        let key = original.to_lowercase();
        let value = replacement.to_lowercase();
        match self.rules.iter_mut().find(|(k, _)| *k == key) {
            Some(rule) => rule.1 = value,
            None => self.rules.push((key, value)),
        }
    }

    /// 移除替换规则，返回是否存在
    pub fn remove_rule(&mut self, original: &str) -> bool {
        let key = original.to_lowercase();
        let before = self.rules.len();
        self.rules.retain(|(k, _)| *k != key);
        self.rules.len() != before
    }

    pub fn rules(&self) -> &[(String, String)] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        let n = ColumnNormalizer::new();
        assert_eq!(n.normalize("Nome Cliente"), "nome_cliente");
        assert_eq!(n.normalize("  data-nascimento "), "data_nascimento");
        assert_eq!(n.normalize("Endereço"), "endereco");
        assert_eq!(n.normalize("Ação  --  Código"), "acao_codigo");
    }

    #[test]
    fn test_normalize_special_rules() {
        let n = ColumnNormalizer::new();
        assert_eq!(n.normalize("Valor (R$)"), "valor_rs");
        assert_eq!(n.normalize("Preço(R$)"), "preco_rs");
    }

    #[test]
    fn test_normalize_edge_cases() {
        let n = ColumnNormalizer::new();
        assert_eq!(n.normalize("2024 vendas"), "col_2024_vendas");
        assert_eq!(n.normalize("   "), UNNAMED_COLUMN);
        assert_eq!(n.normalize("%%%"), UNNAMED_COLUMN);
        assert_eq!(n.normalize("__id__"), "id");
    }

    #[test]
    fn test_normalize_idempotent() {
        let n = ColumnNormalizer::new();
        for raw in [
            "Nome Cliente",
            "nome_cliente",
            "Valor (R$)",
            "2024 vendas",
            "É_Ñ-ü",
            "",
            "UPPER__case",
        ] {
            let once = n.normalize(raw);
            assert_eq!(n.normalize(&once), once, "raw = {:?}", raw);
        }
    }

    #[test]
    fn test_map_headers_duplicate_column() {
        let n = ColumnNormalizer::new();
        let headers = vec![
            "Nome Cliente".to_string(),
            "idade".to_string(),
            "nome_cliente".to_string(),
        ];

        match n.map_headers(&headers) {
            Err(ImportError::DuplicateColumn {
                canonical,
                first,
                second,
            }) => {
                assert_eq!(canonical, "nome_cliente");
                assert_eq!(first, "Nome Cliente");
                assert_eq!(second, "nome_cliente");
            }
            other => panic!("expected DuplicateColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_map_headers_preserves_order() {
        let n = ColumnNormalizer::new();
        let headers = vec!["Idade".to_string(), "E-mail".to_string()];
        let mapping = n.map_headers(&headers).unwrap();
        assert_eq!(mapping.canonical_names(), vec!["idade", "e_mail"]);
        assert_eq!(mapping.position_of("e_mail"), Some(1));
    }

    #[test]
    fn test_preview_mapping_flags_conflicts() {
        let n = ColumnNormalizer::new();
        let headers = vec!["Nome".to_string(), "NOME".to_string()];
        let preview = n.preview_mapping(&headers);
        assert_eq!(preview[0].conflicts_with, None);
        assert_eq!(preview[1].conflicts_with, Some("Nome".to_string()));
    }

    #[test]
    fn test_custom_rules() {
        let mut n = ColumnNormalizer::without_rules();
        n.add_rule("Nº", "numero");
        assert_eq!(n.normalize("Nº Pedido"), "numero_pedido");
        assert!(n.remove_rule("nº"));
        assert!(!n.remove_rule("nº"));
        assert!(n.rules().is_empty());
    }
}
