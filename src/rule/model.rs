//! 规则数据模型定义
//! 仅存储原始规则数据（technologies.json 格式），无任何业务逻辑，支持序列化/反序列化
//! 字符串 / 列表 / 映射 等多形态字段在加载时解析为带标签的枚举，编译阶段一次性归一化

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 单个字符串或字符串列表
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
    /// 无法识别的形态，编译时忽略
    Unsupported(Value),
}

impl OneOrMany {
    /// 展开为字符串序列，未识别形态为空
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.clone()],
            OneOrMany::Many(list) => list.clone(),
            OneOrMany::Unsupported(_) => Vec::new(),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, OneOrMany::Unsupported(_))
    }
}

/// 键值型规则（meta）：映射，或裸字符串/列表（视为 generator）
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum KeyedRule {
    Keyed(BTreeMap<String, OneOrMany>),
    Bare(OneOrMany),
}

/// DOM 规则：单个选择器、选择器列表，或 选择器 → 子句对象
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DomRule {
    Selector(String),
    Selectors(Vec<String>),
    Clauses(BTreeMap<String, Value>),
    Unsupported(Value),
}

/// DOM 子句（exists / text / attributes），其余键忽略
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DomClause {
    #[serde(default)]
    pub exists: Option<Value>,
    #[serde(default)]
    pub text: Option<OneOrMany>,
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, OneOrMany>>,
}

/// 技术规则定义（从 technologies.json 解析）
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TechRule {
    #[serde(rename = "cats", default)]
    pub category_ids: Vec<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cpe: Option<String>,
    #[serde(default)]
    pub saas: Option<bool>,
    #[serde(default)]
    pub oss: Option<bool>,
    #[serde(default)]
    pub pricing: Option<OneOrMany>,

    // 检测规则
    #[serde(default)]
    pub url: Option<OneOrMany>,
    #[serde(default)]
    pub html: Option<OneOrMany>,
    #[serde(default)]
    pub scripts: Option<OneOrMany>,
    // 兼容：scriptSrc 字段，与 scripts 同为 script-src 匹配
    #[serde(rename = "scriptSrc", default)]
    pub script_src: Option<OneOrMany>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, OneOrMany>>,
    #[serde(default)]
    pub meta: Option<KeyedRule>,
    #[serde(default)]
    pub dom: Option<DomRule>,

    // 关联规则
    #[serde(default)]
    pub implies: Option<OneOrMany>,
}

/// 分类规则定义（从 categories.json 解析）
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CategoryRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub groups: Option<Vec<u32>>,
}

/// 完整规则库（顶层 categories + technologies/apps 均为必需键）
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RuleLibrary {
    pub categories: BTreeMap<String, CategoryRule>,
    #[serde(alias = "apps")]
    pub technologies: BTreeMap<String, TechRule>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tech_rule_shapes() {
        let rule: TechRule = serde_json::from_value(json!({
            "cats": [1, 11],
            "html": "aaa",
            "scriptSrc": ["jquery\\.js", "jquery-([\\d.]+)\\.js\\;version:\\1"],
            "meta": "^WordPress",
            "dom": {"#id": {"attributes": {"onclick": "fooScript.*"}}},
            "implies": "PHP"
        }))
        .unwrap();

        assert_eq!(rule.category_ids, vec![1, 11]);
        assert_eq!(rule.html, Some(OneOrMany::One("aaa".to_string())));
        assert_eq!(rule.script_src.as_ref().map(|s| s.to_vec().len()), Some(2));
        assert!(matches!(rule.meta, Some(KeyedRule::Bare(OneOrMany::One(_)))));
        assert!(matches!(rule.dom, Some(DomRule::Clauses(_))));
        assert_eq!(rule.implies.unwrap().to_vec(), vec!["PHP".to_string()]);
    }

    #[test]
    fn test_unsupported_shape_does_not_fail() {
        let rule: TechRule = serde_json::from_value(json!({ "html": 42 })).unwrap();
        assert!(!rule.html.unwrap().is_supported());
    }

    #[test]
    fn test_apps_alias_and_missing_keys() {
        let lib: RuleLibrary = serde_json::from_value(json!({
            "categories": {"1": {"name": "CMS"}},
            "apps": {"a": {"html": "aaa"}}
        }))
        .unwrap();
        assert!(lib.technologies.contains_key("a"));

        let missing = serde_json::from_value::<RuleLibrary>(json!({ "categories": {} }));
        assert!(missing.is_err());
    }

    #[test]
    fn test_category_ids_only_from_cats() {
        let rule: TechRule = serde_json::from_value(json!({ "categories": [1] })).unwrap();
        assert!(rule.category_ids.is_empty());

        let rule: TechRule = serde_json::from_value(json!({ "cats": [6] })).unwrap();
        assert_eq!(rule.category_ids, vec![6]);
    }
}
