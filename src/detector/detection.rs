//! 检测结果结构
//! 匹配事件、单页面单技术的累积记录、对外输出结构

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use serde::Serialize;

use crate::compiler::Pattern;

/// 证据维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Url,
    Headers,
    Scripts,
    Meta,
    Html,
    Dom,
}

impl Surface {
    /// 维度名（同时用于置信度键）
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Url => "url",
            Surface::Headers => "headers",
            Surface::Scripts => "scripts",
            Surface::Meta => "meta",
            Surface::Html => "html",
            Surface::Dom => "dom",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次模式命中
#[derive(Debug, Clone)]
pub struct MatchEvent<'a> {
    pub surface: Surface,
    /// header 名 / meta 名
    pub key: Option<&'a str>,
    pub pattern: &'a Pattern,
    /// 被匹配的原始值（DOM 存在性命中为空串）
    pub value: Cow<'a, str>,
}

impl MatchEvent<'_> {
    /// 置信度键：`<surface> <key> <pattern>`，无 key 时为 `<surface> <pattern>`
    pub fn confidence_key(&self) -> String {
        match self.key {
            Some(key) if !key.is_empty() => {
                format!("{} {} {}", self.surface, key, self.pattern.source())
            }
            _ => format!("{} {}", self.surface, self.pattern.source()),
        }
    }
}

/// 单页面单技术的检测记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectedTechnology {
    pub name: String,
    /// 置信度键 → 该命中贡献的权重，同键覆盖
    pub confidence_entries: BTreeMap<String, u32>,
    /// 去重后的版本号，按长度升序
    pub versions: Vec<String>,
}

impl DetectedTechnology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 总置信度（各键求和）
    pub fn confidence(&self) -> u32 {
        self.confidence_entries.values().sum()
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub(crate) fn set_confidence(&mut self, key: String, confidence: u32) {
        self.confidence_entries.insert(key, confidence);
    }

    /// 追加版本（已存在则忽略），随后按长度稳定排序
    pub(crate) fn add_versions(&mut self, versions: impl IntoIterator<Item = String>) {
        for version in versions {
            if !version.is_empty() && !self.versions.contains(&version) {
                self.versions.push(version);
            }
        }
        self.versions.sort_by_key(|v| v.chars().count());
    }
}

/// 对外输出：技术名 → { versions?, categories? }
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TechnologyReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::RuleCompiler;

    #[test]
    fn test_confidence_key() {
        let pattern = RuleCompiler::compile_pattern("^nginx");
        let event = MatchEvent {
            surface: Surface::Headers,
            key: Some("server"),
            pattern: &pattern,
            value: Cow::Borrowed("nginx"),
        };
        assert_eq!(event.confidence_key(), "headers server ^nginx");

        let event = MatchEvent { surface: Surface::Html, key: None, ..event };
        assert_eq!(event.confidence_key(), "html ^nginx");
    }

    #[test]
    fn test_versions_sorted_by_length() {
        let mut tech = DetectedTechnology::new("PHP");
        tech.add_versions(vec!["5.6.40".to_string(), "5".to_string()]);
        tech.add_versions(vec!["5.6".to_string(), "5".to_string(), String::new()]);
        assert_eq!(tech.versions(), &["5", "5.6", "5.6.40"]);
    }

    #[test]
    fn test_confidence_overwrites_same_key() {
        let mut tech = DetectedTechnology::new("a");
        tech.set_confidence("html aaa".to_string(), 100);
        tech.set_confidence("html aaa".to_string(), 100);
        tech.set_confidence("url aaa".to_string(), 25);
        assert_eq!(tech.confidence(), 125);
    }

    #[test]
    fn test_report_skips_absent_fields() {
        let report = TechnologyReport {
            versions: None,
            categories: Some(vec!["cat1".to_string()]),
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"categories":["cat1"]}"#
        );
    }
}
