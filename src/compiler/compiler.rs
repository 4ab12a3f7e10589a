//! 规则编译器核心
//! 将原始规则归一化为规范形态，并编译为可执行的正则模式

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use regex::RegexBuilder;
use serde_json::Value;
use tracing::debug;

use super::pattern::{
    Category, DomSelector, Fingerprint, Implication, Matcher, Pattern, SignatureDatabase,
    TechMetadata, DEFAULT_CONFIDENCE,
};
use crate::rule::{DomClause, DomRule, KeyedRule, OneOrMany, RuleLibrary, TechRule};

/// 指令分隔符（反斜杠 + 分号）
const DIRECTIVE_SEPARATOR: &str = "\\;";

/// 裸 meta 规则对应的 meta 名
const DEFAULT_META_NAME: &str = "generator";

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则库
    pub fn compile(rule_lib: &RuleLibrary) -> SignatureDatabase {
        let start = Instant::now();
        let mut stats = CompileStats::default();

        // 1. 构建分类映射（ID -> 分类）
        let categories = rule_lib
            .categories
            .iter()
            .map(|(id, cat_rule)| {
                let category = Category {
                    id: id.clone(),
                    name: cat_rule.name.clone(),
                    priority: cat_rule.priority.unwrap_or(0),
                    groups: cat_rule.groups.clone().unwrap_or_default(),
                };
                (id.clone(), category)
            })
            .collect::<HashMap<_, _>>();

        // 2. 编译每个技术规则
        let technologies = rule_lib
            .technologies
            .iter()
            .map(|(tech_name, tech_rule)| {
                (tech_name.clone(), Self::compile_tech_rule(tech_name, tech_rule, &mut stats))
            })
            .collect::<HashMap<_, _>>();

        // 3. 输出编译统计
        debug!(
            "signature database compiled in {:?}: {} technologies, {} categories",
            start.elapsed(),
            technologies.len(),
            categories.len()
        );
        debug!(
            "pattern stats: url={} header={} script={} meta={} html={} dom={} fancy={} invalid={}",
            stats.url_count,
            stats.header_count,
            stats.script_count,
            stats.meta_count,
            stats.html_count,
            stats.dom_count,
            stats.fancy_count,
            stats.invalid_count
        );

        SignatureDatabase {
            categories,
            technologies,
        }
    }

    /// 编译单个技术规则
    pub fn compile_tech_rule(
        tech_name: &str,
        tech_rule: &TechRule,
        stats: &mut CompileStats,
    ) -> Fingerprint {
        let url = Self::compile_pattern_list(tech_rule.url.as_ref(), stats, "url");
        let html = Self::compile_pattern_list(tech_rule.html.as_ref(), stats, "html");

        // scripts 与 scriptSrc 合并为 script-src 匹配
        let mut scripts = Self::compile_pattern_list(tech_rule.scripts.as_ref(), stats, "script");
        scripts.extend(Self::compile_pattern_list(tech_rule.script_src.as_ref(), stats, "script"));

        let headers = tech_rule
            .headers
            .as_ref()
            .map(|map| Self::compile_keyed_patterns(map, stats, "header"))
            .unwrap_or_default();

        let meta = match &tech_rule.meta {
            Some(KeyedRule::Keyed(map)) => Self::compile_keyed_patterns(map, stats, "meta"),
            Some(KeyedRule::Bare(value)) => {
                let mut wrapped = BTreeMap::new();
                wrapped.insert(DEFAULT_META_NAME.to_string(), value.clone());
                Self::compile_keyed_patterns(&wrapped, stats, "meta")
            }
            None => BTreeMap::new(),
        };

        let dom = tech_rule
            .dom
            .as_ref()
            .map(|rule| Self::compile_dom(tech_name, rule, stats))
            .unwrap_or_default();

        let implies: Vec<Implication> = tech_rule
            .implies
            .as_ref()
            .map(|value| value.to_vec().iter().map(|raw| Self::parse_implication(raw)).collect())
            .unwrap_or_default();

        Fingerprint {
            name: tech_name.to_string(),
            category_ids: tech_rule.category_ids.clone(),
            implies,
            url,
            html,
            scripts,
            headers,
            meta,
            dom,
            metadata: TechMetadata {
                website: tech_rule.website.clone().unwrap_or_else(|| "??".to_string()),
                description: tech_rule.description.clone(),
                icon: tech_rule.icon.clone(),
                cpe: tech_rule.cpe.clone(),
                saas: tech_rule.saas,
                oss: tech_rule.oss,
                pricing: tech_rule.pricing.as_ref().map(OneOrMany::to_vec).unwrap_or_default(),
            },
        }
    }

    /// 编译列表型模式（url/html/script等）
    fn compile_pattern_list(
        value: Option<&OneOrMany>,
        stats: &mut CompileStats,
        pattern_type: &str,
    ) -> Vec<Pattern> {
        let Some(value) = value else {
            return Vec::new();
        };
        if !value.is_supported() {
            debug!("unsupported {} rule shape ignored: {:?}", pattern_type, value);
        }

        let patterns: Vec<Pattern> = value
            .to_vec()
            .iter()
            .map(|raw| Self::compile_pattern(raw))
            .collect();
        stats.record(pattern_type, &patterns);
        patterns
    }

    /// 编译键值对型模式（meta/header），键统一小写
    fn compile_keyed_patterns(
        value: &BTreeMap<String, OneOrMany>,
        stats: &mut CompileStats,
        pattern_type: &str,
    ) -> BTreeMap<String, Vec<Pattern>> {
        let mut keyed_patterns: BTreeMap<String, Vec<Pattern>> = BTreeMap::new();
        for (key, val) in value {
            let patterns = Self::compile_pattern_list(Some(val), stats, pattern_type);
            keyed_patterns
                .entry(key.to_lowercase())
                .or_default()
                .extend(patterns);
        }
        keyed_patterns
    }

    /// 编译 DOM 规则
    fn compile_dom(tech_name: &str, rule: &DomRule, stats: &mut CompileStats) -> Vec<DomSelector> {
        let selectors: Vec<DomSelector> = match rule {
            DomRule::Selector(selector) => {
                vec![DomSelector::new(selector.clone(), true, Vec::new(), BTreeMap::new())]
            }
            DomRule::Selectors(list) => list
                .iter()
                .map(|selector| DomSelector::new(selector.clone(), true, Vec::new(), BTreeMap::new()))
                .collect(),
            DomRule::Clauses(map) => map
                .iter()
                .filter_map(|(selector, clause)| {
                    Self::compile_dom_clause(tech_name, selector, clause, stats)
                })
                .collect(),
            DomRule::Unsupported(value) => {
                debug!("[{}] unsupported dom rule shape ignored: {}", tech_name, value);
                Vec::new()
            }
        };
        stats.dom_count += selectors.len();
        selectors
    }

    fn compile_dom_clause(
        tech_name: &str,
        selector: &str,
        clause: &Value,
        stats: &mut CompileStats,
    ) -> Option<DomSelector> {
        let clause: DomClause = match serde_json::from_value(clause.clone()) {
            Ok(clause) => clause,
            Err(e) => {
                debug!("[{}] dom clause for '{}' ignored: {}", tech_name, selector, e);
                return None;
            }
        };

        // 空文本视为未声明
        let text_patterns = match &clause.text {
            Some(OneOrMany::One(text)) if text.is_empty() => Vec::new(),
            other => Self::compile_pattern_list(other.as_ref(), stats, "dom"),
        };
        let attribute_patterns = clause
            .attributes
            .as_ref()
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(name, value)| {
                        (name.clone(), Self::compile_pattern_list(Some(value), stats, "dom"))
                    })
                    .collect::<BTreeMap<_, _>>()
            })
            .unwrap_or_default();

        let dom_selector = DomSelector::new(
            selector.to_string(),
            clause.exists.is_some(),
            text_patterns,
            attribute_patterns,
        );
        if dom_selector.is_active() {
            Some(dom_selector)
        } else {
            debug!("[{}] dom clause for '{}' has no exists/text/attributes, dropped", tech_name, selector);
            None
        }
    }

    /// 编译单个模式：`regex\;version:\1\;confidence:50`
    /// 正则无法编译时降级为永不匹配，不向上报错
    pub fn compile_pattern(raw_pattern: &str) -> Pattern {
        let mut segments = raw_pattern.split(DIRECTIVE_SEPARATOR);
        let source = segments.next().unwrap_or_default();

        let matcher = match RegexBuilder::new(source).case_insensitive(true).build() {
            Ok(regex) => Matcher::Regex(regex),
            // regex 不支持环视与反向引用，交给 fancy-regex
            Err(e) => match fancy_regex::Regex::new(&format!("(?i){}", source)) {
                Ok(regex) => {
                    debug!("pattern compiled with backtracking engine: {} ({})", source, e);
                    Matcher::Fancy(regex)
                }
                Err(fancy_err) => {
                    debug!(
                        "regex compile failed, pattern degraded to never-match: {} ({}; {})",
                        source, e, fancy_err
                    );
                    Matcher::Never
                }
            },
        };

        let mut version_template = None;
        let mut confidence = DEFAULT_CONFIDENCE;
        let mut directives = Vec::new();
        for segment in segments {
            let Some((key, value)) = segment.split_once(':') else {
                continue;
            };
            match key {
                "version" => {
                    version_template = Some(value.to_string()).filter(|v| !v.is_empty());
                }
                "confidence" => {
                    confidence = value.trim().parse().unwrap_or(DEFAULT_CONFIDENCE);
                }
                _ => directives.push((key.to_string(), value.to_string())),
            }
        }

        Pattern::new(source.to_string(), matcher, version_template, confidence, directives)
    }

    /// 解析 implies 条目：`Name` 或 `Name\;confidence:50`
    /// confidence 指令无法解析时视为 0（不生效）
    pub fn parse_implication(raw: &str) -> Implication {
        let mut segments = raw.split(DIRECTIVE_SEPARATOR);
        let name = segments.next().unwrap_or_default().trim().to_string();

        let confidence = segments
            .filter_map(|segment| segment.split_once(':'))
            .filter(|(key, _)| *key == "confidence")
            .map(|(_, value)| value.trim().parse::<u32>().unwrap_or(0))
            .last();

        Implication { name, confidence }
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
pub struct CompileStats {
    pub url_count: usize,
    pub html_count: usize,
    pub script_count: usize,
    pub header_count: usize,
    pub meta_count: usize,
    pub dom_count: usize,
    pub fancy_count: usize,
    pub invalid_count: usize,
}

impl CompileStats {
    fn record(&mut self, pattern_type: &str, patterns: &[Pattern]) {
        let count = patterns.len();
        match pattern_type {
            "url" => self.url_count += count,
            "html" => self.html_count += count,
            "script" => self.script_count += count,
            "header" => self.header_count += count,
            "meta" => self.meta_count += count,
            _ => {}
        }
        self.fancy_count += patterns
            .iter()
            .filter(|p| matches!(p.matcher(), Matcher::Fancy(_)))
            .count();
        self.invalid_count += patterns
            .iter()
            .filter(|p| p.matcher().is_never())
            .count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile_json(name: &str, value: serde_json::Value) -> Fingerprint {
        let rule: TechRule = serde_json::from_value(value).unwrap();
        RuleCompiler::compile_tech_rule(name, &rule, &mut CompileStats::default())
    }

    #[test]
    fn test_compile_pattern_directives() {
        let pattern = RuleCompiler::compile_pattern("jquery-([\\d.]+)\\.js\\;version:\\1\\;confidence:50\\;foo:bar:baz");
        assert_eq!(pattern.source(), "jquery-([\\d.]+)\\.js");
        assert_eq!(pattern.version_template(), Some("\\1"));
        assert_eq!(pattern.confidence(), 50);
        assert_eq!(pattern.directives(), &[("foo".to_string(), "bar:baz".to_string())]);
        assert!(pattern.is_match("/static/JQUERY-3.6.0.js"));
    }

    #[test]
    fn test_compile_pattern_defaults() {
        let pattern = RuleCompiler::compile_pattern("nginx\\;confidence:abc");
        assert_eq!(pattern.confidence(), DEFAULT_CONFIDENCE);
        assert_eq!(pattern.version_template(), None);

        let pattern = RuleCompiler::compile_pattern("nginx\\;version:");
        assert_eq!(pattern.version_template(), None);
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let pattern = RuleCompiler::compile_pattern("jquery(\\.min");
        assert!(matches!(pattern.matcher(), Matcher::Never));
        assert!(!pattern.is_match("jquery(.min"));
        assert!(!pattern.is_match(""));
    }

    #[test]
    fn test_lookaround_and_backreference_use_fancy_engine() {
        let pattern = RuleCompiler::compile_pattern("jquery(?!-migrate)[.-]");
        assert!(matches!(pattern.matcher(), Matcher::Fancy(_)));
        assert!(pattern.is_match("/js/JQuery.min.js"));
        assert!(!pattern.is_match("/js/jquery-migrate.js"));

        let pattern = RuleCompiler::compile_pattern("(a)\\1\\;version:\\1");
        assert!(matches!(pattern.matcher(), Matcher::Fancy(_)));
        assert!(pattern.is_match("xAAx"));
        assert_eq!(pattern.version_template(), Some("\\1"));

        let plain = RuleCompiler::compile_pattern("nginx");
        assert!(matches!(plain.matcher(), Matcher::Regex(_)));
    }

    #[test]
    fn test_normalizes_keys_and_bare_meta() {
        let fp = compile_json("WordPress", json!({
            "headers": {"X-Powered-By": "PHP"},
            "meta": ["^WordPress", "^WP"],
        }));
        assert!(fp.headers.contains_key("x-powered-by"));
        assert_eq!(fp.meta.get("generator").map(Vec::len), Some(2));
        assert!(fp.url.is_empty());
        assert!(fp.dom.is_empty());
        assert_eq!(fp.metadata.website, "??");
    }

    #[test]
    fn test_script_src_merged_into_scripts() {
        let fp = compile_json("jQuery", json!({
            "scripts": "jquery\\.js",
            "scriptSrc": ["jquery\\.min\\.js"],
        }));
        let sources: Vec<&str> = fp.scripts.iter().map(|p| p.source()).collect();
        assert_eq!(sources, vec!["jquery\\.js", "jquery\\.min\\.js"]);
    }

    #[test]
    fn test_dom_shapes() {
        let fp = compile_json("a", json!({ "dom": ".aaa" }));
        assert_eq!(fp.dom.len(), 1);
        assert!(fp.dom[0].exists_only);

        let fp = compile_json("b", json!({ "dom": {
            "#id": {"attributes": {"onclick": "fooScript.*"}},
            "p.text": {"text": "webpage\\ b"},
            "div.flag": {"exists": ""},
            "div.ignored": {"properties": {"foo": ""}},
        }}));
        assert_eq!(fp.dom.len(), 3);
        let by_selector: HashMap<&str, &DomSelector> =
            fp.dom.iter().map(|d| (d.selector.as_str(), d)).collect();
        assert_eq!(by_selector["#id"].attribute_patterns["onclick"].len(), 1);
        assert!(!by_selector["#id"].exists_only);
        assert_eq!(by_selector["p.text"].text_patterns.len(), 1);
        assert!(by_selector["div.flag"].exists_only);
        assert!(!by_selector.contains_key("div.ignored"));
    }

    #[test]
    fn test_parse_implication() {
        assert_eq!(
            RuleCompiler::parse_implication("PHP"),
            Implication { name: "PHP".to_string(), confidence: None }
        );
        let implication = RuleCompiler::parse_implication("MySQL\\;confidence:30");
        assert_eq!(implication.name, "MySQL");
        assert!(!implication.is_certain());
        assert!(RuleCompiler::parse_implication("MySQL\\;confidence:70").is_certain());
        assert!(!RuleCompiler::parse_implication("MySQL\\;confidence:x").is_certain());
    }
}
