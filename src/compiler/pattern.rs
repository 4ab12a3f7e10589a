//! 编译后模式模型
//! 正则编译后的结构，加载完成后只读共享

use std::collections::{BTreeMap, HashMap};
use regex::Regex;

/// 未声明 confidence 时的默认权重
pub const DEFAULT_CONFIDENCE: u32 = 100;

/// implies 条目携带 confidence 时的生效阈值
pub const IMPLY_CONFIDENCE_THRESHOLD: u32 = 50;

#[derive(Debug, Clone)]
pub enum Matcher {
    Regex(Regex),              // 正则匹配（忽略大小写）
    Fancy(fancy_regex::Regex), // 含环视 / 反向引用，回溯匹配
    Never,                     // 两种引擎均无法编译，永不匹配
}

impl Matcher {
    /// 简单匹配判断（回溯超限视为未命中）
    pub fn is_match(&self, input: &str) -> bool {
        match self {
            Matcher::Regex(regex) => regex.is_match(input),
            Matcher::Fancy(regex) => regex.is_match(input).unwrap_or(false),
            Matcher::Never => false,
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Matcher::Never)
    }
}

/// 编译后的单条模式（正则 + 版本模板 + 置信度）
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    matcher: Matcher,
    version_template: Option<String>,
    confidence: u32,
    directives: Vec<(String, String)>,
}

impl Pattern {
    pub(crate) fn new(
        source: String,
        matcher: Matcher,
        version_template: Option<String>,
        confidence: u32,
        directives: Vec<(String, String)>,
    ) -> Self {
        Self {
            source,
            matcher,
            version_template,
            confidence,
            directives,
        }
    }

    /// DOM 存在性检测使用的占位模式（source 为选择器本身）
    pub(crate) fn marker(selector: &str) -> Self {
        Self::new(selector.to_string(), Matcher::Never, None, DEFAULT_CONFIDENCE, Vec::new())
    }

    /// 原始正则串（诊断与置信度键）
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.matcher.is_match(input)
    }

    pub fn version_template(&self) -> Option<&str> {
        self.version_template.as_deref()
    }

    pub fn confidence(&self) -> u32 {
        self.confidence
    }

    /// 未识别的 key:value 指令，保留但不参与匹配
    pub fn directives(&self) -> &[(String, String)] {
        &self.directives
    }
}

/// DOM 选择器规则
#[derive(Debug, Clone)]
pub struct DomSelector {
    pub selector: String,
    pub exists_only: bool,
    pub text_patterns: Vec<Pattern>,
    pub attribute_patterns: BTreeMap<String, Vec<Pattern>>,
    pub(crate) marker: Pattern,
}

impl DomSelector {
    pub fn new(
        selector: String,
        exists_only: bool,
        text_patterns: Vec<Pattern>,
        attribute_patterns: BTreeMap<String, Vec<Pattern>>,
    ) -> Self {
        let marker = Pattern::marker(&selector);
        Self {
            selector,
            exists_only,
            text_patterns,
            attribute_patterns,
            marker,
        }
    }

    /// 至少一种子句生效
    pub fn is_active(&self) -> bool {
        self.exists_only || !self.text_patterns.is_empty() || !self.attribute_patterns.is_empty()
    }
}

/// implies 条目（可带 confidence 指令）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Implication {
    pub name: String,
    pub confidence: Option<u32>,
}

impl Implication {
    /// 无 confidence 指令无条件生效，否则需达到阈值
    pub fn is_certain(&self) -> bool {
        self.confidence
            .map_or(true, |confidence| confidence >= IMPLY_CONFIDENCE_THRESHOLD)
    }
}

/// 技术基础信息，不参与匹配
#[derive(Debug, Clone, Default)]
pub struct TechMetadata {
    pub website: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub cpe: Option<String>,
    pub saas: Option<bool>,
    pub oss: Option<bool>,
    pub pricing: Vec<String>,
}

/// 技术编译后的规则（单个技术的完整指纹）
#[derive(Debug, Clone, Default)]
pub struct Fingerprint {
    pub name: String,
    pub category_ids: Vec<u32>,
    pub implies: Vec<Implication>,
    pub url: Vec<Pattern>,
    pub html: Vec<Pattern>,
    pub scripts: Vec<Pattern>,
    pub headers: BTreeMap<String, Vec<Pattern>>,
    pub meta: BTreeMap<String, Vec<Pattern>>,
    pub dom: Vec<DomSelector>,
    pub metadata: TechMetadata,
}

/// 分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub groups: Vec<u32>,
}

/// 编译后的签名库：分类 ID → 分类，技术名 → 指纹
#[derive(Debug, Clone, Default)]
pub struct SignatureDatabase {
    pub categories: HashMap<String, Category>,
    pub technologies: HashMap<String, Fingerprint>,
}

impl SignatureDatabase {
    pub fn fingerprint(&self, name: &str) -> Option<&Fingerprint> {
        self.technologies.get(name)
    }

    pub fn category(&self, id: u32) -> Option<&Category> {
        self.categories.get(&id.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }
}
