//! 检测分析器：按维度匹配单个技术指纹
//! 固定顺序 URL → Header → Script → Meta → HTML → DOM，全部维度都会执行（置信度与版本需要完整命中列表）

use std::borrow::Cow;
use tracing::debug;

use super::detection::{MatchEvent, Surface};
use crate::compiler::{Fingerprint, Pattern};
use crate::page::WebPage;

/// 各维度分析器的通用抽象
pub trait SurfaceAnalyzer {
    const SURFACE: Surface;

    /// 收集该维度下的全部命中
    fn analyze<'a>(fingerprint: &'a Fingerprint, page: &'a dyn WebPage, events: &mut Vec<MatchEvent<'a>>);

    /// 记录一次命中
    fn push<'a>(
        fingerprint: &Fingerprint,
        key: Option<&'a str>,
        pattern: &'a Pattern,
        value: Cow<'a, str>,
        events: &mut Vec<MatchEvent<'a>>,
    ) {
        debug!(
            "{} matched: tech={}, key={}, pattern={}",
            Self::SURFACE,
            fingerprint.name,
            key.unwrap_or("-"),
            pattern.source()
        );
        events.push(MatchEvent {
            surface: Self::SURFACE,
            key,
            pattern,
            value,
        });
    }
}

/// URL分析器
pub struct UrlAnalyzer;

impl SurfaceAnalyzer for UrlAnalyzer {
    const SURFACE: Surface = Surface::Url;

    fn analyze<'a>(fingerprint: &'a Fingerprint, page: &'a dyn WebPage, events: &mut Vec<MatchEvent<'a>>) {
        let url = page.url();
        for pattern in &fingerprint.url {
            if pattern.is_match(url) {
                Self::push(fingerprint, None, pattern, Cow::Borrowed(url), events);
            }
        }
    }
}

/// Header分析器
pub struct HeaderAnalyzer;

impl SurfaceAnalyzer for HeaderAnalyzer {
    const SURFACE: Surface = Surface::Headers;

    fn analyze<'a>(fingerprint: &'a Fingerprint, page: &'a dyn WebPage, events: &mut Vec<MatchEvent<'a>>) {
        for (header_name, patterns) in &fingerprint.headers {
            let Some(header_value) = page.header(header_name) else {
                continue;
            };
            for pattern in patterns {
                if pattern.is_match(header_value) {
                    Self::push(fingerprint, Some(header_name.as_str()), pattern, Cow::Borrowed(header_value), events);
                }
            }
        }
    }
}

/// Script分析器：每个模式对每个 script src 逐一匹配
pub struct ScriptAnalyzer;

impl SurfaceAnalyzer for ScriptAnalyzer {
    const SURFACE: Surface = Surface::Scripts;

    fn analyze<'a>(fingerprint: &'a Fingerprint, page: &'a dyn WebPage, events: &mut Vec<MatchEvent<'a>>) {
        for pattern in &fingerprint.scripts {
            for src in page.scripts() {
                if pattern.is_match(src) {
                    Self::push(fingerprint, None, pattern, Cow::Borrowed(src.as_str()), events);
                }
            }
        }
    }
}

/// Meta分析器
pub struct MetaAnalyzer;

impl SurfaceAnalyzer for MetaAnalyzer {
    const SURFACE: Surface = Surface::Meta;

    fn analyze<'a>(fingerprint: &'a Fingerprint, page: &'a dyn WebPage, events: &mut Vec<MatchEvent<'a>>) {
        for (meta_name, patterns) in &fingerprint.meta {
            let Some(content) = page.meta().get(meta_name) else {
                continue;
            };
            for pattern in patterns {
                if pattern.is_match(content) {
                    Self::push(fingerprint, Some(meta_name.as_str()), pattern, Cow::Borrowed(content.as_str()), events);
                }
            }
        }
    }
}

/// HTML分析器
pub struct HtmlAnalyzer;

impl SurfaceAnalyzer for HtmlAnalyzer {
    const SURFACE: Surface = Surface::Html;

    fn analyze<'a>(fingerprint: &'a Fingerprint, page: &'a dyn WebPage, events: &mut Vec<MatchEvent<'a>>) {
        let html = page.html();
        for pattern in &fingerprint.html {
            if pattern.is_match(html) {
                Self::push(fingerprint, None, pattern, Cow::Borrowed(html), events);
            }
        }
    }
}

/// DOM分析器
/// 存在性规则以选择器本身作为置信度键；文本规则匹配 inner_html；属性规则仅在属性非空时匹配
pub struct DomAnalyzer;

impl SurfaceAnalyzer for DomAnalyzer {
    const SURFACE: Surface = Surface::Dom;

    fn analyze<'a>(fingerprint: &'a Fingerprint, page: &'a dyn WebPage, events: &mut Vec<MatchEvent<'a>>) {
        for dom_selector in &fingerprint.dom {
            for element in page.select(&dom_selector.selector) {
                if dom_selector.exists_only {
                    Self::push(fingerprint, None, &dom_selector.marker, Cow::Borrowed(""), events);
                }

                for pattern in &dom_selector.text_patterns {
                    if pattern.is_match(&element.inner_html) {
                        Self::push(fingerprint, None, pattern, Cow::Owned(element.inner_html.clone()), events);
                    }
                }

                for (attr_name, patterns) in &dom_selector.attribute_patterns {
                    let Some(attr_value) = element.attributes.get(attr_name).filter(|v| !v.is_empty()) else {
                        continue;
                    };
                    for pattern in patterns {
                        if pattern.is_match(attr_value) {
                            Self::push(fingerprint, None, pattern, Cow::Owned(attr_value.clone()), events);
                        }
                    }
                }
            }
        }
    }
}

/// 单个技术指纹对页面的完整匹配
/// 返回（是否命中，全部命中事件）；任一维度（含 URL）命中即视为检测到
pub fn match_fingerprint<'a>(fingerprint: &'a Fingerprint, page: &'a dyn WebPage) -> (bool, Vec<MatchEvent<'a>>) {
    let mut events = Vec::new();

    UrlAnalyzer::analyze(fingerprint, page, &mut events);
    HeaderAnalyzer::analyze(fingerprint, page, &mut events);
    ScriptAnalyzer::analyze(fingerprint, page, &mut events);
    MetaAnalyzer::analyze(fingerprint, page, &mut events);
    HtmlAnalyzer::analyze(fingerprint, page, &mut events);
    DomAnalyzer::analyze(fingerprint, page, &mut events);

    (!events.is_empty(), events)
}
