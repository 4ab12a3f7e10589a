//! 基于原始 HTML 的页面实现
//! script/meta 由 html5ever 分词提取，DOM 查询由 scraper 完成（首次查询时解析）

use std::collections::HashMap;
use once_cell::unsync::OnceCell;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{PageElement, WebPage};
use crate::config::GlobalConfig;
use crate::error::ScanResult;
use crate::extractor::HtmlExtractor;
use crate::utils::{HeaderConverter, HttpClientFactory};

/// 单个页面
#[derive(Debug)]
pub struct HtmlPage {
    url: String,
    html: String,
    headers: HashMap<String, String>,
    scripts: Vec<String>,
    meta: HashMap<String, String>,
    document: OnceCell<Html>,
}

impl HtmlPage {
    /// 由 URL、HTML 与 Header 映射构建（Header 名统一小写）
    pub fn new<I, K, V>(url: impl Into<String>, html: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let html = html.into();
        let extracted = HtmlExtractor::extract(&html);
        Self {
            url: url.into(),
            headers: HeaderConverter::from_pairs(headers),
            scripts: extracted.script_srcs,
            meta: extracted.meta_tags,
            html,
            document: OnceCell::new(),
        }
    }

    /// Header 以 JSON 给出，非对象输入报 InvalidInput
    pub fn from_json_headers(
        url: impl Into<String>,
        html: impl Into<String>,
        headers: &Value,
    ) -> ScanResult<Self> {
        let headers = HeaderConverter::from_json(headers)?;
        Ok(Self::new(url, html, headers))
    }

    pub fn from_header_map(url: impl Into<String>, html: impl Into<String>, headers: &HeaderMap) -> Self {
        Self::new(url, html, HeaderConverter::to_single_value_map(headers))
    }

    /// 抓取页面（跟随重定向，页面 URL 取最终地址，不校验状态码）
    pub async fn fetch(url: &str, config: &GlobalConfig) -> ScanResult<Self> {
        let target = Url::parse(url)?;
        let client = HttpClientFactory::create(config)?;

        let response = client.get(target).send().await?;
        let final_url = response.url().to_string();
        let status = response.status();
        let headers = HeaderConverter::to_single_value_map(response.headers());
        let html = response.text().await?;

        debug!("fetched {} ({}), {} bytes", final_url, status, html.len());
        Ok(Self::new(final_url, html, headers))
    }

    fn document(&self) -> &Html {
        self.document.get_or_init(|| Html::parse_document(&self.html))
    }
}

impl WebPage for HtmlPage {
    fn url(&self) -> &str {
        &self.url
    }

    fn html(&self) -> &str {
        &self.html
    }

    fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    fn scripts(&self) -> &[String] {
        &self.scripts
    }

    fn meta(&self) -> &HashMap<String, String> {
        &self.meta
    }

    fn select(&self, selector: &str) -> Vec<PageElement> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("invalid css selector '{}': {:?}", selector, e);
                return Vec::new();
            }
        };

        self.document()
            .select(&parsed)
            .map(|element| PageElement {
                name: element.value().name().to_string(),
                attributes: element
                    .value()
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
                inner_html: element.inner_html(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HTML: &str = r#"<html><head>
        <meta name="Generator" content="WordPress 5.4.2">
        <script src="/wp-includes/js/jquery/jquery.js?ver=1.12.4"></script>
        </head><body>
        <div class="aaa" id="main" onclick="fooScript()"><p>webpage <b>a</b></p></div>
        </body></html>"#;

    #[test]
    fn test_page_surfaces() {
        let page = HtmlPage::new("http://example.com", HTML, [("Server", "nginx")]);

        assert_eq!(page.header("SERVER"), Some("nginx"));
        assert_eq!(page.headers().get("server").map(String::as_str), Some("nginx"));
        assert_eq!(page.meta()["generator"], "WordPress 5.4.2");
        assert_eq!(page.scripts(), &["/wp-includes/js/jquery/jquery.js?ver=1.12.4".to_string()]);
    }

    #[test]
    fn test_select() {
        let page = HtmlPage::new("http://example.com", HTML, Vec::<(String, String)>::new());

        let elements = page.select("#main");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].name, "div");
        assert_eq!(elements[0].attributes["onclick"], "fooScript()");
        assert_eq!(elements[0].inner_html, "<p>webpage <b>a</b></p>");

        assert!(page.select(".missing").is_empty());
        assert!(page.select("div[").is_empty());
    }

    #[test]
    fn test_json_headers_must_be_object() {
        let page = HtmlPage::from_json_headers("http://example.com", "", &json!({"Server": "Apache"})).unwrap();
        assert_eq!(page.header("server"), Some("Apache"));

        assert!(HtmlPage::from_json_headers("http://example.com", "", &json!("Server: Apache")).is_err());
    }
}
