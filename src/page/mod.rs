//! 页面模块：检测引擎依赖的页面能力抽象
//! 引擎只通过 `WebPage` 读取页面，不关心页面如何抓取、解析
pub mod html_page;

use std::collections::HashMap;

pub use self::html_page::HtmlPage;

/// CSS 选择命中的元素
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageElement {
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub inner_html: String,
}

/// 页面能力接口
pub trait WebPage {
    fn url(&self) -> &str;

    /// 完整页面源码
    fn html(&self) -> &str;

    /// 小写 Header 名 → 值
    fn headers(&self) -> &HashMap<String, String>;

    /// 按名称查询 Header（忽略大小写）
    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(&name.to_lowercase()).map(String::as_str)
    }

    /// 文档顺序的 script src
    fn scripts(&self) -> &[String];

    /// 小写 meta 名 → content
    fn meta(&self) -> &HashMap<String, String>;

    /// CSS 选择，选择器非法时返回空
    fn select(&self, selector: &str) -> Vec<PageElement>;
}
