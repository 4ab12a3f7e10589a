//! 提取模块：从 HTML 中提取 script-src 与 meta 标签
pub mod html_extractor;

pub use self::html_extractor::{ExtractResult, HtmlExtractor};
