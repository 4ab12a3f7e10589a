//! HTML标签提取器
//! 基于 html5ever 分词器提取 <script src> 与 <meta name content>
//! script/style 内容按原始文本处理，其中的伪标签不会被误识别

use std::cell::RefCell;
use std::collections::HashMap;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use markup5ever::interface::Attribute;
use tendril::StrTendril;

/// 提取结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractResult {
    /// 文档顺序的 script src（空值跳过）
    pub script_srcs: Vec<String>,
    /// 小写 meta 名 → content，同名取最后一个
    pub meta_tags: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct ExtractSink {
    result: RefCell<ExtractResult>,
}

impl TokenSink for ExtractSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        let Token::TagToken(Tag {
            kind: TagKind::StartTag,
            name,
            attrs,
            ..
        }) = token
        else {
            return TokenSinkResult::Continue;
        };

        match name.as_ref() {
            "script" => {
                self.extract_script_src(&attrs);
                TokenSinkResult::RawData(RawKind::ScriptData)
            }
            "style" => TokenSinkResult::RawData(RawKind::Rawtext),
            "meta" => {
                self.extract_meta_tag(&attrs);
                TokenSinkResult::Continue
            }
            _ => TokenSinkResult::Continue,
        }
    }
}

impl ExtractSink {
    fn extract_script_src(&self, attrs: &[Attribute]) {
        let src = attrs
            .iter()
            .find(|attr| attr.name.local.as_ref() == "src")
            .map(|attr| attr.value.to_string());
        if let Some(src) = src.filter(|s| !s.is_empty()) {
            self.result.borrow_mut().script_srcs.push(src);
        }
    }

    fn extract_meta_tag(&self, attrs: &[Attribute]) {
        let mut name = None;
        let mut content = None;

        for attr in attrs {
            match attr.name.local.as_ref() {
                "name" => name = Some(attr.value.to_lowercase()),
                "content" => content = Some(attr.value.to_string()),
                _ => {}
            }
        }

        if let (Some(n), Some(c)) = (name, content) {
            self.result.borrow_mut().meta_tags.insert(n, c);
        }
    }
}

/// 对外暴露的HTML提取器
pub struct HtmlExtractor;

impl HtmlExtractor {
    /// 从HTML字符串提取标签
    pub fn extract(html: &str) -> ExtractResult {
        let tokenizer = Tokenizer::new(ExtractSink::default(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink.result.into_inner()
    }
}
