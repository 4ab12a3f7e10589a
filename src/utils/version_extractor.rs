//! 版本提取工具模块
//! 对匹配值做全量匹配（findall 语义），按版本模板生成版本号
//! 模板支持 \1/\2 分组引用，以及 \1?有:无 三元表达式

use crate::compiler::Matcher;

/// 版本提取工具类
pub struct VersionExtractor;

impl VersionExtractor {
    /// 对 `value` 做全量匹配，每个匹配产出一个候选版本
    ///
    /// - 正则无捕获分组时，整体匹配视为第 1 组
    /// - 未参与匹配的分组视为空串
    /// - 空结果丢弃，同一调用内不去重（由记录方去重）
    pub fn extract_all(matcher: &Matcher, version_template: &str, value: &str) -> Vec<String> {
        let matches: Vec<Vec<&str>> = match matcher {
            Matcher::Regex(regex) => regex
                .captures_iter(value)
                .map(|captures| Self::groups(captures.len(), |i| captures.get(i).map(|m| m.as_str())))
                .collect(),
            // 回溯超限即停止
            Matcher::Fancy(regex) => regex
                .captures_iter(value)
                .map_while(Result::ok)
                .map(|captures| Self::groups(captures.len(), |i| captures.get(i).map(|m| m.as_str())))
                .collect(),
            Matcher::Never => Vec::new(),
        };
        matches
            .iter()
            .map(|groups| Self::resolve(version_template, groups))
            .filter(|version| !version.is_empty())
            .collect()
    }

    /// 将一次匹配的分组值代入模板
    pub fn resolve(version_template: &str, groups: &[&str]) -> String {
        let mut version = version_template.to_string();
        for (index, matched) in groups.iter().enumerate() {
            let placeholder = format!("\\{}", index + 1);

            // 1. 三元表达式：\N?有:无（从占位符到模板末尾整体替换）
            if let Some((start, then, otherwise)) = Self::find_ternary(&version, &placeholder) {
                let resolved = if matched.is_empty() { otherwise } else { then };
                version = format!("{}{}", &version[..start], resolved);
            }

            // 2. 分组引用替换
            version = version.replace(&placeholder, matched);
        }
        version
    }

    /// 定位 `\N?then:else`，then 至少一个字符且不含冒号，else 取到末尾
    fn find_ternary<'a>(version: &'a str, placeholder: &str) -> Option<(usize, &'a str, &'a str)> {
        let marker = format!("{}?", placeholder);
        let mut offset = 0;
        while let Some(pos) = version[offset..].find(&marker) {
            let start = offset + pos;
            let rest = &version[start + marker.len()..];
            if let Some(colon) = rest.find(':') {
                if colon >= 1 {
                    return Some((start, &rest[..colon], &rest[colon + 1..]));
                }
            }
            offset = start + 1;
        }
        None
    }

    /// 提取分组值：无分组时取整体匹配
    fn groups<'h>(len: usize, group: impl Fn(usize) -> Option<&'h str>) -> Vec<&'h str> {
        if len == 1 {
            return group(0).into_iter().collect();
        }
        (1..len).map(|index| group(index).unwrap_or("")).collect()
    }
}
