//! Header格式转换工具
//! 各种 Header 输入统一转换为 小写名 → 单值 映射，重复 Header 以 ", " 合并

use std::collections::HashMap;
use std::time::Instant;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::debug;

use crate::error::{ScanError, ScanResult};

const JOIN_SEPARATOR: &str = ", ";

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// HeaderMap → 单值映射
    pub fn to_single_value_map(header_map: &HeaderMap) -> HashMap<String, String> {
        let start = Instant::now();
        let pairs = header_map.iter().map(|(key, value)| {
            (key.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
        });
        let map = Self::from_pairs(pairs);

        debug!(
            "header conversion finished in {:?}, {} entries",
            start.elapsed(),
            map.len()
        );
        map
    }

    /// 键值对序列 → 单值映射
    pub fn from_pairs<I, K, V>(pairs: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map: HashMap<String, String> = HashMap::new();
        for (key, value) in pairs {
            let value = value.into();
            map.entry(key.as_ref().to_lowercase())
                .and_modify(|existing| {
                    existing.push_str(JOIN_SEPARATOR);
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        map
    }

    /// JSON 对象 → 单值映射
    /// 值为数组时按 ", " 合并，数字/布尔转字符串；非对象输入直接拒绝
    pub fn from_json(headers: &Value) -> ScanResult<HashMap<String, String>> {
        let Value::Object(object) = headers else {
            return Err(ScanError::InvalidInput(format!(
                "headers must be a JSON object, got: {}",
                headers
            )));
        };

        let mut pairs = Vec::with_capacity(object.len());
        for (key, value) in object {
            match value {
                Value::Array(items) => {
                    for item in items {
                        pairs.push((key.as_str(), Self::scalar_to_string(key, item)?));
                    }
                }
                other => pairs.push((key.as_str(), Self::scalar_to_string(key, other)?)),
            }
        }
        Ok(Self::from_pairs(pairs))
    }

    fn scalar_to_string(key: &str, value: &Value) -> ScanResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(ScanError::InvalidInput(format!(
                "unsupported value for header '{}': {}",
                key, other
            ))),
        }
    }
}
