//! 全局错误类型定义

use thiserror::Error;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum ScanError {
    // 规则相关错误
    #[error("signature database load failed: {0}")]
    RuleLoadError(String),
    #[error("signature cache failed: {0}")]
    RuleCacheError(String),

    // 检测相关错误
    #[error("detector not initialized: {0}")]
    DetectorNotInitialized(String),

    // 网络相关错误（外部协作者：页面抓取 / 远程规则库）
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("fetch failed: {0}")]
    FetchError(String),

    // 序列化/反序列化错误
    #[error("json error: {0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("io error: {0}")]
    IoError(#[from] IoError),
    #[error("invalid url: {0}")]
    UrlError(#[from] UrlParseError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type ScanResult<T> = Result<T, ScanError>;
