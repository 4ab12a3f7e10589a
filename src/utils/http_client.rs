//! HTTP 客户端构建
//! 页面抓取与远程规则库下载共用同一套超时 / UA / TLS 配置

use std::time::Duration;
use reqwest::Client;

use crate::config::GlobalConfig;
use crate::error::ScanResult;

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("techscan/", env!("CARGO_PKG_VERSION"));

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// 按配置创建异步客户端（跟随重定向，支持 gzip）
    pub fn create(config: &GlobalConfig) -> ScanResult<Client> {
        let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout))
            .user_agent(user_agent)
            .danger_accept_invalid_certs(!config.verify_tls)
            .gzip(true)
            .build()?;
        Ok(client)
    }
}
