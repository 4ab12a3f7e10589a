//! 规则加载管理器
//! 负责从内存 / 本地文件 / 本地缓存 / 远程仓库加载规则库

use std::collections::BTreeMap;
use std::path::Path;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::cache::RuleCacheManager;
use super::model::{CategoryRule, RuleLibrary, TechRule};
use crate::config::GlobalConfig;
use crate::error::{ScanError, ScanResult};
use crate::utils::HttpClientFactory;

/// 内置默认规则库，仅在开启 embedded-rules 特性时编译
#[cfg(feature = "embedded-rules")]
static EMBEDDED_RULES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/technologies.json"));

/// 远程仓库技术规则分片（_ + a..z）
fn technology_shards() -> impl Iterator<Item = char> {
    std::iter::once('_').chain('a'..='z')
}

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 从已解析的 JSON 对象加载（缺少 categories / technologies 视为加载失败）
    pub fn from_value(value: Value) -> ScanResult<RuleLibrary> {
        serde_json::from_value(value).map_err(Self::load_error)
    }

    pub fn from_json_str(json: &str) -> ScanResult<RuleLibrary> {
        serde_json::from_str(json).map_err(Self::load_error)
    }

    pub fn from_slice(bytes: &[u8]) -> ScanResult<RuleLibrary> {
        serde_json::from_slice(bytes).map_err(Self::load_error)
    }

    /// 从本地 JSON 文件加载
    pub async fn from_file(path: &Path) -> ScanResult<RuleLibrary> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ScanError::RuleLoadError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let rule_lib = Self::from_slice(&bytes)?;
        info!(
            "rule library loaded from {}: {} technologies",
            path.display(),
            rule_lib.technologies.len()
        );
        Ok(rule_lib)
    }

    /// 内置默认规则库
    #[cfg(feature = "embedded-rules")]
    pub fn embedded() -> ScanResult<RuleLibrary> {
        Self::from_json_str(EMBEDDED_RULES)
    }

    /// 按配置加载最新规则库
    /// 优先级：显式文件 → （update 时）新鲜缓存或远程下载 → 已有缓存 → 内置默认规则库
    pub async fn latest(config: &GlobalConfig) -> ScanResult<RuleLibrary> {
        // 1. 显式指定的规则文件
        if let Some(path) = &config.technologies_file {
            return Self::from_file(path).await;
        }

        // 2. 拉取最新规则库（缓存新鲜期内直接复用）
        if config.update {
            if RuleCacheManager::is_fresh(config).await {
                match RuleCacheManager::load_from_cache(config).await {
                    Ok(rule_lib) => {
                        info!("rule cache updated within {:?}, skip download", config.update_interval);
                        return Ok(rule_lib);
                    }
                    Err(e) => warn!("fresh rule cache unreadable, downloading: {}", e),
                }
            }

            match Self::fetch_remote(config).await {
                Ok(rule_lib) => {
                    if let Err(e) = RuleCacheManager::save_to_cache(config, &rule_lib).await {
                        warn!("failed to cache downloaded rule library: {}", e);
                    } else {
                        info!("rule cache updated at {}", config.rule_cache_path.display());
                    }
                    return Ok(rule_lib);
                }
                Err(e) => warn!("could not download latest rule library, falling back to cache: {}", e),
            }
        }

        // 3. 已有缓存
        match RuleCacheManager::load_from_cache(config).await {
            Ok(rule_lib) => {
                info!("using rule cache at {}", config.rule_cache_path.display());
                Ok(rule_lib)
            }
            Err(e) => {
                debug!("rule cache unavailable: {}", e);
                Self::default_library(e)
            }
        }
    }

    #[cfg(feature = "embedded-rules")]
    fn default_library(cause: ScanError) -> ScanResult<RuleLibrary> {
        let rule_lib = Self::embedded()?;
        info!(
            "using embedded rule library: {} technologies ({})",
            rule_lib.technologies.len(),
            cause
        );
        Ok(rule_lib)
    }

    #[cfg(not(feature = "embedded-rules"))]
    fn default_library(cause: ScanError) -> ScanResult<RuleLibrary> {
        Err(ScanError::RuleLoadError(format!(
            "no rule library available: pass a technologies file or enable update to download one ({})",
            cause
        )))
    }

    /// 拉取远程规则库：categories.json + technologies/{_,a..z}.json 合并
    pub async fn fetch_remote(config: &GlobalConfig) -> ScanResult<RuleLibrary> {
        let client = HttpClientFactory::create(config)?;
        let base_url = config.remote_base_url.trim_end_matches('/');

        let categories: BTreeMap<String, CategoryRule> =
            Self::fetch_json(&client, &format!("{}/categories.json", base_url)).await?;

        let mut technologies = BTreeMap::new();
        for shard in technology_shards() {
            let url = format!("{}/technologies/{}.json", base_url, shard);
            let shard_rules: BTreeMap<String, TechRule> = Self::fetch_json(&client, &url).await?;
            debug!("shard [{}] fetched: {} technologies", shard, shard_rules.len());
            technologies.extend(shard_rules);
        }

        if technologies.is_empty() {
            return Err(ScanError::FetchError(format!("no technologies found under {}", base_url)));
        }
        info!(
            "remote rule library fetched: {} technologies, {} categories",
            technologies.len(),
            categories.len()
        );
        Ok(RuleLibrary { categories, technologies })
    }

    async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> ScanResult<T> {
        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ScanError::FetchError(format!(
                "{} returned status code {}",
                url,
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ScanError::FetchError(format!("invalid JSON from {}: {}", url, e)))
    }

    fn load_error(e: serde_json::Error) -> ScanError {
        ScanError::RuleLoadError(format!("malformed rule library: {}", e))
    }
}
