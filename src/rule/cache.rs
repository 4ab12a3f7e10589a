//! 规则缓存管理
//! 仅处理规则库的本地序列化（MessagePack）和反序列化

use std::time::{Duration, SystemTime};
use rmp_serde::from_slice;
use tracing::debug;

use super::model::RuleLibrary;
use crate::config::GlobalConfig;
use crate::error::{ScanError, ScanResult};

/// 规则缓存管理器
pub struct RuleCacheManager;

impl RuleCacheManager {
    /// 从本地缓存加载规则库
    pub async fn load_from_cache(config: &GlobalConfig) -> ScanResult<RuleLibrary> {
        let cache_path = &config.rule_cache_path;
        let cache_data = tokio::fs::read(cache_path).await.map_err(|e| {
            ScanError::RuleCacheError(format!("cannot read {}: {}", cache_path.display(), e))
        })?;

        // MessagePack反序列化
        let rule_lib: RuleLibrary = from_slice(&cache_data)
            .map_err(|e| ScanError::RuleCacheError(format!("deserialization failed: {}", e)))?;

        debug!(
            "cache loaded from {}: {} technologies, {} categories",
            cache_path.display(),
            rule_lib.technologies.len(),
            rule_lib.categories.len()
        );
        Ok(rule_lib)
    }

    /// 将规则库缓存到本地（自动创建父目录）
    pub async fn save_to_cache(config: &GlobalConfig, rule_lib: &RuleLibrary) -> ScanResult<()> {
        let cache_path = &config.rule_cache_path;

        // 按字段名序列化，保证 untagged 字段可还原
        let cache_data = rmp_serde::to_vec_named(rule_lib)
            .map_err(|e| ScanError::RuleCacheError(format!("serialization failed: {}", e)))?;
        debug!("rule library serialized, {} bytes", cache_data.len());

        if let Some(parent) = cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(cache_path, cache_data).await?;
        Ok(())
    }

    /// 缓存文件距今时长，缓存不存在时为 None
    pub async fn cache_age(config: &GlobalConfig) -> Option<Duration> {
        let metadata = tokio::fs::metadata(&config.rule_cache_path).await.ok()?;
        let modified = metadata.modified().ok()?;
        Some(SystemTime::now().duration_since(modified).unwrap_or_default())
    }

    /// 缓存是否仍在新鲜期内
    pub async fn is_fresh(config: &GlobalConfig) -> bool {
        Self::cache_age(config)
            .await
            .is_some_and(|age| age < config.update_interval)
    }

    /// 清除本地缓存
    pub async fn clear_cache(config: &GlobalConfig) -> ScanResult<()> {
        let cache_path = &config.rule_cache_path;
        if tokio::fs::try_exists(cache_path).await? {
            tokio::fs::remove_file(cache_path).await?;
        }
        Ok(())
    }
}
