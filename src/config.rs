//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;
use std::time::Duration;

/// 公共规则仓库（categories.json + technologies/{_,a..z}.json）
pub const DEFAULT_REMOTE_BASE_URL: &str =
    "https://raw.githubusercontent.com/enthec/webappanalyzer/main/src";

const CACHE_DIR_NAME: &str = ".techscan";
const CACHE_FILE_NAME: &str = "technologies.mp";

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 显式指定的规则库文件（优先级最高）
    pub technologies_file: Option<PathBuf>,
    // 规则缓存路径
    pub rule_cache_path: PathBuf,
    // 是否拉取最新规则库
    pub update: bool,
    // 缓存新鲜期，期内不重复下载
    pub update_interval: Duration,
    // 远程规则仓库地址
    pub remote_base_url: String,
    // 超时配置（单位：秒）
    pub http_timeout: u64,
    // 请求 User-Agent
    pub user_agent: Option<String>,
    // 是否校验 TLS 证书
    pub verify_tls: bool,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            technologies_file: None,
            rule_cache_path: default_cache_path(),
            update: false,
            update_interval: Duration::from_secs(24 * 60 * 60),
            remote_base_url: DEFAULT_REMOTE_BASE_URL.to_string(),
            http_timeout: 10,
            user_agent: None,
            verify_tls: true,
            verbose: false,
        }
    }
}

impl GlobalConfig {
    /// 未设置 RUST_LOG 时的默认日志过滤
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "techscan=debug"
        } else {
            "warn"
        }
    }
}

/// 缓存位置：$HOME → %APPDATA% → 当前目录
fn default_cache_path() -> PathBuf {
    ["HOME", "APPDATA"]
        .iter()
        .find_map(std::env::var_os)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CACHE_DIR_NAME)
        .join(CACHE_FILE_NAME)
}

/// 配置管理器（单例）
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn technologies_file(mut self, path: PathBuf) -> Self {
        self.config.technologies_file = Some(path);
        self
    }

    pub fn rule_cache_path(mut self, path: PathBuf) -> Self {
        self.config.rule_cache_path = path;
        self
    }

    pub fn update(mut self, update: bool) -> Self {
        self.config.update = update;
        self
    }

    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.config.update_interval = interval;
        self
    }

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote_base_url = url.into();
        self
    }

    pub fn http_timeout(mut self, timeout: u64) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.verify_tls = verify;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}
