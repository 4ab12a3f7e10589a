//! techscan 命令行：抓取页面并输出检测到的技术（JSON）

use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use techscan::{ConfigManager, HtmlPage, TechDetector};

#[derive(Debug, Parser)]
#[command(name = "techscan", version, about = "Detect the technologies used by a website")]
struct Cli {
    /// 目标 URL
    url: String,

    /// 下载最新的 technologies 规则库（24 小时内已更新则复用缓存）
    #[arg(long)]
    update: bool,

    /// 请求使用的 User-Agent
    #[arg(long)]
    user_agent: Option<String>,

    /// 请求超时（秒）
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// 不校验 TLS 证书
    #[arg(long)]
    no_verify: bool,

    /// 使用本地 technologies.json
    #[arg(long, value_name = "PATH")]
    technologies_file: Option<PathBuf>,

    /// 规则缓存位置
    #[arg(long, value_name = "PATH")]
    cache_path: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = ConfigManager::custom()
        .update(cli.update)
        .user_agent(cli.user_agent)
        .http_timeout(cli.timeout)
        .verify_tls(!cli.no_verify)
        .verbose(cli.verbose);
    if let Some(path) = cli.technologies_file {
        builder = builder.technologies_file(path);
    }
    if let Some(path) = cli.cache_path {
        builder = builder.rule_cache_path(path);
    }
    let config = builder.build();

    // 日志写 stderr，stdout 只输出 JSON
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    debug!("config: {:?}", config);

    let detector = TechDetector::from_config(&config)
        .await
        .context("failed to load the technologies database")?;
    let page = HtmlPage::fetch(&cli.url, &config)
        .await
        .with_context(|| format!("failed to fetch {}", cli.url))?;

    let results = detector.analyze_with_versions_and_categories(&page);
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
