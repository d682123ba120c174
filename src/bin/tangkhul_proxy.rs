//! tangkhul-proxy：语言数据采集对话代理的 HTTP 服务入口
//!
//! Usage:
//!   tangkhul-proxy [--config <path>] [--bind <addr>] [--check]

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tangkhul_proxy::{serve, ProxyConfig, ProxyService};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tangkhul-proxy", version, about = "Chat AI proxy for language data collection")]
struct Cli {
    /// YAML configuration file
    #[arg(long, env = "TANGKHUL_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the configuration
    #[arg(long, env = "TANGKHUL_BIND")]
    bind: Option<String>,

    /// Print which provider credentials are present and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = ProxyConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    let service = Arc::new(ProxyService::from_config(&config).context("building providers")?);

    if cli.check {
        let (primary, secondary) = service.providers_configured();
        println!("language:  {}", config.language);
        println!("primary:   {} ({})", presence(primary), config.primary.api_key_env);
        println!("secondary: {} ({})", presence(secondary), config.secondary.api_key_env);
        return Ok(());
    }

    let addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {:?}", config.bind))?;
    serve(addr, service).await?;
    Ok(())
}

fn presence(configured: bool) -> &'static str {
    if configured {
        "key present"
    } else {
        "key missing"
    }
}
