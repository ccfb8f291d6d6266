use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use page_driver::CdpSessionFactory;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use confirmatudo::config::AppConfig;
use confirmatudo::orchestrator::{Orchestrator, Strategy};
use confirmatudo::server::{build_router, AppState, RateLimitConfig};

#[derive(Parser, Debug)]
#[command(name = "confirmatudo", version, about = "Delivery confirmation orchestrator")]
struct Cli {
    /// Listen port (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Fallback strategy: sequential | concurrent.
    #[arg(long)]
    strategy: Option<String>,

    /// Browser executable path (overrides CONFIRMA_CHROME).
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Run the browser with a visible window.
    #[arg(long)]
    headful: bool,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut config = AppConfig::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(strategy) = &cli.strategy {
        config.strategy = Strategy::from_str(strategy)
            .map_err(|err| anyhow::anyhow!(err))
            .context("invalid --strategy")?;
    }
    if let Some(chrome) = cli.chrome {
        config.browser_executable = Some(chrome);
    }
    if cli.headful {
        config.headless = false;
    }

    let factory = Arc::new(CdpSessionFactory::new(config.driver_config()));
    let orchestrator = Arc::new(Orchestrator::new(
        config.registry(),
        factory,
        config.strategy,
        config.tuning(),
        config.max_sessions,
    ));
    let state = AppState::new(
        orchestrator,
        RateLimitConfig {
            confirm_per_min: config.rate_per_min,
        },
    );
    // Runs for the life of the process; the handle is not joined.
    let _gc = state
        .rate_limiter
        .spawn_gc(Duration::from_secs(60), Duration::from_secs(600));
    let router = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    info!(%addr, strategy = ?config.strategy, "ConfirmaTudo API escutando");
    axum::serve(listener, router.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    Ok(())
}
