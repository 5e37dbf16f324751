use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use ticker_core::config::{TickerConfig, SHUTDOWN_GRACE_SECS};
use ticker_core::TickerError;
use ticker_scheduler::{TickService, TimerExit};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod error;
mod http;
mod logging;
mod shutdown;
mod sse;

/// Minute-aligned Server-Sent Events tick server.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to a TOML config file (default: ./ticker.toml).
    #[arg(long, env = "TICKER_CONFIG")]
    config: Option<String>,

    /// Override the listen port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // load config before tracing: it carries the log level and directory
    let loaded = TickerConfig::load(cli.config.as_deref());
    let defaults = TickerConfig::default();
    let early = loaded.as_ref().unwrap_or(&defaults);
    let log_level = early.log_level.clone();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("ticker_gateway={log_level},ticker_scheduler={log_level},tower_http=info").into()
    });
    let _file_logs = logging::init(filter, early.log_dir().map(Path::new))?;
    install_panic_hook();

    let mut config = loaded.unwrap_or_else(|e| {
        warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        TickerConfig::default()
    });
    if let Some(port) = cli.port {
        config.port = port;
    }

    let addr = config.socket_addr().inspect_err(startup_failed)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(TickerError::from)
        .inspect_err(startup_failed)?;

    let ticks = Arc::new(TickService::new());
    ticks.start();
    supervise(Arc::clone(&ticks));

    let environment = config.environment;
    let cors_origin = config.cors_origin.clone();
    let state = Arc::new(app::AppState::new(config, Arc::clone(&ticks)));
    let router = app::build_router(state);

    info!(
        %addr,
        environment = environment.as_str(),
        cors_origin = %cors_origin,
        "Tick server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown::on_signal(
            Arc::clone(&ticks),
            Duration::from_secs(SHUTDOWN_GRACE_SECS),
        ))
        .await?;

    // no-op after a signal; covers the server exiting on its own
    ticks.shutdown();
    info!("Graceful shutdown completed");
    Ok(())
}

fn startup_failed(e: &TickerError) {
    error!(code = e.code(), "Startup failed: {e}");
}

/// A panicked timer leaves the server up but silent: treat it as fatal.
fn supervise(ticks: Arc<TickService>) {
    tokio::spawn(async move {
        if let TimerExit::Panicked(detail) = ticks.timer_exit().await {
            error!(panic = %detail, "Tick scheduler crashed, exiting");
            std::process::exit(1);
        }
    });
}

/// Route panics through tracing so they land in the same log stream.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic| {
        let location = panic
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(%location, "Uncaught panic: {panic}");
    }));
}
