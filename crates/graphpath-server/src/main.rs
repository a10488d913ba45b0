mod config;
mod routes;
mod state;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "graphpath-server", version, about = "GraphPath HTTP server")]
struct Args {
    /// Path to the TOML config (default: config.toml)
    #[arg(long, env = "GRAPHPATH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address from the config.
    #[arg(long)]
    bind: Option<String>,

    /// Override the catalog path from the config.
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut cfg = config::load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }
    if let Some(catalog) = args.catalog {
        cfg.server.catalog_path = catalog.display().to_string();
    }

    let state = Arc::new(state::AppState::init(&cfg)?);
    let addr = state.cfg.server.bind.clone();
    let app = routes::create_router(state);

    tracing::info!("graphpath-server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down");
}
