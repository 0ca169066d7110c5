//! NCEZ simulator - web server entry point

use anyhow::Context;
use clap::Parser;
use ncez_simulator::{api::create_router, config::Config, logging, state::AppState};
use ncez_terminology::WatchOptions;

#[derive(Debug, Parser)]
#[command(name = "ncez-simulator", version, about = "NCEZ terminology and identifier simulator")]
struct Args {
    /// Config file (defaults to $NCEZ_CONFIG or ./ncez.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => {
            dotenvy::dotenv().ok();
            Config::load_from(path)
        }
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _logging_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting NCEZ simulator");

    let addr = config
        .socket_addr()
        .context("Failed to determine socket address")?;

    let watch_options = config.terminology.watch_enabled.then(|| WatchOptions {
        poll_interval: config.terminology.poll_interval(),
        debounce: config.terminology.debounce(),
    });

    tracing::info!(
        listen_addr = %addr,
        codesets_dir = %config.terminology.codesets_dir.display(),
        data_root = %config.storage.data_root.display(),
        watch_enabled = watch_options.is_some(),
        "Configuration loaded"
    );

    let state = AppState::new(config)
        .await
        .context("Failed to initialize application state")?;

    let watcher = watch_options.and_then(|options| state.terminology.start_watching(options));

    let app = create_router(state);

    tracing::info!("NCEZ simulator listening on http://{}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(watcher) = watcher {
        watcher.shutdown().await;
    }

    if let Err(e) = served {
        tracing::error!(error = %e, "Server terminated unexpectedly");
        return Err(e.into());
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, starting graceful shutdown...");
        }
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received, starting graceful shutdown...");
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
