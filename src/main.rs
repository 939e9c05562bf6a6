use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use finsafe_dashboard::config::Config;
use finsafe_dashboard::dashboard::Dashboard;
use finsafe_dashboard::notify::{HttpSender, LogSender, ReportSender};
use finsafe_dashboard::storage;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Load configuration before logging so the format can be chosen
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        Config::default()
    };

    // Initialize structured logging (set RUST_LOG=info for output)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    tracing::info!(
        config = %config_path,
        backend = ?config.storage.backend,
        "FinSafe dashboard starting"
    );

    let store = storage::open(&config.storage).await?;
    let sender: Arc<dyn ReportSender> = match HttpSender::from_config(&config.notify)? {
        Some(http) => {
            tracing::info!(endpoint = %config.notify.endpoint, "Fraud reports delivered through mail API");
            Arc::new(http)
        }
        None => {
            tracing::info!("notify.api_key not set, fraud reports are logged only");
            Arc::new(LogSender)
        }
    };
    let dashboard = Dashboard::init(&config, store, sender).await?;

    if !config.api.enabled {
        tracing::warn!("API disabled in configuration, nothing to serve");
        return Ok(());
    }

    // Create shutdown signal
    let shutdown = CancellationToken::new();

    let host = config.api.host.clone();
    let port = config.api.port;
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = finsafe_dashboard::api::serve(dashboard, &host, port, server_shutdown).await
        {
            tracing::error!(error = %e, "API server failed");
        }
    });

    tracing::info!("Dashboard API started. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping API server...");
    shutdown.cancel();

    let _ = server.await;

    tracing::info!("FinSafe dashboard stopped gracefully");
    Ok(())
}
