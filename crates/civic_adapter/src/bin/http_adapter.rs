#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};

use civic_adapter::config::AdapterConfig;
use civic_adapter::http::router;
use civic_adapter::refresh::spawn_refresh_worker;
use civic_adapter::AdapterRuntime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AdapterConfig::from_env()?;
    let runtime = Arc::new(Mutex::new(AdapterRuntime::from_config(&config)?));
    if config.refresh_enabled {
        spawn_refresh_worker(runtime.clone(), config.refresh_interval_ms);
    }
    let app = router(runtime);

    info!(
        addr = %config.bind,
        persistence = config.persistence_mode.as_str(),
        refresh_enabled = config.refresh_enabled,
        refresh_interval_ms = config.refresh_interval_ms,
        "civic_adapter_http listening"
    );
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => {
            tracing::warn!(error = %err, "ctrl-c handler unavailable; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
