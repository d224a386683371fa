//! Text-classification model registry server - HTTP API over the in-memory
//! registry with a background training pool.

use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use textcat_registry::{http, ImmediateTrainer, ModelService, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "textcat_registry=info,textcat_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();
    info!(
        queue = %config.queue_name,
        workers = config.worker_count,
        labels = config.labels.len(),
        "starting model registry"
    );

    let service = Arc::new(ModelService::in_memory(&config));
    let pool = service.spawn_workers(ImmediateTrainer, service.sender().clone())?;

    let app = http::router(service.clone());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stats = tokio::task::spawn_blocking(move || pool.stop()).await?;
    info!(
        trained = stats.trained,
        failed = stats.failed,
        orphaned = stats.orphaned,
        stale = stats.stale,
        errored = stats.errored,
        "training workers stopped"
    );

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
