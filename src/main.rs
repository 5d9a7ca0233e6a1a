//! Visit Dashboard - Binary Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::info;

use visit_log::api::{create_router, AppState};
use visit_log::config::Config;
use visit_log::init::init_tracing;
use visit_log::store::open_store;

/// Resolves once Ctrl+C or SIGTERM is received
fn shutdown_signal() -> anyhow::Result<oneshot::Receiver<()>> {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));

    ctrlc::set_handler(move || {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(());
        }
    })
    .context("failed to install shutdown handler")?;

    Ok(rx)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.log_filter);

    let store = open_store(&config.store).context("failed to open visit store")?;
    let state = Arc::new(AppState::new(store.clone()));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(
        "{} {} listening on http://{}",
        visit_log::NAME,
        visit_log::VERSION,
        listener.local_addr()?
    );

    let shutdown = shutdown_signal()?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = shutdown.await;
        info!("Shutdown signal received");
    })
    .await?;

    store.close()?;
    Ok(())
}
