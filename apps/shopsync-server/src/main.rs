//! shopsync server: webhook intake, operator API, background sync worker.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use shopsync_api::{api_router, ApiState};
use shopsync_engine::{
    ConflictDetector, InMemoryAuthority, InMemoryPlatform, LockRegistry, Orchestrator, Reconciler,
    SyncWorker,
};
use shopsync_store::Stores;
use shopsync_webhooks::{webhooks_router, WebhookAdapter, WebhooksState};

use config::ServerConfig;

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,shopsync=debug")),
        )
        .init();

    let config = ServerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    tracing::info!(
        listen_addr = %config.listen_addr,
        batch_size = config.engine.batch_size,
        concurrency = config.worker.concurrency,
        "starting shopsync server"
    );

    let stores = Stores::new();
    let platform = Arc::new(InMemoryPlatform::new());
    let authority = Arc::new(InMemoryAuthority::new());
    let detector = Arc::new(ConflictDetector::new(stores.conflicts.clone()));
    let locks = Arc::new(LockRegistry::new());
    let reconciler = Arc::new(Reconciler::new(
        platform.clone(),
        authority,
        stores.clone(),
        detector.clone(),
        locks.clone(),
        config.engine.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        stores.clone(),
        reconciler,
        platform,
        config.engine.clone(),
    ));

    let worker = Arc::new(SyncWorker::new(
        orchestrator.clone(),
        stores.jobs.clone(),
        locks,
        config.worker.clone(),
    ));
    let worker_handle = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.run().await })
    };

    let adapter = Arc::new(WebhookAdapter::new(stores.tenants.clone(), orchestrator.clone()));
    let app = webhooks_router(WebhooksState { adapter })
        .merge(api_router(ApiState::new(stores, orchestrator, detector)));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Bind error: {e}");
            std::process::exit(1);
        });

    tracing::info!(listen_addr = %config.listen_addr, "shopsync HTTP server listening");

    let serve_worker = worker.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            serve_worker.shutdown();
        })
        .await
        .unwrap_or_else(|e| {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        });

    // Give the worker a chance to drain in-flight jobs.
    if let Err(e) = worker_handle.await {
        tracing::warn!(error = %e, "worker task ended abnormally");
    }
    tracing::info!("shopsync server stopped");
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
}
