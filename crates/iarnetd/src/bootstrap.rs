//! Dependency-ordered wiring of the control plane.
//!
//! Persistence → registry (load domains) → liveness monitor → RPC → HTTP.
//! Shutdown runs the same chain in reverse, fanned out over one watch
//! channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use iarnet_api::LogRing;
use iarnet_persist::DomainRepo;
use iarnet_registry::{LivenessMonitor, RegistryService, RegistryStore};
use iarnet_rpc::RpcServer;
use iarnet_scheduler::Scheduler;

use crate::config::Config;

/// Run the daemon until ctrl-c.
pub async fn run(config: Config, logs: LogRing) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;

    // ── Registry core ──────────────────────────────────────────────

    let repo = DomainRepo::open(&config.database_path(), config.pool_settings()).await?;
    let store = Arc::new(RegistryStore::new());
    let service = Arc::new(RegistryService::new(store.clone(), repo.clone()));

    let loaded = service.load_domains().await?;
    info!(loaded, "registry initialized");

    // ── Background liveness monitor ────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = LivenessMonitor::new(store.clone());
    let monitor_handle = tokio::spawn(async move {
        monitor.run(shutdown_rx).await;
    });

    // ── RPC surface (heartbeat intake + scheduling) ────────────────

    let scheduler = Arc::new(Scheduler::new(store.clone()));
    let rpc_addr = SocketAddr::from(([0, 0, 0, 0], config.rpc.port));
    let rpc_server = RpcServer::start(rpc_addr, store, scheduler).await?;

    // ── HTTP admin surface ─────────────────────────────────────────

    let router = iarnet_api::build_router(service, logs);
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    info!(addr = %http_addr, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install ctrl-c handler");
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    // ── Teardown ───────────────────────────────────────────────────

    rpc_server.shutdown().await;
    let _ = monitor_handle.await;
    repo.close().await;

    info!("iarnet-global stopped");
    Ok(())
}
