//! RPC server lifecycle.
//!
//! Binds one listener and mounts both services on it: heartbeat intake
//! for domain nodes and the scheduling surface for external clients.
//! Shutdown is graceful with a hard budget; past it the serve task is
//! aborted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info, warn};

use iarnet_registry::RegistryStore;
use iarnet_scheduler::Scheduler;

use crate::registry::HeartbeatServer;
use crate::scheduler::SchedulerServer;

/// Largest inbound message the intake accepts.
pub const MAX_INBOUND_MESSAGE_BYTES: usize = 512 * 1024 * 1024;

/// How long a graceful stop may take before the server is killed.
const GRACEFUL_STOP_BUDGET: Duration = Duration::from_secs(30);

/// Errors starting the RPC server.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to bind rpc listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// A running RPC server; dropping it does not stop it — call
/// [`RpcServer::shutdown`].
pub struct RpcServer {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl RpcServer {
    /// Bind `addr` and start serving both gRPC services.
    pub async fn start(
        addr: SocketAddr,
        store: Arc<RegistryStore>,
        scheduler: Arc<Scheduler>,
    ) -> Result<Self, RpcError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let registry_service = HeartbeatServer::new(store)
            .into_service()
            .max_decoding_message_size(MAX_INBOUND_MESSAGE_BYTES);
        let scheduler_service = SchedulerServer::new(scheduler).into_service();

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            Server::builder()
                .add_service(registry_service)
                .add_service(scheduler_service)
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
        });

        info!(addr = %local_addr, "rpc server listening");
        Ok(Self {
            addr: local_addr,
            shutdown_tx,
            handle,
        })
    }

    /// The bound address (useful when started on port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting, drain in-flight calls, and force-stop past the
    /// budget.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);

        match tokio::time::timeout(GRACEFUL_STOP_BUDGET, &mut self.handle).await {
            Ok(Ok(Ok(()))) => info!("rpc server stopped"),
            Ok(Ok(Err(err))) => error!(error = %err, "rpc server exited with error"),
            Ok(Err(join_err)) => error!(error = %join_err, "rpc server task panicked"),
            Err(_) => {
                warn!("rpc server graceful stop timed out, forcing stop");
                self.handle.abort();
            }
        }
    }
}
