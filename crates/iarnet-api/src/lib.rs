//! iarnet-api — the HTTP admin surface of IARNet-Global.
//!
//! JSON over HTTP, separate port from the RPC surface:
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/registry/domains` | List domains with node stats |
//! | POST | `/registry/domains` | Create a domain |
//! | GET | `/registry/domains/{id}` | Domain detail with nodes |
//! | PUT | `/registry/domains/{id}` | Update name/description |
//! | DELETE | `/registry/domains/{id}` | Delete domain (cascades nodes) |
//! | GET | `/registry/domains/{id}/nodes` | Nodes of one domain |
//! | GET | `/logs` | Tail the in-memory log ring |
//! | POST | `/logs/clear` | Empty the log ring |

pub mod handlers;
pub mod logs;
pub mod response;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use iarnet_registry::RegistryService;

pub use logs::{LogRing, RingLayer};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<RegistryService>,
    pub logs: LogRing,
}

/// Build the admin router.
pub fn build_router(service: Arc<RegistryService>, logs: LogRing) -> Router {
    let state = ApiState { service, logs };

    Router::new()
        .route(
            "/registry/domains",
            get(handlers::list_domains).post(handlers::create_domain),
        )
        .route(
            "/registry/domains/{id}",
            get(handlers::get_domain)
                .put(handlers::update_domain)
                .delete(handlers::delete_domain),
        )
        .route("/registry/domains/{id}/nodes", get(handlers::get_domain_nodes))
        .route("/logs", get(logs::get_logs))
        .route("/logs/clear", post(logs::clear_logs))
        .with_state(state)
}
