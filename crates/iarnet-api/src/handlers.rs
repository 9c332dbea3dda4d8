//! Admin REST handlers for domain CRUD and node listings.
//!
//! Each handler goes through the registry service and wraps the result in
//! the standard envelope. Registry error kinds map onto 400/404/500.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use iarnet_registry::{Domain, Node, RegistryError, ResourceTags};

use crate::response;
use crate::ApiState;

// ── Wire shapes ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize)]
pub struct CreateDomainBody {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDomainRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct DomainListBody {
    pub domains: Vec<DomainItem>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct DomainItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub node_count: usize,
    pub online_nodes: usize,
    pub resource_tags: ResourceTags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct DomainDetailBody {
    pub id: String,
    pub name: String,
    pub description: String,
    pub resource_tags: ResourceTags,
    pub nodes: Vec<NodeItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct NodeItem {
    pub id: String,
    pub name: String,
    pub address: String,
    pub status: &'static str,
    pub is_head: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_tags: Option<ResourceTags>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct DomainNodesBody {
    pub nodes: Vec<NodeItem>,
    pub total: usize,
}

impl From<&Node> for NodeItem {
    fn from(node: &Node) -> Self {
        NodeItem {
            id: node.id.clone(),
            name: node.name.clone(),
            address: node.address.clone(),
            status: node.status.as_str(),
            is_head: node.is_head,
            resource_tags: node.resource_tags,
            last_seen: node.last_seen,
        }
    }
}

// ── Handlers ───────────────────────────────────────────────────────

/// GET /registry/domains
pub async fn list_domains(State(state): State<ApiState>) -> impl IntoResponse {
    let domains = state.service.get_all_domains();
    let mut items = Vec::with_capacity(domains.len());

    for domain in &domains {
        // A stats failure for one domain degrades that row, it does not
        // fail the listing.
        let (node_count, online_nodes) = match state.service.domain_stats(&domain.id) {
            Ok(stats) => (stats.total_nodes, stats.online_nodes),
            Err(err) => {
                warn!(id = %domain.id, error = %err, "failed to get domain stats");
                (domain.node_ids.len(), 0)
            }
        };

        items.push(DomainItem {
            id: domain.id.clone(),
            name: domain.name.clone(),
            description: domain.description.clone(),
            node_count,
            online_nodes,
            resource_tags: domain.resource_tags,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        });
    }

    response::success(DomainListBody {
        total: items.len(),
        domains: items,
    })
}

/// POST /registry/domains
pub async fn create_domain(
    State(state): State<ApiState>,
    Json(req): Json<CreateDomainRequest>,
) -> Response {
    if req.name.is_empty() {
        return response::bad_request("domain name is required").into_response();
    }

    match state.service.create_domain(&req.name, &req.description).await {
        Ok(domain) => {
            info!(id = %domain.id, name = %domain.name, "domain created via admin api");
            response::created(CreateDomainBody {
                id: domain.id,
                name: domain.name,
                description: domain.description,
                created_at: domain.created_at,
            })
            .into_response()
        }
        Err(err) => {
            error!(error = %err, "failed to create domain");
            error_response(err)
        }
    }
}

/// GET /registry/domains/{id}
pub async fn get_domain(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Response {
    let domain = match state.service.get_domain(&id) {
        Ok(domain) => domain,
        Err(err) => return error_response(err),
    };

    // Tolerate the member list changing under us; an empty node list is
    // better than failing the whole detail view.
    let nodes = state.service.get_domain_nodes(&id).unwrap_or_default();

    response::success(detail_body(&domain, &nodes)).into_response()
}

/// PUT /registry/domains/{id}
pub async fn update_domain(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDomainRequest>,
) -> Response {
    match state.service.update_domain(&id, req.name, req.description).await {
        Ok(_) => response::success_empty().into_response(),
        Err(err) => {
            error!(id = %id, error = %err, "failed to update domain");
            error_response(err)
        }
    }
}

/// DELETE /registry/domains/{id}
pub async fn delete_domain(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Response {
    match state.service.delete_domain(&id).await {
        Ok(()) => {
            info!(%id, "domain deleted via admin api");
            response::success_empty().into_response()
        }
        Err(err) => error_response(err),
    }
}

/// GET /registry/domains/{id}/nodes
pub async fn get_domain_nodes(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Response {
    match state.service.get_domain_nodes(&id) {
        Ok(nodes) => response::success(DomainNodesBody {
            total: nodes.len(),
            nodes: nodes.iter().map(NodeItem::from).collect(),
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

fn detail_body(domain: &Domain, nodes: &[Node]) -> DomainDetailBody {
    DomainDetailBody {
        id: domain.id.clone(),
        name: domain.name.clone(),
        description: domain.description.clone(),
        resource_tags: domain.resource_tags,
        nodes: nodes.iter().map(NodeItem::from).collect(),
        created_at: domain.created_at,
        updated_at: domain.updated_at,
    }
}

fn error_response(err: RegistryError) -> Response {
    match &err {
        RegistryError::InvalidArgument(_) => response::bad_request(err.to_string()),
        _ if err.is_not_found() => response::not_found(err.to_string()),
        _ => response::internal_error(err.to_string()),
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::Arc;

    use iarnet_persist::DomainRepo;
    use iarnet_registry::{RegistryService, RegistryStore};

    use crate::logs::LogRing;

    async fn test_state() -> ApiState {
        let store = Arc::new(RegistryStore::new());
        let repo = DomainRepo::open_in_memory().await.unwrap();
        ApiState {
            service: Arc::new(RegistryService::new(store, repo)),
            logs: LogRing::default(),
        }
    }

    #[tokio::test]
    async fn create_requires_name() {
        let state = test_state().await;
        let resp = create_domain(
            State(state),
            Json(CreateDomainRequest { name: String::new(), description: String::new() }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_then_list_and_detail() {
        let state = test_state().await;

        let resp = create_domain(
            State(state.clone()),
            Json(CreateDomainRequest {
                name: "prod".to_string(),
                description: "production".to_string(),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = list_domains(State(state.clone())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let id = state.service.get_all_domains()[0].id.clone();
        let resp = get_domain(State(state), Path(id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_missing_domain_is_404() {
        let state = test_state().await;
        let resp = get_domain(State(state), Path("domain.ghost".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_and_delete_round_trip() {
        let state = test_state().await;
        let domain = state.service.create_domain("prod", "").await.unwrap();

        let resp = update_domain(
            State(state.clone()),
            Path(domain.id.clone()),
            Json(UpdateDomainRequest {
                name: Some("staging".to_string()),
                description: None,
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.service.get_domain(&domain.id).unwrap().name, "staging");

        let resp = delete_domain(State(state.clone()), Path(domain.id.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = delete_domain(State(state), Path(domain.id)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn nodes_of_missing_domain_is_404() {
        let state = test_state().await;
        let resp = get_domain_nodes(State(state), Path("domain.ghost".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
