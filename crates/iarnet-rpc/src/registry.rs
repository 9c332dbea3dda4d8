//! Heartbeat intake — the gRPC service domain nodes talk to.
//!
//! `RegisterNode` creates a node explicitly; `HealthCheck` keeps it alive
//! and auto-creates it on first contact, so a node that lost its
//! registration state only ever needs to keep heart-beating.

use std::sync::Arc;

use chrono::Utc;
use tonic::{Request, Response, Status};
use tracing::info;

use iarnet_proto::registry as pb;
use iarnet_proto::registry::registry_service_server::RegistryService;
use iarnet_registry::{
    Node, NodePatch, NodeStatus, RegistryError, RegistryStore, ResourceCapacity, ResourceTags,
    ResourceVector,
};

/// Interval we recommend between heartbeats, in seconds.
const RECOMMENDED_HEARTBEAT_SECS: u32 = 30;

/// gRPC implementation of the heartbeat intake service.
pub struct HeartbeatServer {
    store: Arc<RegistryStore>,
}

impl HeartbeatServer {
    pub fn new(store: Arc<RegistryStore>) -> Self {
        Self { store }
    }

    pub fn into_service(self) -> pb::registry_service_server::RegistryServiceServer<Self> {
        pb::registry_service_server::RegistryServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl RegistryService for HeartbeatServer {
    async fn register_node(
        &self,
        request: Request<pb::RegisterNodeRequest>,
    ) -> Result<Response<pb::RegisterNodeResponse>, Status> {
        let req = request.into_inner();
        if req.domain_id.is_empty() {
            return Err(Status::invalid_argument("domain_id is required"));
        }
        if req.node_id.is_empty() {
            return Err(Status::invalid_argument("node_id is required"));
        }
        if req.node_name.is_empty() {
            return Err(Status::invalid_argument("node_name is required"));
        }

        let domain = self.store.get_domain(&req.domain_id).map_err(to_status)?;

        let now = Utc::now();
        self.store
            .add_node(Node {
                id: req.node_id.clone(),
                domain_id: req.domain_id.clone(),
                name: req.node_name.clone(),
                // The address arrives with the first heartbeat.
                address: String::new(),
                is_head: false,
                status: NodeStatus::Offline,
                resource_tags: None,
                resource_capacity: None,
                created_at: now,
                updated_at: now,
                last_seen: now,
            })
            .map_err(to_status)?;

        info!(id = %req.node_id, name = %req.node_name, domain = %req.domain_id, "node registered");

        Ok(Response::new(pb::RegisterNodeResponse {
            domain_name: domain.name,
            domain_description: domain.description,
        }))
    }

    async fn health_check(
        &self,
        request: Request<pb::HealthCheckRequest>,
    ) -> Result<Response<pb::HealthCheckResponse>, Status> {
        let req = request.into_inner();
        if req.node_id.is_empty() {
            return Err(Status::invalid_argument("node_id is required"));
        }
        if req.domain_id.is_empty() {
            return Err(Status::invalid_argument("domain_id is required"));
        }

        let now = Utc::now();
        let status = node_status_from_proto(req.status);

        if self.store.get_node(&req.node_id).is_err() {
            // First contact: make sure the domain exists, then create the
            // node from whatever the heartbeat carried.
            self.store.get_domain(&req.domain_id).map_err(to_status)?;

            self.store
                .add_node(Node {
                    id: req.node_id.clone(),
                    domain_id: req.domain_id.clone(),
                    // No registered name to fall back on.
                    name: req.node_id.clone(),
                    address: req.address,
                    is_head: req.is_head,
                    status,
                    resource_tags: req.resource_tags.map(tags_from_proto),
                    resource_capacity: req.resource_capacity.map(capacity_from_proto),
                    created_at: now,
                    updated_at: now,
                    last_seen: now,
                })
                .map_err(to_status)?;

            info!(id = %req.node_id, domain = %req.domain_id, "node auto-registered on first heartbeat");
        } else {
            // Known node: fold the heartbeat into a patch. The address only
            // overwrites when supplied, and head status is only ever set —
            // demotion requires an explicit removal.
            self.store
                .update_node(
                    &req.node_id,
                    NodePatch {
                        status: Some(status),
                        last_seen: Some(now),
                        address: (!req.address.is_empty()).then_some(req.address),
                        resource_tags: req.resource_tags.map(tags_from_proto),
                        resource_capacity: req.resource_capacity.map(capacity_from_proto),
                        is_head: req.is_head.then_some(true),
                    },
                )
                .map_err(to_status)?;
        }

        Ok(Response::new(pb::HealthCheckResponse {
            server_timestamp: now.timestamp_nanos_opt().unwrap_or_default(),
            recommended_interval_seconds: RECOMMENDED_HEARTBEAT_SECS,
            require_reregister: false,
            status_code: "success".to_string(),
            message: "health check processed".to_string(),
        }))
    }
}

/// Map registry errors onto gRPC status codes.
pub(crate) fn to_status(err: RegistryError) -> Status {
    match err {
        RegistryError::DomainNotFound(_) | RegistryError::NodeNotFound(_) => {
            Status::not_found(err.to_string())
        }
        RegistryError::DomainAlreadyExists(_) | RegistryError::NodeAlreadyExists(_) => {
            Status::already_exists(err.to_string())
        }
        RegistryError::InvalidArgument(_) => Status::invalid_argument(err.to_string()),
        RegistryError::NodeNotInDomain { .. } => Status::failed_precondition(err.to_string()),
        RegistryError::Persistence(_) => Status::internal(err.to_string()),
    }
}

fn node_status_from_proto(status: i32) -> NodeStatus {
    match pb::NodeStatus::try_from(status) {
        Ok(pb::NodeStatus::Online) => NodeStatus::Online,
        Ok(pb::NodeStatus::Error) => NodeStatus::Error,
        // Offline, unspecified, or out of range: the safe reading.
        _ => NodeStatus::Offline,
    }
}

fn tags_from_proto(tags: pb::ResourceTags) -> ResourceTags {
    ResourceTags::new(tags.cpu, tags.gpu, tags.memory, tags.camera)
}

fn capacity_from_proto(capacity: pb::ResourceCapacity) -> ResourceCapacity {
    ResourceCapacity {
        total: capacity.total.map(vector_from_proto).unwrap_or_default(),
        available: capacity.available.map(vector_from_proto).unwrap_or_default(),
    }
}

fn vector_from_proto(vector: pb::ResourceVector) -> ResourceVector {
    ResourceVector {
        cpu: vector.cpu,
        gpu: vector.gpu,
        memory: vector.memory,
    }
}
