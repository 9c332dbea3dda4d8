//! Scheduling decision and delegated dispatch.
//!
//! Policy is deliberately trivial: among domains that have at least one
//! eligible node, draw a domain uniformly, then a node uniformly within
//! it. The two-level draw equalizes per-domain selection probability
//! regardless of how many nodes each domain runs. The contract is the
//! careful part: the scheduler always answers with a structured response,
//! candidate nodes are cloned out of the store before any I/O, and every
//! request dials a fresh connection that closes after the call.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tonic::transport::Endpoint;
use tracing::{info, warn};

use iarnet_proto::scheduler::scheduler_service_client::SchedulerServiceClient;
use iarnet_proto::scheduler::{DeployComponentRequest, DeployComponentResponse, ResourceRequest};
use iarnet_registry::{Node, NodeStatus, RegistryStore};

use crate::error::DispatchError;

/// Default bound on dialing the selected node.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// The global scheduler. Holds its own random source so tests can seed it.
pub struct Scheduler {
    store: Arc<RegistryStore>,
    dial_timeout: Duration,
    rng: Mutex<StdRng>,
}

impl Scheduler {
    pub fn new(store: Arc<RegistryStore>) -> Self {
        Self {
            store,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(store: Arc<RegistryStore>, seed: u64) -> Self {
        Self {
            store,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Pick an eligible node and forward the request to it. Selection and
    /// dispatch failures come back as `success = false` responses, never as
    /// RPC errors — the caller treats them as business outcomes.
    pub async fn deploy_component(
        &self,
        request: DeployComponentRequest,
    ) -> DeployComponentResponse {
        let Some(demand) = request.resource_request.clone() else {
            return failure_response("resource_request is required");
        };

        let Some(target) = self.select_node(&demand) else {
            warn!("no candidate node for scheduling request");
            return failure_response("no domain has nodes with sufficient capacity");
        };

        match self.forward_to_node(&target, request).await {
            Ok(response) => {
                info!(
                    node = %target.name,
                    address = %target.address,
                    domain = %target.domain_id,
                    "delegated scheduling request"
                );
                response
            }
            Err(err) => {
                warn!(
                    node = %target.name,
                    address = %target.address,
                    domain = %target.domain_id,
                    error = %err,
                    "failed to forward scheduling request"
                );
                failure_response(&format!("node dispatch failed: {err}"))
            }
        }
    }

    /// Two-level uniform draw over a snapshot of the registry. Returns a
    /// clone the caller may hold across I/O.
    fn select_node(&self, demand: &ResourceRequest) -> Option<Node> {
        let mut candidates: Vec<Vec<Node>> = Vec::new();

        for domain in self.store.get_all_domains() {
            let Ok(nodes) = self.store.get_nodes_by_domain(&domain.id) else {
                continue;
            };
            let eligible: Vec<Node> = nodes
                .into_iter()
                .filter(|node| is_eligible(node, demand))
                .collect();
            if !eligible.is_empty() {
                candidates.push(eligible);
            }
        }

        if candidates.is_empty() {
            return None;
        }

        let mut rng = self.rng.lock();
        let domain_idx = rng.gen_range(0..candidates.len());
        let node_idx = rng.gen_range(0..candidates[domain_idx].len());
        Some(candidates[domain_idx].swap_remove(node_idx))
    }

    /// Dial the node over an insecure channel (intra-cluster control
    /// plane), invoke its scheduler surface, return its answer verbatim.
    async fn forward_to_node(
        &self,
        node: &Node,
        request: DeployComponentRequest,
    ) -> Result<DeployComponentResponse, DispatchError> {
        let endpoint = Endpoint::from_shared(format!("http://{}", node.address))
            .map_err(DispatchError::InvalidAddress)?
            .connect_timeout(self.dial_timeout);

        let channel = tokio::time::timeout(self.dial_timeout, endpoint.connect())
            .await
            .map_err(|_| DispatchError::DialTimeout(node.address.clone()))?
            .map_err(|source| DispatchError::Connect {
                address: node.address.clone(),
                source,
            })?;

        let mut client = SchedulerServiceClient::new(channel);
        let response = client.deploy_component(request).await?;
        Ok(response.into_inner())
    }
}

/// Hard eligibility filter: online, dialable, every required tag present,
/// and enough available capacity on all three axes. A node that has never
/// reported capacity can't satisfy any demand.
fn is_eligible(node: &Node, demand: &ResourceRequest) -> bool {
    if node.status != NodeStatus::Online {
        return false;
    }
    if node.address.is_empty() {
        return false;
    }

    if !demand.tags.is_empty() {
        let Some(tags) = &node.resource_tags else {
            return false;
        };
        if !demand.tags.iter().all(|tag| tags.has(tag)) {
            return false;
        }
    }

    let Some(capacity) = &node.resource_capacity else {
        return false;
    };
    let available = &capacity.available;
    available.cpu >= demand.cpu && available.memory >= demand.memory && available.gpu >= demand.gpu
}

/// The scheduler's uniform failure shape.
pub fn failure_response(message: &str) -> DeployComponentResponse {
    DeployComponentResponse {
        success: false,
        error: message.to_string(),
        ..Default::default()
    }
}
