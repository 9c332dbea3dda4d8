//! Registry store — the single owner of the domain and node maps.
//!
//! Both maps sit behind one reader/writer guard because the structural
//! invariants cross them: every node's `domain_id` resolves, a domain's
//! `node_ids` mirror the node map, and tag aggregation reads nodes while
//! writing domains. Mutators take the exclusive side and re-aggregate
//! inside the same critical section; readers hand out clones the caller
//! may retain. The guard is never held across I/O.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::types::{Domain, DomainId, Node, NodeId, NodePatch, NodeStatus, ResourceTags};

/// Outcome counts of one liveness sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Online nodes marked offline for missing their heartbeat window.
    pub marked_offline: usize,
    /// Offline/error nodes removed after the eviction threshold.
    pub evicted: usize,
}

#[derive(Default)]
struct StoreInner {
    domains: HashMap<DomainId, Domain>,
    nodes: HashMap<NodeId, Node>,
}

/// Thread-safe in-memory registry of domains and their nodes.
pub struct RegistryStore {
    inner: RwLock<StoreInner>,
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    // ── Domain mutations ───────────────────────────────────────────

    /// Insert a new domain. The domain must carry no members; nodes only
    /// ever join through [`RegistryStore::add_node`].
    pub fn add_domain(&self, domain: Domain) -> RegistryResult<()> {
        if !domain.node_ids.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "new domain must not carry node ids".to_string(),
            ));
        }

        let mut inner = self.inner.write();
        if inner.domains.contains_key(&domain.id) {
            return Err(RegistryError::DomainAlreadyExists(domain.id));
        }

        info!(id = %domain.id, name = %domain.name, "domain added");
        inner.domains.insert(domain.id.clone(), domain);
        Ok(())
    }

    /// Remove a domain and every node it contains.
    pub fn remove_domain(&self, domain_id: &DomainId) -> RegistryResult<()> {
        let mut inner = self.inner.write();
        let domain = inner
            .domains
            .remove(domain_id)
            .ok_or_else(|| RegistryError::DomainNotFound(domain_id.clone()))?;

        for node_id in &domain.node_ids {
            inner.nodes.remove(node_id);
        }

        info!(id = %domain_id, name = %domain.name, members = domain.node_ids.len(), "domain removed");
        Ok(())
    }

    /// Replace a domain's name and description.
    pub fn update_domain_meta(
        &self,
        domain_id: &DomainId,
        name: Option<String>,
        description: Option<String>,
    ) -> RegistryResult<Domain> {
        let mut inner = self.inner.write();
        let domain = inner
            .domains
            .get_mut(domain_id)
            .ok_or_else(|| RegistryError::DomainNotFound(domain_id.clone()))?;

        if let Some(name) = name {
            domain.name = name;
        }
        if let Some(description) = description {
            domain.description = description;
        }
        domain.updated_at = Utc::now();
        Ok(domain.clone())
    }

    // ── Node mutations ─────────────────────────────────────────────

    /// Insert a new node into its domain. If the node claims head and the
    /// domain already has a different head, the whole insertion rolls back.
    pub fn add_node(&self, node: Node) -> RegistryResult<()> {
        let mut inner = self.inner.write();
        if inner.nodes.contains_key(&node.id) {
            return Err(RegistryError::NodeAlreadyExists(node.id));
        }

        let domain = inner
            .domains
            .get_mut(&node.domain_id)
            .ok_or_else(|| RegistryError::DomainNotFound(node.domain_id.clone()))?;

        domain.add_node(&node.id);
        if node.is_head {
            if let Err(err) = domain.set_head(&node.id) {
                domain.remove_node(&node.id);
                return Err(err);
            }
        }

        info!(
            id = %node.id,
            name = %node.name,
            domain = %node.domain_id,
            is_head = node.is_head,
            "node added"
        );

        let domain_id = node.domain_id.clone();
        inner.nodes.insert(node.id.clone(), node);
        let inner = &mut *inner;
        refresh_domain_tags(&mut inner.domains, &inner.nodes, &domain_id);
        Ok(())
    }

    /// Apply a structured partial update to a node, then re-aggregate the
    /// owning domain's tags. Sets `updated_at` unconditionally.
    pub fn update_node(&self, node_id: &NodeId, patch: NodePatch) -> RegistryResult<()> {
        let mut inner = self.inner.write();
        let inner = &mut *inner;
        let node = inner
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| RegistryError::NodeNotFound(node_id.clone()))?;

        if let Some(status) = patch.status {
            node.status = status;
        }
        if let Some(last_seen) = patch.last_seen {
            node.last_seen = last_seen;
        }
        if let Some(address) = patch.address {
            node.address = address;
        }
        if let Some(tags) = patch.resource_tags {
            node.resource_tags = Some(tags);
        }
        if let Some(capacity) = patch.resource_capacity {
            node.resource_capacity = Some(capacity);
        }
        node.updated_at = Utc::now();

        match patch.is_head {
            Some(true) => {
                // Head promotion goes through the domain so the slot stays
                // single-occupant. A conflicting claim is logged and dropped
                // rather than failing the whole update.
                if let Some(domain) = inner.domains.get_mut(&node.domain_id) {
                    match domain.set_head(node_id) {
                        Ok(()) => node.is_head = true,
                        Err(_) => warn!(
                            node = %node_id,
                            domain = %node.domain_id,
                            head = ?domain.head_node_id,
                            "head claim ignored, domain already has a head"
                        ),
                    }
                }
            }
            Some(false) => {
                if node.is_head {
                    node.is_head = false;
                    if let Some(domain) = inner.domains.get_mut(&node.domain_id) {
                        if domain.head_node_id.as_deref() == Some(node_id.as_str()) {
                            domain.head_node_id = None;
                        }
                    }
                }
            }
            None => {}
        }

        let domain_id = inner.nodes[node_id].domain_id.clone();
        refresh_domain_tags(&mut inner.domains, &inner.nodes, &domain_id);
        debug!(id = %node_id, "node updated");
        Ok(())
    }

    /// Remove a node, detach it from its domain, and re-aggregate.
    pub fn remove_node(&self, node_id: &NodeId) -> RegistryResult<()> {
        let mut inner = self.inner.write();
        remove_node_locked(&mut inner, node_id)
    }

    // ── Reads ──────────────────────────────────────────────────────

    pub fn get_domain(&self, domain_id: &DomainId) -> RegistryResult<Domain> {
        self.inner
            .read()
            .domains
            .get(domain_id)
            .cloned()
            .ok_or_else(|| RegistryError::DomainNotFound(domain_id.clone()))
    }

    pub fn get_all_domains(&self) -> Vec<Domain> {
        self.inner.read().domains.values().cloned().collect()
    }

    pub fn get_node(&self, node_id: &NodeId) -> RegistryResult<Node> {
        self.inner
            .read()
            .nodes
            .get(node_id)
            .cloned()
            .ok_or_else(|| RegistryError::NodeNotFound(node_id.clone()))
    }

    /// Nodes of one domain, in membership (insertion) order. IDs that no
    /// longer resolve are skipped.
    pub fn get_nodes_by_domain(&self, domain_id: &DomainId) -> RegistryResult<Vec<Node>> {
        let inner = self.inner.read();
        let domain = inner
            .domains
            .get(domain_id)
            .ok_or_else(|| RegistryError::DomainNotFound(domain_id.clone()))?;

        Ok(domain
            .node_ids
            .iter()
            .filter_map(|id| inner.nodes.get(id).cloned())
            .collect())
    }

    /// All nodes currently marked as a domain head.
    pub fn get_head_nodes(&self) -> Vec<Node> {
        self.inner
            .read()
            .nodes
            .values()
            .filter(|n| n.is_head)
            .cloned()
            .collect()
    }

    /// A node's status; absent nodes read as offline (an unobservable node
    /// is indistinguishable from an offline one).
    pub fn get_node_status(&self, node_id: &NodeId) -> NodeStatus {
        self.inner
            .read()
            .nodes
            .get(node_id)
            .map(|n| n.status)
            .unwrap_or(NodeStatus::Offline)
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn domain_count(&self) -> usize {
        self.inner.read().domains.len()
    }

    // ── Liveness sweep ─────────────────────────────────────────────

    /// One liveness pass: online nodes silent past `timeout` turn offline;
    /// offline/error nodes silent past `evict` leave the map entirely
    /// (through the same path as an explicit removal). Runs under a single
    /// write guard; work is bounded by the store size.
    pub fn sweep(&self, now: DateTime<Utc>, timeout: Duration, evict: Duration) -> SweepStats {
        let timeout = as_chrono(timeout);
        let evict = as_chrono(evict);

        let mut inner = self.inner.write();
        let inner = &mut *inner;
        let mut stats = SweepStats::default();
        let mut to_evict: Vec<NodeId> = Vec::new();
        let mut dirty: HashSet<DomainId> = HashSet::new();

        for node in inner.nodes.values_mut() {
            let silent_for = now - node.last_seen;
            match node.status {
                NodeStatus::Offline | NodeStatus::Error => {
                    if silent_for > evict {
                        info!(
                            id = %node.id,
                            domain = %node.domain_id,
                            last_seen = %node.last_seen,
                            "evicting node after extended offline"
                        );
                        to_evict.push(node.id.clone());
                    }
                }
                NodeStatus::Online => {
                    if silent_for > timeout {
                        node.status = NodeStatus::Offline;
                        node.updated_at = now;
                        stats.marked_offline += 1;
                        dirty.insert(node.domain_id.clone());
                        warn!(
                            id = %node.id,
                            domain = %node.domain_id,
                            last_seen = %node.last_seen,
                            "node marked offline after heartbeat timeout"
                        );
                    }
                }
            }
        }

        for domain_id in &dirty {
            refresh_domain_tags(&mut inner.domains, &inner.nodes, domain_id);
        }

        for node_id in to_evict {
            match remove_node_locked(inner, &node_id) {
                Ok(()) => stats.evicted += 1,
                Err(err) => warn!(id = %node_id, error = %err, "failed to evict node"),
            }
        }

        stats
    }
}

/// Remove a node and repair its domain. Caller holds the write guard.
fn remove_node_locked(inner: &mut StoreInner, node_id: &NodeId) -> RegistryResult<()> {
    let node = inner
        .nodes
        .remove(node_id)
        .ok_or_else(|| RegistryError::NodeNotFound(node_id.clone()))?;

    if let Some(domain) = inner.domains.get_mut(&node.domain_id) {
        domain.remove_node(node_id);
    }
    refresh_domain_tags(&mut inner.domains, &inner.nodes, &node.domain_id);

    info!(id = %node_id, name = %node.name, domain = %node.domain_id, "node removed");
    Ok(())
}

/// Recompute a domain's tags as the OR of its present members' tags and
/// stamp `updated_at`. Members with no asserted tags contribute nothing.
fn refresh_domain_tags(
    domains: &mut HashMap<DomainId, Domain>,
    nodes: &HashMap<NodeId, Node>,
    domain_id: &DomainId,
) {
    let Some(domain) = domains.get_mut(domain_id) else {
        return;
    };

    let mut tags = ResourceTags::default();
    for node_id in &domain.node_ids {
        if let Some(node) = nodes.get(node_id) {
            if let Some(node_tags) = &node.resource_tags {
                tags.merge(node_tags);
            }
        }
    }

    domain.resource_tags = tags;
    domain.updated_at = Utc::now();
}

fn as_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}
