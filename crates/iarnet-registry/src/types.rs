//! Domain types for the IARNet-Global registry.
//!
//! Domains and nodes reference each other by ID only; the registry store
//! owns both maps and keeps the two sides consistent. All types serialize
//! to JSON with RFC 3339 timestamps for the admin surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Unique identifier of a domain, assigned on creation (`domain.<uuid>`).
pub type DomainId = String;

/// Unique identifier of a node, supplied by the node itself.
/// Uniqueness is enforced process-wide, not per-domain.
pub type NodeId = String;

// ── Resource tags ──────────────────────────────────────────────────

/// Boolean capability vector describing which resource classes a node
/// (or, aggregated, a domain) can serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTags {
    pub cpu: bool,
    pub gpu: bool,
    pub memory: bool,
    pub camera: bool,
}

impl ResourceTags {
    pub fn new(cpu: bool, gpu: bool, memory: bool, camera: bool) -> Self {
        Self { cpu, gpu, memory, camera }
    }

    /// Whether the named capability is present. Unknown names are never
    /// satisfied; the tag vocabulary is closed.
    pub fn has(&self, tag: &str) -> bool {
        match tag.to_ascii_lowercase().as_str() {
            "cpu" => self.cpu,
            "gpu" => self.gpu,
            "memory" => self.memory,
            "camera" => self.camera,
            _ => false,
        }
    }

    /// OR-in another tag vector.
    pub fn merge(&mut self, other: &ResourceTags) {
        self.cpu |= other.cpu;
        self.gpu |= other.gpu;
        self.memory |= other.memory;
        self.camera |= other.camera;
    }
}

// ── Resource capacity ──────────────────────────────────────────────

/// One point of a capacity snapshot: CPU millicores, GPU count, memory bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceVector {
    pub cpu: i64,
    pub gpu: i64,
    pub memory: i64,
}

/// Capacity snapshot reported by a node: what it has in total and what is
/// currently free. The scheduler compares request demand against `available`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCapacity {
    pub total: ResourceVector,
    pub available: ResourceVector,
}

// ── Node ───────────────────────────────────────────────────────────

/// Liveness state of a node as last asserted or inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Online,
    Offline,
    Error,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Offline => "offline",
            NodeStatus::Error => "error",
        }
    }
}

/// A registered node. `resource_tags` and `resource_capacity` are absent
/// until the node first asserts them via heartbeat — absence contributes
/// nothing to domain aggregation and never satisfies a capacity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub domain_id: DomainId,
    pub name: String,
    /// "host:port" dial target; empty until the first heartbeat reports it.
    pub address: String,
    /// Whether this node is the domain's cross-domain deployment entry.
    pub is_head: bool,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_tags: Option<ResourceTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_capacity: Option<ResourceCapacity>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Structured partial update applied to a node under the store's guard.
/// Absent fields leave the node untouched.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub status: Option<NodeStatus>,
    pub last_seen: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub resource_tags: Option<ResourceTags>,
    pub resource_capacity: Option<ResourceCapacity>,
    pub is_head: Option<bool>,
}

// ── Domain ─────────────────────────────────────────────────────────

/// A federated compute domain. `resource_tags` is always the OR of the
/// current members' tags; `node_ids` preserves insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub resource_tags: ResourceTags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_node_id: Option<NodeId>,
    pub node_ids: Vec<NodeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Domain {
    /// Append a member node ID. No-op if already present.
    pub(crate) fn add_node(&mut self, node_id: &NodeId) {
        if !self.node_ids.iter().any(|id| id == node_id) {
            self.node_ids.push(node_id.clone());
        }
    }

    /// Remove a member node ID, clearing `head_node_id` if it pointed at it.
    pub(crate) fn remove_node(&mut self, node_id: &NodeId) {
        self.node_ids.retain(|id| id != node_id);
        if self.head_node_id.as_ref() == Some(node_id) {
            self.head_node_id = None;
        }
    }

    /// Designate a member node as head. The node must already be a member,
    /// and the slot must be free (or already held by this node).
    pub(crate) fn set_head(&mut self, node_id: &NodeId) -> RegistryResult<()> {
        if !self.node_ids.iter().any(|id| id == node_id) {
            return Err(RegistryError::NodeNotInDomain {
                node: node_id.clone(),
                domain: self.id.clone(),
            });
        }
        match &self.head_node_id {
            Some(existing) if existing != node_id => Err(RegistryError::NodeNotInDomain {
                node: node_id.clone(),
                domain: self.id.clone(),
            }),
            _ => {
                self.head_node_id = Some(node_id.clone());
                Ok(())
            }
        }
    }
}

/// Per-domain node counts by observed status. Node IDs that no longer
/// resolve in the store are excluded from every count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DomainStats {
    pub total_nodes: usize,
    pub online_nodes: usize,
    pub offline_nodes: usize,
    pub error_nodes: usize,
}
