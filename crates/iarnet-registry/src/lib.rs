//! iarnet-registry — the registry-and-dispatch core of IARNet-Global.
//!
//! Federates independent compute domains into one logical placement
//! surface:
//!
//! ```text
//! RegistryStore
//!   ├── domains: DomainId → Domain   (head slot, member list, OR'd tags)
//!   ├── nodes:   NodeId → Node       (status, address, tags, capacity)
//!   └── one guard across both maps — invariants cross them
//!
//! LivenessMonitor
//!   └── ticks every 10 s: online → offline past the heartbeat timeout,
//!       offline/error → evicted past twice the timeout
//!
//! RegistryService
//!   └── admin commands: create/update/delete domains (write-through to
//!       the durable store), stats, load-on-start
//! ```
//!
//! The store hands out by-value snapshots; callers that chain two reads
//! must tolerate a mutation in between (the stats query demonstrates the
//! pattern by skipping vanished member IDs).

pub mod error;
pub mod monitor;
pub mod service;
pub mod store;
pub mod types;

pub use error::{RegistryError, RegistryResult};
pub use monitor::LivenessMonitor;
pub use service::RegistryService;
pub use store::{RegistryStore, SweepStats};
pub use types::{
    Domain, DomainId, DomainStats, Node, NodeId, NodePatch, NodeStatus, ResourceCapacity,
    ResourceTags, ResourceVector,
};
