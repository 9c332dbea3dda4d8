//! iarnet-persist — durable identity for domains.
//!
//! Only domain identity survives a restart: id, name, description and the
//! two timestamps. Nodes are never persisted; they rebuild from heartbeats.
//! Backed by an embedded SQLite database behind a bounded connection pool,
//! with an in-memory mode for tests.

mod error;
mod repo;

pub use error::{PersistError, PersistResult};
pub use repo::{DomainRecord, DomainRepo, PoolSettings};
