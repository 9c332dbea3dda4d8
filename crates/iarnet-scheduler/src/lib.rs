//! iarnet-scheduler — cross-domain scheduling for IARNet-Global.
//!
//! Given a deployment request, snapshot the registry, keep the nodes that
//! are online, dialable, tagged and sized for the demand, pick one by a
//! two-level uniform draw (domain first, then node), and forward the
//! request to it over gRPC. The scheduler never raises an RPC error for a
//! business failure: no capacity and dispatch failures both come back as
//! `success = false` responses.

pub mod error;
pub mod service;

pub use error::DispatchError;
pub use service::{failure_response, Scheduler, DEFAULT_DIAL_TIMEOUT};
