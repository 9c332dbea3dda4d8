//! Scheduler error types.
//!
//! These never cross the RPC boundary as errors; the scheduler folds them
//! into structured failure responses. The enum exists so dispatch failures
//! carry their cause.

use thiserror::Error;

/// Errors raised while dialing or invoking a selected node.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid node address: {0}")]
    InvalidAddress(tonic::transport::Error),

    #[error("failed to dial head node {address}: {source}")]
    Connect {
        address: String,
        source: tonic::transport::Error,
    },

    #[error("dial to {0} timed out")]
    DialTimeout(String),

    #[error("downstream call failed: {0}")]
    Rpc(#[from] tonic::Status),
}
