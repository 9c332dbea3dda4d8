//! iarnet-proto — generated protobuf types and gRPC service stubs.

/// Heartbeat intake surface (`iarnet.registry`).
pub mod registry {
    tonic::include_proto!("iarnet.registry");
}

/// Cross-domain scheduling surface (`iarnet.scheduler`).
pub mod scheduler {
    tonic::include_proto!("iarnet.scheduler");
}
