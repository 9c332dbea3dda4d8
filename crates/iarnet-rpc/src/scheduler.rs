//! Scheduling RPC — thin tonic wrapper over the scheduler service.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use iarnet_proto::scheduler as pb;
use iarnet_proto::scheduler::scheduler_service_server::SchedulerService;
use iarnet_scheduler::Scheduler;

/// gRPC implementation of the global scheduling service.
pub struct SchedulerServer {
    scheduler: Arc<Scheduler>,
}

impl SchedulerServer {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }

    pub fn into_service(self) -> pb::scheduler_service_server::SchedulerServiceServer<Self> {
        pb::scheduler_service_server::SchedulerServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl SchedulerService for SchedulerServer {
    async fn deploy_component(
        &self,
        request: Request<pb::DeployComponentRequest>,
    ) -> Result<Response<pb::DeployComponentResponse>, Status> {
        // Business failures (no capacity, dispatch errors) ride inside the
        // response; this surface never converts them to RPC errors.
        let response = self.scheduler.deploy_component(request.into_inner()).await;
        Ok(Response::new(response))
    }

    // Reserved; no deployment tracking yet.
    async fn get_deployment_status(
        &self,
        _request: Request<pb::GetDeploymentStatusRequest>,
    ) -> Result<Response<pb::GetDeploymentStatusResponse>, Status> {
        Ok(Response::new(pb::GetDeploymentStatusResponse {
            success: false,
            error: "not implemented".to_string(),
            status: String::new(),
        }))
    }
}
