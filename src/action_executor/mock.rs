use super::{ActionExecutor, StopOutcome};
use crate::drain::{RoutingRef, WorkloadRef};
use act_zero::{Actor, ActorResult, Addr, Produces};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::info;

/// Executor that only logs the requested actions.
#[derive(Debug, Default)]
pub struct MockActionExecutor {
    stopped: HashSet<WorkloadRef>,
}

#[async_trait]
impl Actor for MockActionExecutor {
    async fn started(&mut self, _addr: Addr<Self>) -> ActorResult<()>
    where
        Self: Sized,
    {
        info!("Started MockActionExecutor");

        Produces::ok(())
    }
}

#[async_trait]
impl ActionExecutor for MockActionExecutor {
    async fn stop_workload(&mut self, workload: WorkloadRef) -> ActorResult<StopOutcome> {
        info!("Stop workload {}", workload);

        if self.stopped.insert(workload) {
            Produces::ok(StopOutcome::Stopped)
        } else {
            Produces::ok(StopOutcome::AlreadyStopped)
        }
    }

    async fn deregister(&mut self, routing: RoutingRef) -> ActorResult<()> {
        info!(
            "Deregister {} from target group {}",
            routing.endpoint, routing.target_group
        );

        Produces::ok(())
    }

    async fn force_close(&mut self, node_endpoint: String) -> ActorResult<()> {
        info!("Force close connections of {}", node_endpoint);

        Produces::ok(())
    }
}
