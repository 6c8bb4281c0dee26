mod http;
mod mock;

use act_zero::runtimes::tokio::spawn_actor;
use act_zero::{upcast, Actor, ActorResult, Addr};
use async_trait::async_trait;
use strum_macros::Display;

use crate::config;
use crate::drain::{RoutingRef, WorkloadRef};
use crate::workload_api;
use crate::AppConfig;

pub use self::http::HttpActionExecutor;
pub use mock::MockActionExecutor;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum StopOutcome {
    Stopped,
    AlreadyStopped,
}

/// Side effects issued by the drain controller.
///
/// `stop_workload` must be idempotent: stopping a workload that is already gone succeeds with
/// [`StopOutcome::AlreadyStopped`].
#[async_trait]
pub trait ActionExecutor: Actor {
    async fn stop_workload(&mut self, workload: WorkloadRef) -> ActorResult<StopOutcome>;

    async fn deregister(&mut self, routing: RoutingRef) -> ActorResult<()>;

    async fn force_close(&mut self, node_endpoint: String) -> ActorResult<()>;
}

pub fn build_from_config(config: AppConfig) -> anyhow::Result<Addr<dyn ActionExecutor>> {
    Ok(match &config.action_executor {
        config::ActionExecutor::Mock => upcast!(spawn_actor(MockActionExecutor::default())),
        config::ActionExecutor::Http {
            address,
            api_token,
            force_close_path,
            request_timeout,
        } => {
            let client = workload_api::Client::builder()
                .address(address.clone())
                .api_token(api_token.clone())
                .request_timeout(*request_timeout)
                .build()?;

            upcast!(spawn_actor(HttpActionExecutor::new(
                client,
                force_close_path.clone(),
                *request_timeout,
            )?))
        }
    })
}
