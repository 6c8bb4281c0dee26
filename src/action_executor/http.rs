use super::{ActionExecutor, StopOutcome};
use crate::actor::{handle_error, Error};
use crate::drain::{RoutingRef, WorkloadRef};
use crate::workload_api;
use crate::workload_api::workloads::{DeregisterTarget, StopWorkload, Workloads};
use act_zero::{Actor, ActorError, ActorResult, Addr, Produces};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::{info, warn};

/// Executor backed by the workload management API.
///
/// Force-closing connections talks to the admin endpoint exposed by the node itself.
pub struct HttpActionExecutor {
    client: workload_api::Client,
    node_client: reqwest::Client,
    force_close_path: String,
}

impl HttpActionExecutor {
    pub fn new(
        client: workload_api::Client,
        force_close_path: String,
        request_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client,
            node_client: reqwest::ClientBuilder::new()
                .timeout(request_timeout)
                .build()?,
            force_close_path,
        })
    }

    async fn stop(&self, workload: &WorkloadRef) -> Result<StopOutcome> {
        let request = StopWorkload {
            cluster: workload.cluster.as_deref().filter(|c| !c.trim().is_empty()),
            task: &workload.task,
            reason: "node drained",
        };

        match self.client.stop_workload(&request).await {
            Ok(()) => Ok(StopOutcome::Stopped),
            Err(e) if is_already_stopped(&e) => {
                info!("Workload {} is already stopped", workload);
                Ok(StopOutcome::AlreadyStopped)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to stop workload {}", workload)),
        }
    }

    async fn close_connections(&self, node_endpoint: &str) -> Result<()> {
        let url = force_close_url(node_endpoint, &self.force_close_path)?;
        let response = self.node_client.post(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Force close at {} answered with status {}",
                url,
                response.status()
            ));
        }

        Ok(())
    }
}

fn is_already_stopped(error: &workload_api::error::Error) -> bool {
    matches!(
        error.status(),
        Some(StatusCode::NOT_FOUND) | Some(StatusCode::CONFLICT)
    )
}

fn force_close_url(node_endpoint: &str, path: &str) -> Result<Url> {
    let base = if node_endpoint.contains("://") {
        node_endpoint.trim_end_matches('/').to_owned()
    } else {
        format!("http://{}", node_endpoint.trim_end_matches('/'))
    };

    let url = format!("{}{}", base, path);
    Url::parse(&url).with_context(|| format!("Failed to parse URL: {}", url))
}

#[async_trait]
impl Actor for HttpActionExecutor {
    #[tracing::instrument(name = "HttpActionExecutor::started", skip(self, _addr))]
    async fn started(&mut self, _addr: Addr<Self>) -> ActorResult<()>
    where
        Self: Sized,
    {
        info!("Started");

        Produces::ok(())
    }

    async fn error(&mut self, error: ActorError) -> bool {
        handle_error(error)
    }
}

#[async_trait]
impl ActionExecutor for HttpActionExecutor {
    #[tracing::instrument(name = "HttpActionExecutor::stop_workload", skip(self))]
    async fn stop_workload(&mut self, workload: WorkloadRef) -> ActorResult<StopOutcome> {
        let outcome = self.stop(&workload).await.map_err(Error::from)?;

        Produces::ok(outcome)
    }

    #[tracing::instrument(name = "HttpActionExecutor::deregister", skip(self))]
    async fn deregister(&mut self, routing: RoutingRef) -> ActorResult<()> {
        let target = DeregisterTarget {
            target_group: &routing.target_group,
            endpoint: &routing.endpoint,
        };

        self.client
            .deregister_target(&target)
            .await
            .with_context(|| format!("Failed to deregister {}", routing.endpoint))
            .map_err(Error::from)?;

        Produces::ok(())
    }

    #[tracing::instrument(name = "HttpActionExecutor::force_close", skip(self))]
    async fn force_close(&mut self, node_endpoint: String) -> ActorResult<()> {
        if let Err(e) = self.close_connections(&node_endpoint).await {
            warn!("Failed to force close connections of {}", node_endpoint);
            return Err(Error::from(e).into());
        }

        Produces::ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;

    fn bad_response(status: StatusCode) -> workload_api::error::Error {
        workload_api::error::Error::BadResponse {
            status,
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    #[test]
    fn test_missing_workloads_count_as_stopped() {
        assert!(is_already_stopped(&bad_response(StatusCode::NOT_FOUND)));
        assert!(is_already_stopped(&bad_response(StatusCode::CONFLICT)));
        assert!(!is_already_stopped(&bad_response(
            StatusCode::INTERNAL_SERVER_ERROR
        )));
        assert!(!is_already_stopped(
            &workload_api::error::Error::MissingConfig("address")
        ));
    }

    #[test]
    fn test_force_close_url() -> Result<()> {
        assert_eq!(
            "http://10.0.3.42:4001/admin/force-close",
            force_close_url("10.0.3.42:4001", "/admin/force-close")?.as_str()
        );
        assert_eq!(
            "https://node.internal/admin/force-close",
            force_close_url("https://node.internal/", "/admin/force-close")?.as_str()
        );

        Ok(())
    }
}
