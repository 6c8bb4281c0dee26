use super::Result;
use crate::workload_api::request::post;
use crate::workload_api::Client;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct StopWorkload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<&'a str>,
    pub task: &'a str,
    pub reason: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeregisterTarget<'a> {
    pub target_group: &'a str,
    pub endpoint: &'a str,
}

#[async_trait]
pub trait Workloads {
    async fn stop_workload(&self, workload: &StopWorkload<'_>) -> Result<()>;
    async fn deregister_target(&self, target: &DeregisterTarget<'_>) -> Result<()>;
}

#[async_trait]
impl Workloads for Client {
    async fn stop_workload(&self, workload: &StopWorkload<'_>) -> Result<()> {
        post(
            &self.http_client,
            &self.config,
            "/v1/workloads/stop",
            workload,
        )
        .await
    }

    async fn deregister_target(&self, target: &DeregisterTarget<'_>) -> Result<()> {
        post(
            &self.http_client,
            &self.config,
            "/v1/routing/deregister",
            target,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_payload_omits_missing_cluster() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let payload = StopWorkload {
            cluster: None,
            task: "task/abc",
            reason: "drained",
        };

        assert_eq!(
            r#"{"task":"task/abc","reason":"drained"}"#,
            serde_json::to_string(&payload)?
        );

        Ok(())
    }
}
