use crate::drain::DrainError;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainRequest {
    pub node_id: String,
    pub workload_ref: WorkloadRef,
    #[serde(default)]
    pub routing_ref: Option<RoutingRef>,
    /// Routing path served by the node. Informational only.
    #[serde(default)]
    pub path_filter: Option<String>,
}

/// Handle of the workload that gets stopped once the node is drained.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadRef {
    #[serde(default)]
    pub cluster: Option<String>,
    pub task: String,
}

/// Routing layer registration of the node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingRef {
    pub target_group: String,
    pub endpoint: String,
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cluster {
            Some(cluster) => write!(f, "{}/{}", cluster, self.task),
            None => write!(f, "{}", self.task),
        }
    }
}

impl DrainRequest {
    pub fn new(node_id: impl Into<String>, workload_ref: WorkloadRef) -> Self {
        Self {
            node_id: node_id.into(),
            workload_ref,
            routing_ref: None,
            path_filter: None,
        }
    }

    pub fn with_routing_ref(mut self, routing_ref: RoutingRef) -> Self {
        self.routing_ref = Some(routing_ref);
        self
    }

    pub fn validate(&self) -> Result<(), DrainError> {
        use DrainError::InvalidRequest;

        if is_blank(&self.node_id) {
            return Err(InvalidRequest("missing node_id".into()));
        }

        if is_blank(&self.workload_ref.task) {
            return Err(InvalidRequest("missing workload task".into()));
        }

        Ok(())
    }

    /// Routing reference the hooks can act on; an incomplete one counts as absent.
    pub fn usable_routing_ref(&self) -> Option<&RoutingRef> {
        self.routing_ref
            .as_ref()
            .filter(|r| !is_blank(&r.target_group) && !is_blank(&r.endpoint))
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_blank(v))
}

/// Drain request as emitted by the invocation trigger.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocationEvent {
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, alias = "target_group")]
    pub target_group_arn: Option<String>,
    #[serde(default)]
    pub node_endpoint: Option<String>,
    #[serde(default, alias = "cluster")]
    pub ecs_cluster: Option<String>,
    #[serde(default, alias = "task")]
    pub ecs_task_arn: Option<String>,
}

impl TryFrom<InvocationEvent> for DrainRequest {
    type Error = DrainError;

    fn try_from(event: InvocationEvent) -> Result<Self, Self::Error> {
        let InvocationEvent {
            node_id,
            path,
            target_group_arn,
            node_endpoint,
            ecs_cluster,
            ecs_task_arn,
        } = event;

        let node_id =
            node_id.ok_or_else(|| DrainError::InvalidRequest("missing node_id".into()))?;

        let task =
            ecs_task_arn.ok_or_else(|| DrainError::InvalidRequest("missing ecs_task_arn".into()))?;

        // without an explicit endpoint the node id is the node's routable host
        let routing_ref = non_blank(target_group_arn).map(|target_group| RoutingRef {
            target_group,
            endpoint: non_blank(node_endpoint).unwrap_or_else(|| node_id.clone()),
        });

        let request = DrainRequest {
            node_id,
            workload_ref: WorkloadRef {
                cluster: non_blank(ecs_cluster),
                task,
            },
            routing_ref,
            path_filter: non_blank(path),
        };

        request.validate()?;

        Ok(request)
    }
}
