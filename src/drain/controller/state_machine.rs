mod draining;
mod failed;
mod initializing;
mod stopped;
mod stopping;

use super::{Config, DrainTiming};
use crate::action_executor::{ActionExecutor, StopOutcome};
use crate::drain::{DrainError, DrainOutcome, DrainReport, DrainRequest, DrainState};
use crate::retry::{retry, Exhausted};
use crate::status_store::{NodeStatus, StatusStore};
use act_zero::{call, Addr};
use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug)]
pub enum DrainMachine {
    Initializing(Data<Initializing>),
    Draining(Data<Draining>),
    Stopping(Data<Stopping>),
    Stopped(Data<Stopped>),
    Failed(Data<Failed>),
}

#[derive(Debug)]
pub enum DrainMachineEvent {
    Cancel,
}

#[async_trait]
trait Handler {
    async fn handle(self, event: Option<DrainMachineEvent>) -> DrainMachine;
}

pub trait MachineState {}

#[derive(Debug)]
pub struct Data<S: MachineState> {
    pub shared: Shared,
    pub state: S,
}

/// Everything a drain needs besides its current state.
#[derive(Debug)]
pub struct Shared {
    pub request: DrainRequest,
    pub timing: DrainTiming,
    pub config: Config,
    pub status_store: Addr<dyn StatusStore>,
    pub action_executor: Addr<dyn ActionExecutor>,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
pub struct Initializing {}

#[derive(Debug)]
pub struct Draining {
    started_at: Instant,
    polls: u32,
}

#[derive(Debug)]
pub struct Stopping {
    outcome: DrainOutcome,
    polls: u32,
    closed_connections: bool,
    deregistered: bool,
    stop_outcome: Option<StopOutcome>,
}

#[derive(Debug)]
pub struct Stopped {
    pub report: DrainReport,
}

#[derive(Debug)]
pub struct Failed {
    pub error: DrainError,
}

impl DrainMachine {
    pub fn new(shared: Shared) -> Self {
        Self::Initializing(Data {
            shared,
            state: Initializing {},
        })
    }

    pub async fn handle(self, event: Option<DrainMachineEvent>) -> Self {
        match self {
            Self::Initializing(m) => m.handle(event).await,
            Self::Draining(m) => m.handle(event).await,
            Self::Stopping(m) => m.handle(event).await,
            Self::Stopped(_) | Self::Failed(_) => self,
        }
    }
}

impl Draining {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            polls: 0,
        }
    }
}

impl Stopping {
    fn new(outcome: DrainOutcome, polls: u32) -> Self {
        Self {
            outcome,
            polls,
            closed_connections: false,
            deregistered: false,
            stop_outcome: None,
        }
    }
}

impl<S: MachineState> Data<S> {
    fn fail(self, error: DrainError) -> DrainMachine {
        error!("Drain failed: {}", error);

        DrainMachine::Failed(Data {
            shared: self.shared,
            state: Failed { error },
        })
    }

    /// Marks the node as cancelled and leaves its workload running.
    async fn cancel(self) -> DrainMachine {
        warn!("Drain of node {} cancelled", self.shared.node_id());

        if let Err(e) = self.shared.write_status(DrainState::Cancelled).await {
            error!("Failed to mark node as cancelled {}", e);
        }

        let node_id = self.shared.request.node_id.clone();

        self.fail(DrainError::Cancelled { node_id })
    }
}

impl Shared {
    fn node_id(&self) -> &str {
        &self.request.node_id
    }

    async fn read_status(&self) -> Result<NodeStatus, DrainError> {
        let status_store = &self.status_store;
        let node_id = self.node_id();

        retry(&self.config.store_retry, "read node status", || {
            let status_store = status_store.clone();
            let node_id = node_id.to_owned();

            async move { call!(status_store.get_status(node_id)).await }
        })
        .await
        .map_err(|e| self.store_unavailable("read status", e))
    }

    async fn write_status(&self, status: DrainState) -> Result<(), DrainError> {
        info!("Mark node {} as {}", self.node_id(), status);

        let status_store = &self.status_store;
        let node_id = self.node_id();

        retry(&self.config.store_retry, "write node status", || {
            let status_store = status_store.clone();
            let node_id = node_id.to_owned();

            async move { call!(status_store.set_status(node_id, status)).await }
        })
        .await
        .map_err(|e| self.store_unavailable("write status", e))
    }

    fn store_unavailable<E>(&self, operation: &'static str, exhausted: Exhausted<E>) -> DrainError {
        DrainError::StoreUnavailable {
            node_id: self.request.node_id.clone(),
            operation,
            attempts: exhausted.attempts,
        }
    }

    /// Removes the node from its routing target group; failures only get logged.
    async fn deregister(&self) {
        let routing_ref = match self.request.usable_routing_ref() {
            Some(routing_ref) => routing_ref.clone(),
            None => {
                warn!(
                    "Skip deregistration of node {}; no routing reference",
                    self.node_id()
                );
                return;
            }
        };

        info!(
            "Deregister {} from target group {}",
            routing_ref.endpoint, routing_ref.target_group
        );

        if let Err(e) = call!(self.action_executor.deregister(routing_ref)).await {
            error!("Failed to deregister node {} {:?}", self.node_id(), e);
        }
    }

    /// Closes the remaining connections of the node; failures only get logged.
    async fn force_close(&self) {
        let node_endpoint = match self.request.usable_routing_ref() {
            Some(routing_ref) => routing_ref.endpoint.clone(),
            None => {
                warn!(
                    "Skip force close of node {}; no node endpoint",
                    self.node_id()
                );
                return;
            }
        };

        info!("Force close connections of {}", node_endpoint);

        if let Err(e) = call!(self.action_executor.force_close(node_endpoint)).await {
            error!("Failed to force close connections {:?}", e);
        }
    }
}
