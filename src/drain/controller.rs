mod config;
mod state_machine;

use crate::action_executor::ActionExecutor;
use crate::drain::{DrainError, DrainReport, DrainRequest};
use crate::status_store::StatusStore;
use act_zero::Addr;
use state_machine::{DrainMachine, DrainMachineEvent, Shared};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use config::Config;

/// Bounds of the poll loop of a single drain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DrainTiming {
    pub max_drain_duration: Duration,
    pub poll_interval: Duration,
}

impl Default for DrainTiming {
    fn default() -> Self {
        Self {
            max_drain_duration: Duration::from_secs(2 * 60 * 60),
            poll_interval: Duration::from_secs(30),
        }
    }
}

impl From<&crate::config::Drain> for DrainTiming {
    fn from(drain: &crate::config::Drain) -> Self {
        Self {
            max_drain_duration: drain.max_drain_duration,
            poll_interval: drain.poll_interval,
        }
    }
}

/// Waits for the connections of a node to drain and stops its workload afterwards.
///
/// Each call of [`DrainController::drain`] runs one independent drain; the controller keeps no
/// state between invocations.
pub struct DrainController {
    status_store: Addr<dyn StatusStore>,
    action_executor: Addr<dyn ActionExecutor>,
    config: Config,
}

impl fmt::Debug for DrainController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainController")
            .field("config", &self.config)
            .finish()
    }
}

impl DrainController {
    pub fn new(
        status_store: Addr<dyn StatusStore>,
        action_executor: Addr<dyn ActionExecutor>,
        config: Config,
    ) -> Self {
        Self {
            status_store,
            action_executor,
            config,
        }
    }

    pub async fn drain(
        &self,
        request: DrainRequest,
        timing: DrainTiming,
    ) -> Result<DrainReport, DrainError> {
        self.drain_until_cancelled(request, timing, CancellationToken::new())
            .await
    }

    /// Like [`DrainController::drain`], but gives up once `cancel` fires before the workload is
    /// stopped.
    ///
    /// A cancelled drain leaves the node marked `CANCELLED` and its workload running.
    #[tracing::instrument(
        name = "DrainController::drain",
        skip(self, request, timing, cancel),
        fields(node_id = %request.node_id, workload = %request.workload_ref)
    )]
    pub async fn drain_until_cancelled(
        &self,
        request: DrainRequest,
        timing: DrainTiming,
        cancel: CancellationToken,
    ) -> Result<DrainReport, DrainError> {
        if cancel.is_cancelled() {
            return Err(DrainError::Cancelled {
                node_id: request.node_id,
            });
        }

        info!(
            "Start drain; max drain duration {:?} poll interval {:?}",
            timing.max_drain_duration, timing.poll_interval
        );

        let mut machine = DrainMachine::new(Shared {
            request,
            timing,
            config: self.config.clone(),
            status_store: self.status_store.clone(),
            action_executor: self.action_executor.clone(),
            cancel: cancel.clone(),
        });

        loop {
            machine = match machine {
                DrainMachine::Stopped(data) => return Ok(data.state.report),
                DrainMachine::Failed(data) => return Err(data.state.error),
                DrainMachine::Draining(data) if data.awaits_next_poll() => {
                    let delay = data.next_poll_delay();

                    let event = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Some(DrainMachineEvent::Cancel),
                        _ = tokio::time::sleep(delay) => None,
                    };

                    DrainMachine::Draining(data).handle(event).await
                }
                machine => machine.handle(None).await,
            };
        }
    }
}
