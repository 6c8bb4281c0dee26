use super::*;
use crate::config::Deregistration;

impl MachineState for Stopping {}

#[async_trait]
impl Handler for Data<Stopping> {
    async fn handle(self, _event: Option<DrainMachineEvent>) -> DrainMachine {
        // cancellation only counts until the workload is stopped
        if self.state.stop_outcome.is_none() && self.shared.cancel.is_cancelled() {
            return self.cancel().await;
        }

        let config = &self.shared.config;

        if self.state.outcome == DrainOutcome::Forced
            && config.force_close_on_timeout
            && !self.state.closed_connections
        {
            return self.close_connections().await;
        }

        if config.deregistration == Deregistration::BeforeStop && !self.state.deregistered {
            return self.deregister().await;
        }

        if self.state.stop_outcome.is_none() {
            return self.stop_workload().await;
        }

        self.mark_stopped().await
    }
}

impl Data<Stopping> {
    async fn close_connections(self) -> DrainMachine {
        self.shared.force_close().await;

        DrainMachine::Stopping(Data {
            state: Stopping {
                closed_connections: true,
                ..self.state
            },
            ..self
        })
    }

    async fn deregister(self) -> DrainMachine {
        self.shared.deregister().await;

        DrainMachine::Stopping(Data {
            state: Stopping {
                deregistered: true,
                ..self.state
            },
            ..self
        })
    }

    async fn stop_workload(self) -> DrainMachine {
        let workload_ref = self.shared.request.workload_ref.clone();

        info!("Stop workload {}", workload_ref);

        let result = call!(self.shared.action_executor.stop_workload(workload_ref)).await;

        match result {
            Ok(stop_outcome) => {
                info!("Workload {}", stop_outcome);

                DrainMachine::Stopping(Data {
                    state: Stopping {
                        stop_outcome: Some(stop_outcome),
                        ..self.state
                    },
                    ..self
                })
            }
            Err(_) => {
                // the executor already logged the cause
                let error = DrainError::StopFailed {
                    workload: self.shared.request.workload_ref.to_string(),
                };

                self.fail(error)
            }
        }
    }

    async fn mark_stopped(self) -> DrainMachine {
        let outcome = self.state.outcome;

        if let Err(e) = self.shared.write_status(outcome.terminal_state()).await {
            return self.fail(e);
        }

        let report = DrainReport {
            result: outcome,
            node_id: self.shared.request.node_id.clone(),
            polls: self.state.polls,
        };

        DrainMachine::Stopped(Data {
            shared: self.shared,
            state: Stopped { report },
        })
    }
}
