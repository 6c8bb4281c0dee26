use super::*;
use std::time::Duration;

impl MachineState for Draining {}

#[async_trait]
impl Handler for Data<Draining> {
    async fn handle(self, event: Option<DrainMachineEvent>) -> DrainMachine {
        match event {
            Some(DrainMachineEvent::Cancel) => self.cancel().await,
            None if self.shared.cancel.is_cancelled() => self.cancel().await,
            // the deadline passed while waiting for the next poll
            None if self.awaits_next_poll() && self.reached_max_drain_duration() => {
                self.force_stop()
            }
            None => self.poll().await,
        }
    }
}

impl Data<Draining> {
    pub fn awaits_next_poll(&self) -> bool {
        self.state.polls > 0
    }

    /// Time to wait before the next poll, never past the drain deadline.
    pub fn next_poll_delay(&self) -> Duration {
        let remaining = self
            .shared
            .timing
            .max_drain_duration
            .checked_sub(self.elapsed())
            .unwrap_or_default();

        self.shared.timing.poll_interval.min(remaining)
    }

    fn elapsed(&self) -> Duration {
        Instant::now().duration_since(self.state.started_at)
    }

    fn reached_max_drain_duration(&self) -> bool {
        self.elapsed() >= self.shared.timing.max_drain_duration
    }

    async fn poll(self) -> DrainMachine {
        // a slow or retrying store must not delay cancellation
        let read = tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => None,
            read = self.shared.read_status() => Some(read),
        };

        let status = match read {
            Some(Ok(status)) => status,
            Some(Err(e)) => return self.fail(e),
            None => return self.cancel().await,
        };

        let polls = self.state.polls + 1;

        info!(
            "Poll {} of node {}; active connections {:?}",
            polls,
            self.shared.node_id(),
            status.active_connections
        );

        if status.active_connections == Some(0) {
            info!("Node {} drained", self.shared.node_id());

            return DrainMachine::Stopping(Data {
                shared: self.shared,
                state: Stopping::new(DrainOutcome::CleanDrain, polls),
            });
        }

        let data = Data {
            state: Draining { polls, ..self.state },
            ..self
        };

        if data.reached_max_drain_duration() {
            data.force_stop()
        } else {
            DrainMachine::Draining(data)
        }
    }

    fn force_stop(self) -> DrainMachine {
        warn!(
            "Reached max drain duration of node {} after {} polls; forcing stop",
            self.shared.node_id(),
            self.state.polls
        );

        DrainMachine::Stopping(Data {
            shared: self.shared,
            state: Stopping::new(DrainOutcome::Forced, self.state.polls),
        })
    }
}
