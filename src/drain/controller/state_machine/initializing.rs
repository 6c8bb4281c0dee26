use super::*;
use crate::config::Deregistration;

impl MachineState for Initializing {}

#[async_trait]
impl Handler for Data<Initializing> {
    async fn handle(self, _event: Option<DrainMachineEvent>) -> DrainMachine {
        if let Err(e) = self.check_request() {
            return self.fail(e);
        }

        if let Err(e) = self.shared.write_status(DrainState::Draining).await {
            return self.fail(e);
        }

        if self.shared.config.deregistration == Deregistration::OnStart {
            self.shared.deregister().await;
        }

        DrainMachine::Draining(Data {
            shared: self.shared,
            state: Draining::new(),
        })
    }
}

impl Data<Initializing> {
    fn check_request(&self) -> Result<(), DrainError> {
        self.shared.request.validate()?;

        if self.shared.timing.poll_interval.as_nanos() == 0 {
            return Err(DrainError::InvalidRequest(
                "poll interval must be positive".into(),
            ));
        }

        Ok(())
    }
}
