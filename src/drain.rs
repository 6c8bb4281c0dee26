mod controller;
mod error;
pub mod request;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub use controller::{Config as ControllerConfig, DrainController, DrainTiming};
pub use error::DrainError;
pub use request::{DrainRequest, InvocationEvent, RoutingRef, WorkloadRef};

/// Drain status of a node as persisted in the status store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DrainState {
    Draining,
    Stopped,
    StoppedForce,
    /// The drain loop was aborted by an external signal before the workload was stopped.
    Cancelled,
}

impl DrainState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DrainState::Stopped | DrainState::StoppedForce)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DrainOutcome {
    CleanDrain,
    Forced,
}

impl DrainOutcome {
    pub fn terminal_state(self) -> DrainState {
        match self {
            DrainOutcome::CleanDrain => DrainState::Stopped,
            DrainOutcome::Forced => DrainState::StoppedForce,
        }
    }
}

/// Result record of a single drain invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub result: DrainOutcome,
    pub node_id: String,
    pub polls: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_drain_state_wire_names() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!("STOPPED_FORCE", DrainState::StoppedForce.to_string());
        assert_eq!(DrainState::Draining, DrainState::from_str("DRAINING")?);
        assert_eq!(
            "\"STOPPED\"",
            serde_json::to_string(&DrainState::Stopped)?
        );

        Ok(())
    }

    #[test]
    fn test_only_stop_states_are_terminal() {
        assert!(DrainState::Stopped.is_terminal());
        assert!(DrainState::StoppedForce.is_terminal());
        assert!(!DrainState::Draining.is_terminal());
        assert!(!DrainState::Cancelled.is_terminal());
    }

    #[test]
    fn test_report_serializes_result_tag() -> Result<(), Box<dyn std::error::Error>> {
        let report = DrainReport {
            result: DrainOutcome::CleanDrain,
            node_id: "n1".into(),
            polls: 3,
        };

        let json: serde_json::Value = serde_json::to_value(&report)?;
        assert_eq!("clean-drain", json["result"]);
        assert_eq!("forced", DrainOutcome::Forced.to_string());

        Ok(())
    }
}
