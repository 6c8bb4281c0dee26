#[derive(thiserror::Error, Debug)]
pub enum DrainError {
    #[error("Invalid drain request: {0}")]
    InvalidRequest(String),
    #[error("Status store unavailable; failed to {operation} for node {node_id} after {attempts} attempts")]
    StoreUnavailable {
        node_id: String,
        operation: &'static str,
        attempts: u32,
    },
    #[error("Failed to stop workload {workload}")]
    StopFailed { workload: String },
    #[error("Drain of node {node_id} was cancelled")]
    Cancelled { node_id: String },
}

impl DrainError {
    /// Stable identifier of the failure class, used in invocation results.
    pub fn kind(&self) -> &'static str {
        match self {
            DrainError::InvalidRequest(_) => "InvalidRequest",
            DrainError::StoreUnavailable { .. } => "StoreUnavailable",
            DrainError::StopFailed { .. } => "StopFailed",
            DrainError::Cancelled { .. } => "Cancelled",
        }
    }
}
