use thiserror::Error;

use crate::transition::Activation;

/// Error type accepted from activation callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum GateError {
    /// An activation callback failed. The gate stops monitoring after this.
    #[error("on_{activation} callback failed: {source}")]
    Callback {
        activation: Activation,
        #[source]
        source: BoxError,
    },
}

impl GateError {
    /// The transition whose callback failed
    pub fn activation(&self) -> Activation {
        match self {
            GateError::Callback { activation, .. } => *activation,
        }
    }
}

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("task {task} failed: {source}")]
    Failed {
        task: String,
        #[source]
        source: GateError,
    },
    #[error("task {task} did not complete: {source}")]
    Join {
        task: String,
        #[source]
        source: tokio::task::JoinError,
    },
}
