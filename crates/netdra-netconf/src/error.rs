//! Error types for network configuration.

use netdra_common::{ErrorList, NetdraError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetconfError>;

#[derive(Debug, Error)]
pub enum NetconfError {
    /// The config document is not valid JSON for the model.
    #[error("failed to parse network config: {0}")]
    Json(#[from] serde_json::Error),

    /// The config parsed but violates one or more invariants.
    #[error("invalid network config:\n{0}")]
    Invalid(ErrorList),

    /// A precondition of the whole allocation failed (namespace or device
    /// unavailable); nothing was applied.
    #[error(transparent)]
    Kernel(#[from] NetdraError),

    /// Some entries failed; the rest were applied.
    #[error("failed to apply network config:\n{0}")]
    Apply(ErrorList),
}

impl NetconfError {
    /// Per-entry failures carried by this error, if any.
    pub fn errors(&self) -> Option<&ErrorList> {
        match self {
            NetconfError::Invalid(list) | NetconfError::Apply(list) => Some(list),
            _ => None,
        }
    }
}
