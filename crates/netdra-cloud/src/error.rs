//! Error types for cloud metadata acquisition.

use crate::provider::CloudProvider;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;

#[derive(Debug, Error)]
pub enum CloudError {
    /// A metadata request failed at the transport or HTTP level.
    #[error("metadata request {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// A metadata document could not be decoded.
    #[error("failed to decode metadata {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The metadata server answered but the value is unusable.
    #[error("metadata {path}: {message}")]
    Metadata { path: String, message: String },

    /// No snapshot could be acquired within the retry budget.
    #[error("timed out after {after:?} waiting for instance metadata: {last_error}")]
    Timeout { after: Duration, last_error: String },

    /// The provider has no metadata implementation.
    #[error("cloud provider {0} is not supported")]
    Unsupported(CloudProvider),
}

impl CloudError {
    pub fn metadata(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }
}
