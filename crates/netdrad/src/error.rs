//! Error types for netdrad.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DaemonError>;

#[derive(Debug, Error)]
pub enum DaemonError {
    /// The daemon config file is unreadable or nonsensical.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Cloud(#[from] netdra_cloud::CloudError),

    #[error(transparent)]
    Inventory(#[from] netdra_inventory::InventoryError),

    #[error(transparent)]
    Netconf(#[from] netdra_netconf::NetconfError),

    /// A blocking worker panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
