//! Error types for local device discovery.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InventoryError>;

#[derive(Debug, Error)]
pub enum InventoryError {
    /// The interface has no readable `device/infiniband` directory.
    #[error("no RDMA device for {ifname}: {source}")]
    NoRdmaDir {
        ifname: String,
        #[source]
        source: io::Error,
    },

    /// `device/infiniband` exists but holds no device directory.
    #[error("no RDMA device found for {ifname}")]
    NoRdmaDevice { ifname: String },

    /// Reading a sysfs entry failed.
    #[error("failed to read {path}: {source}")]
    Sysfs {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl InventoryError {
    /// True when the interface simply has no RDMA counterpart.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InventoryError::NoRdmaDir { .. } | InventoryError::NoRdmaDevice { .. }
        )
    }
}
