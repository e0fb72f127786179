//! Local network device inventory for netdra
//!
//! Discovers interfaces from sysfs, records their local attributes, and
//! enriches them with cloud provider attributes.

pub mod attributes;
pub mod error;
pub mod rdma;
pub mod sysfs;

pub use attributes::{merge_provider_attributes, provider_attributes, short_name, Device};
pub use error::{InventoryError, Result};
pub use rdma::rdma_device_for;
pub use sysfs::{discover_devices, SYSFS_CLASS_NET};
