//! netdra node daemon
//!
//! Wires the cloud, inventory and netconf crates into the two node-local
//! operations: publishing device attributes and configuring an allocated
//! device inside a pod network namespace.

pub mod apply;
pub mod config_file;
pub mod discover;
pub mod error;

pub use apply::{apply_file, load_network_config};
pub use config_file::{DaemonConfig, InventoryConfig, MetadataConfig, DEFAULT_CONFIG_PATH};
pub use discover::{discover, discover_with};
pub use error::{DaemonError, Result};
