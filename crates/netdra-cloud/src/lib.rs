//! Cloud provider metadata for netdra
//!
//! Acquires a read-only snapshot of the instance the node runs on and
//! derives namespaced device attributes from it, keyed by identifiers of
//! locally discovered devices.

pub mod attribute;
pub mod error;
pub mod gce;
pub mod metadata;
pub mod provider;

pub use attribute::{DeviceAttribute, DeviceAttributes, QualifiedName};
pub use error::{CloudError, Result};
pub use gce::{GceInstance, GpuDirectSupport, NetworkInterface};
pub use metadata::{
    fetch_gce_instance, get_instance, FetchPolicy, HttpMetadataClient, MetadataClient,
    DEFAULT_METADATA_ENDPOINT,
};
pub use provider::{CloudInstance, CloudProvider, DeviceIdentifiers};
