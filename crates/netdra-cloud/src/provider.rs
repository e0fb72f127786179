//! Provider-neutral view of a cloud instance.

use crate::attribute::DeviceAttributes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cloud provider tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudProvider {
    #[serde(rename = "GCE")]
    Gce,
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "Azure")]
    Azure,
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloudProvider::Gce => "GCE",
            CloudProvider::Aws => "AWS",
            CloudProvider::Azure => "Azure",
        };
        f.write_str(s)
    }
}

/// Identifiers a provider may use to correlate a local device with its
/// cloud-side record. Empty strings mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentifiers {
    pub mac: String,
    pub pci_address: String,
    pub name: String,
}

impl DeviceIdentifiers {
    pub fn with_mac(mac: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            ..Self::default()
        }
    }
}

/// Read-only snapshot of one cloud instance.
///
/// Implementations are immutable after construction and shared across the
/// process for its lifetime.
pub trait CloudInstance: Send + Sync + fmt::Debug {
    fn provider(&self) -> CloudProvider;

    /// Cloud attributes for the device, or `None` when the provider has
    /// data for the device but it cannot be trusted.
    fn device_attributes(&self, id: &DeviceIdentifiers) -> Option<DeviceAttributes>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_display() {
        assert_eq!(CloudProvider::Gce.to_string(), "GCE");
        assert_eq!(CloudProvider::Aws.to_string(), "AWS");
        assert_eq!(CloudProvider::Azure.to_string(), "Azure");
        assert_eq!(serde_json::to_string(&CloudProvider::Gce).unwrap(), "\"GCE\"");
    }
}
