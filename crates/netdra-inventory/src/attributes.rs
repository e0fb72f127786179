//! Device records and cloud attribute resolution.

use netdra_cloud::{CloudInstance, DeviceAttributes, DeviceIdentifiers, QualifiedName};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ATTR_MAC: &str = "dra.net/mac";
pub const ATTR_PCI_ADDRESS: &str = "dra.net/pciAddress";
pub const ATTR_IF_NAME: &str = "dra.net/ifName";
pub const ATTR_MTU: &str = "dra.net/mtu";
pub const ATTR_RDMA_DEVICE: &str = "dra.net/rdmaDevice";

/// A discovered device and its published attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub attributes: DeviceAttributes,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: DeviceAttributes::new(),
        }
    }

    /// String value of a local attribute, if present.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(&QualifiedName::from(key))
            .and_then(|a| a.as_str())
    }

    fn identifiers(&self) -> DeviceIdentifiers {
        DeviceIdentifiers {
            mac: self.attribute_str(ATTR_MAC).unwrap_or_default().to_string(),
            pci_address: self
                .attribute_str(ATTR_PCI_ADDRESS)
                .unwrap_or_default()
                .to_string(),
            name: self.name.clone(),
        }
    }
}

/// Cloud attributes for `device`, or `None` if either side is absent or
/// the provider has nothing trustworthy to say.
pub fn provider_attributes(
    device: Option<&Device>,
    instance: Option<&dyn CloudInstance>,
) -> Option<DeviceAttributes> {
    let (device, instance) = (device?, instance?);
    instance.device_attributes(&device.identifiers())
}

/// Merge cloud attributes into the device's own set.
pub fn merge_provider_attributes(device: &mut Device, instance: Option<&dyn CloudInstance>) {
    let Some(cloud) = provider_attributes(Some(&*device), instance) else {
        debug!(device = %device.name, "No cloud attributes for device");
        return;
    };
    debug!(device = %device.name, count = cloud.len(), "Merging cloud attributes");
    device.attributes.extend(cloud);
}

/// Last `/`-separated segment of `path`, cut to at most `max_len` bytes.
///
/// The cut never splits a UTF-8 sequence; for ASCII input it is an exact
/// byte truncation.
pub fn short_name(path: &str, max_len: usize) -> &str {
    let last = path.rsplit('/').next().unwrap_or(path);
    if last.len() <= max_len {
        return last;
    }
    let mut end = max_len;
    while !last.is_char_boundary(end) {
        end -= 1;
    }
    &last[..end]
}
