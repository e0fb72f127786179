//! Network device discovery from `/sys/class/net`.

use crate::attributes::{
    Device, ATTR_IF_NAME, ATTR_MAC, ATTR_MTU, ATTR_PCI_ADDRESS, ATTR_RDMA_DEVICE,
};
use crate::error::{InventoryError, Result};
use crate::rdma::rdma_device_for;
use netdra_cloud::DeviceAttribute;
use netdra_common::HardwareAddr;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Default location of the network class in sysfs.
pub const SYSFS_CLASS_NET: &str = "/sys/class/net";

const LOOPBACK: &str = "lo";

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

/// PCI address (`dddd:bb:dd.f`) the `device` link of an interface points at.
fn pci_address(iface_dir: &Path) -> Option<String> {
    let target = fs::read_link(iface_dir.join("device")).ok()?;
    let name = target.file_name()?.to_str()?;
    let looks_like_pci = name.len() == 12 && name.as_bytes()[4] == b':' && name.as_bytes()[7] == b':';
    looks_like_pci.then(|| name.to_string())
}

/// Build the local attribute set of one interface.
fn discover_device(sysfs_net: &Path, ifname: &str) -> Device {
    let iface_dir = sysfs_net.join(ifname);
    let mut device = Device::new(ifname);
    device
        .attributes
        .insert(ATTR_IF_NAME.into(), DeviceAttribute::from(ifname));

    match read_trimmed(&iface_dir.join("address")).map(|raw| (HardwareAddr::parse(&raw), raw)) {
        Some((Some(mac), raw)) if !mac.is_zero() => {
            device.attributes.insert(ATTR_MAC.into(), raw.into());
        }
        Some((None, raw)) if !raw.is_empty() => {
            debug!(ifname, address = %raw, "Ignoring unparsable hardware address");
        }
        _ => {}
    }

    if let Some(mtu) = read_trimmed(&iface_dir.join("mtu")).and_then(|s| s.parse::<i64>().ok()) {
        device.attributes.insert(ATTR_MTU.into(), mtu.into());
    }

    if let Some(pci) = pci_address(&iface_dir) {
        device.attributes.insert(ATTR_PCI_ADDRESS.into(), pci.into());
    }

    match rdma_device_for(sysfs_net, ifname) {
        Ok(rdma) => {
            device.attributes.insert(ATTR_RDMA_DEVICE.into(), rdma.into());
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => warn!(ifname, error = %e, "RDMA lookup failed"),
    }

    device
}

/// Enumerate network interfaces under `sysfs_net`, loopback excluded,
/// sorted by name.
#[instrument]
pub fn discover_devices(sysfs_net: &Path) -> Result<Vec<Device>> {
    let entries = fs::read_dir(sysfs_net).map_err(|source| InventoryError::Sysfs {
        path: sysfs_net.display().to_string(),
        source,
    })?;

    let mut devices = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| InventoryError::Sysfs {
            path: sysfs_net.display().to_string(),
            source,
        })?;
        let Ok(ifname) = entry.file_name().into_string() else {
            continue;
        };
        if ifname == LOOPBACK {
            continue;
        }
        devices.push(discover_device(sysfs_net, &ifname));
    }
    devices.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(count = devices.len(), "Discovered network devices");
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdra_cloud::QualifiedName;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn add_iface(base: &Path, name: &str, mac: &str, mtu: &str) {
        let dir = base.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("address"), format!("{}\n", mac)).unwrap();
        fs::write(dir.join("mtu"), format!("{}\n", mtu)).unwrap();
    }

    fn attr<'a>(device: &'a Device, key: &str) -> Option<&'a DeviceAttribute> {
        device.attributes.get(&QualifiedName::from(key))
    }

    #[test]
    fn test_discover_devices() {
        let sysfs = TempDir::new().unwrap();
        add_iface(sysfs.path(), "lo", "00:00:00:00:00:00", "65536");
        add_iface(sysfs.path(), "eth1", "42:01:0a:00:00:03", "8896");
        add_iface(sysfs.path(), "eth0", "42:01:0a:80:00:02", "1460");
        fs::create_dir_all(sysfs.path().join("eth1/device/infiniband/mlx5_1")).unwrap();

        let devices = discover_devices(sysfs.path()).unwrap();
        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["eth0", "eth1"]);

        let eth1 = &devices[1];
        assert_eq!(eth1.attribute_str(ATTR_MAC), Some("42:01:0a:00:00:03"));
        assert_eq!(attr(eth1, ATTR_MTU), Some(&DeviceAttribute::Int(8896)));
        assert_eq!(eth1.attribute_str(ATTR_IF_NAME), Some("eth1"));
        assert_eq!(eth1.attribute_str(ATTR_RDMA_DEVICE), Some("mlx5_1"));
        assert_eq!(devices[0].attribute_str(ATTR_RDMA_DEVICE), None);
    }

    #[test]
    fn test_zero_mac_omitted() {
        let sysfs = TempDir::new().unwrap();
        add_iface(sysfs.path(), "wg0", "00:00:00:00:00:00", "1420");
        let devices = discover_devices(sysfs.path()).unwrap();
        assert_eq!(devices[0].attribute_str(ATTR_MAC), None);
        assert_eq!(attr(&devices[0], ATTR_MTU), Some(&DeviceAttribute::Int(1420)));
    }

    #[test]
    fn test_pci_address_from_device_link() {
        let sysfs = TempDir::new().unwrap();
        add_iface(sysfs.path(), "eth2", "42:01:0a:00:00:04", "1500");
        let pci = sysfs.path().join("pci0000:00/0000:00:05.0");
        fs::create_dir_all(&pci).unwrap();
        std::os::unix::fs::symlink(&pci, sysfs.path().join("eth2/device")).unwrap();

        let devices = discover_devices(sysfs.path()).unwrap();
        let eth2 = devices.iter().find(|d| d.name == "eth2").unwrap();
        assert_eq!(eth2.attribute_str(ATTR_PCI_ADDRESS), Some("0000:00:05.0"));
    }

    #[test]
    fn test_missing_sysfs() {
        let err = discover_devices(Path::new("/nonexistent/sys/class/net")).unwrap_err();
        assert!(matches!(err, InventoryError::Sysfs { .. }));
    }
}
