//! RDMA device lookup for network interfaces.

use crate::error::{InventoryError, Result};
use std::fs;
use std::path::Path;

/// Name of the RDMA device backing `ifname`, e.g. `mlx5_0`.
///
/// Looks at `<sysfs_net>/<ifname>/device/infiniband` and returns the first
/// sub-directory in name order. Plain files are ignored.
pub fn rdma_device_for(sysfs_net: &Path, ifname: &str) -> Result<String> {
    let dir = sysfs_net.join(ifname).join("device").join("infiniband");
    let entries = fs::read_dir(&dir).map_err(|source| InventoryError::NoRdmaDir {
        ifname: ifname.to_string(),
        source,
    })?;

    let mut devices: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    devices.sort();

    devices
        .into_iter()
        .next()
        .ok_or_else(|| InventoryError::NoRdmaDevice {
            ifname: ifname.to_string(),
        })
}
