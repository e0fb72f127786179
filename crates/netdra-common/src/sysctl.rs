//! Kernel parameters under `/proc/sys`.
//!
//! `/proc/sys/net/*` resolves against the network namespace of the thread
//! that opens the file, so callers that target another namespace must hold
//! a [`crate::netns::NetnsSwitch`] around these calls.

use crate::error::{NetdraError, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Root of the sysctl tree.
pub const PROC_SYS: &str = "/proc/sys";

/// Accept TCP connections on any VRF-enslaved interface.
pub const TCP_L3MDEV_ACCEPT: &str = "net/ipv4/tcp_l3mdev_accept";

/// Accept UDP datagrams on any VRF-enslaved interface.
pub const UDP_L3MDEV_ACCEPT: &str = "net/ipv4/udp_l3mdev_accept";

/// Set `key` (slash-separated, e.g. `net/ipv4/ip_forward`) to `value`.
pub fn set_sysctl(key: &str, value: i64) -> Result<()> {
    set_sysctl_at(Path::new(PROC_SYS), key, value)
}

/// Set `key` below an explicit root directory.
pub fn set_sysctl_at(root: &Path, key: &str, value: i64) -> Result<()> {
    let path = root.join(key);
    fs::write(&path, value.to_string()).map_err(|source| NetdraError::Sysctl {
        key: key.to_string(),
        source,
    })?;
    debug!(key, value, "Set sysctl");
    Ok(())
}
