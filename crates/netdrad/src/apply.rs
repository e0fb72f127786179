//! Apply a network config file to a device in a pod namespace.

use crate::error::Result;
use netdra_netconf::NetworkConfig;
use std::path::Path;
use tracing::info;

/// Read, default and validate a JSON network config.
pub async fn load_network_config(path: &Path) -> Result<NetworkConfig> {
    let raw = tokio::fs::read(path).await?;
    Ok(NetworkConfig::from_json(&raw)?)
}

/// Configure `device` in the namespace at `netns` from the JSON at `path`.
///
/// Kernel work runs on the blocking pool; namespace switching and netlink
/// exchanges are synchronous.
#[cfg(target_os = "linux")]
pub async fn apply_file(netns: &str, device: &str, path: &Path) -> Result<()> {
    let config = load_network_config(path).await?;
    let (netns, device) = (netns.to_string(), device.to_string());
    info!(netns = %netns, device = %device, "Applying network config");
    tokio::task::spawn_blocking(move || {
        netdra_netconf::apply_network_config(&netns, &device, &config)
    })
    .await??;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub async fn apply_file(netns: &str, device: &str, path: &Path) -> Result<()> {
    let _config = load_network_config(path).await?;
    info!(netns, device, "Network namespaces are not available on this platform");
    Err(crate::error::DaemonError::Configuration(
        "network namespaces require Linux".to_string(),
    ))
}
