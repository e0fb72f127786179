//! Device discovery: local sysfs inventory enriched with cloud attributes.

use crate::config_file::DaemonConfig;
use crate::error::Result;
use netdra_cloud::{get_instance, CloudProvider, HttpMetadataClient, MetadataClient};
use netdra_inventory::{discover_devices, merge_provider_attributes, short_name, Device};
use tracing::{info, warn};

/// Discover devices, using the metadata server named in `config`.
pub async fn discover(config: &DaemonConfig) -> Result<Vec<Device>> {
    let client = HttpMetadataClient::new(config.metadata.endpoint.clone(), config.request_timeout())?;
    discover_with(config, &client).await
}

/// Discover devices, reading cloud metadata through `client`.
///
/// An unreachable metadata server is not fatal: devices are published with
/// their local attributes only.
pub async fn discover_with<C: MetadataClient + ?Sized>(
    config: &DaemonConfig,
    client: &C,
) -> Result<Vec<Device>> {
    let sysfs = config.inventory.sysfs_net_path.clone();
    let mut devices = tokio::task::spawn_blocking(move || discover_devices(&sysfs)).await??;

    let instance = match get_instance(CloudProvider::Gce, client, &config.fetch_policy()).await {
        Ok(instance) => Some(instance),
        Err(e) => {
            warn!(error = %e, "Cloud metadata unavailable, publishing local attributes only");
            None
        }
    };

    for device in &mut devices {
        merge_provider_attributes(device, instance.as_deref());
        device.name = short_name(&device.name, config.inventory.max_name_length).to_string();
    }

    info!(
        devices = devices.len(),
        cloud = instance.is_some(),
        "Device discovery complete"
    );
    Ok(devices)
}
