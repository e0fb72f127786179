//! Discovery against a fake sysfs tree and an in-memory metadata server.

use async_trait::async_trait;
use netdra_cloud::gce::{ATTR_MACHINE_TYPE, ATTR_NETWORK_NAME};
use netdra_cloud::metadata::{
    PATH_INSTANCE_NAME, PATH_MACHINE_TYPE, PATH_NETWORK_INTERFACES, PATH_PHYSICAL_HOST,
};
use netdra_cloud::{CloudError, MetadataClient, QualifiedName};
use netdra_inventory::attributes::ATTR_MAC;
use netdrad::{discover_with, DaemonConfig};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const INTERFACES: &str = r#"[
    {"mac": "42:01:0a:00:00:03", "network": "projects/12345/networks/gpu-net-1"},
    {"mac": "42:01:0a:80:00:02", "network": "projects/12345/networks/default"}
]"#;

#[derive(Default)]
struct StaticMetadata {
    documents: HashMap<&'static str, String>,
}

impl StaticMetadata {
    fn gce() -> Self {
        let mut documents = HashMap::new();
        documents.insert(PATH_INSTANCE_NAME, "node-a".to_string());
        documents.insert(
            PATH_MACHINE_TYPE,
            "projects/12345/machineTypes/a3-highgpu-8g".to_string(),
        );
        documents.insert(PATH_NETWORK_INTERFACES, INTERFACES.to_string());
        documents.insert(PATH_PHYSICAL_HOST, "/blk1/sub2/host3".to_string());
        Self { documents }
    }
}

#[async_trait]
impl MetadataClient for StaticMetadata {
    async fn get(&self, path: &str) -> netdra_cloud::Result<String> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| CloudError::metadata(path, "connection refused"))
    }
}

fn add_iface(base: &Path, name: &str, mac: &str) {
    let dir = base.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("address"), format!("{}\n", mac)).unwrap();
    fs::write(dir.join("mtu"), "1460\n").unwrap();
}

fn config_for(sysfs: &TempDir) -> DaemonConfig {
    let mut config = DaemonConfig::default();
    config.inventory.sysfs_net_path = sysfs.path().to_path_buf();
    config
}

#[tokio::test(start_paused = true)]
async fn test_discover_merges_cloud_attributes() {
    let sysfs = TempDir::new().unwrap();
    add_iface(sysfs.path(), "eth0", "42:01:0a:80:00:02");
    add_iface(sysfs.path(), "eth1", "42:01:0a:00:00:03");
    add_iface(sysfs.path(), "eth2", "42:01:0a:00:00:99");

    let devices = discover_with(&config_for(&sysfs), &StaticMetadata::gce())
        .await
        .unwrap();
    assert_eq!(devices.len(), 3);

    let eth1 = &devices[1];
    assert_eq!(eth1.attribute_str(ATTR_MAC), Some("42:01:0a:00:00:03"));
    assert_eq!(eth1.attribute_str(ATTR_NETWORK_NAME), Some("gpu-net-1"));
    assert_eq!(devices[0].attribute_str(ATTR_NETWORK_NAME), Some("default"));

    // Unmatched MAC still carries instance-wide attributes.
    let eth2 = &devices[2];
    assert_eq!(eth2.attribute_str(ATTR_NETWORK_NAME), None);
    assert!(eth2
        .attributes
        .contains_key(&QualifiedName::from(ATTR_MACHINE_TYPE)));
}

#[tokio::test(start_paused = true)]
async fn test_discover_without_metadata_server() {
    let sysfs = TempDir::new().unwrap();
    add_iface(sysfs.path(), "eth0", "42:01:0a:80:00:02");

    let devices = discover_with(&config_for(&sysfs), &StaticMetadata::default())
        .await
        .unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].attribute_str(ATTR_MAC), Some("42:01:0a:80:00:02"));
    assert!(!devices[0]
        .attributes
        .contains_key(&QualifiedName::from(ATTR_MACHINE_TYPE)));
}

#[tokio::test]
async fn test_discover_names_are_shortened() {
    let sysfs = TempDir::new().unwrap();
    add_iface(sysfs.path(), "enp0s12f3", "42:01:0a:80:00:02");
    let mut config = config_for(&sysfs);
    config.inventory.max_name_length = 5;

    let devices = discover_with(&config, &StaticMetadata::gce()).await.unwrap();
    assert_eq!(devices[0].name, "enp0s");
}

#[tokio::test]
async fn test_discover_missing_sysfs_is_fatal() {
    let mut config = DaemonConfig::default();
    config.inventory.sysfs_net_path = "/nonexistent/sys/class/net".into();
    let err = discover_with(&config, &StaticMetadata::gce()).await.unwrap_err();
    assert!(matches!(err, netdrad::DaemonError::Inventory(_)));
}
