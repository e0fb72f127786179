//! Google Compute Engine instance snapshot and attribute derivation.

use crate::attribute::{DeviceAttribute, DeviceAttributes, QualifiedName};
use crate::provider::{CloudInstance, CloudProvider, DeviceIdentifiers};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

pub const ATTR_BLOCK: &str = "gce.dra.net/block";
pub const ATTR_SUB_BLOCK: &str = "gce.dra.net/subBlock";
pub const ATTR_HOST: &str = "gce.dra.net/host";
pub const ATTR_NETWORK_NAME: &str = "gce.dra.net/networkName";
pub const ATTR_NETWORK_PROJECT_NUMBER: &str = "gce.dra.net/networkProjectNumber";
pub const ATTR_IP_ALIASES: &str = "gce.dra.net/ipAliases";
pub const ATTR_MACHINE_TYPE: &str = "gce.dra.net/machineType";

/// `projects/<number>/networks/<name>`; trailing text after the name is ignored.
static NETWORK_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^projects/(\d+)/networks/(\S+)").expect("Invalid network path pattern")
});

/// GPUDirect flavour offered by accelerator-optimized machine types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuDirectSupport {
    #[serde(rename = "GPUDirect-TCPX")]
    Tcpx,
    #[serde(rename = "GPUDirect-TCPXO")]
    Tcpxo,
    #[serde(rename = "GPUDirect-RDMA")]
    Rdma,
}

impl GpuDirectSupport {
    /// Protocol used by the accelerator NICs of a machine type.
    pub fn for_machine_type(machine_type: &str) -> Option<Self> {
        match machine_type {
            "a3-highgpu-1g" | "a3-highgpu-2g" | "a3-highgpu-4g" | "a3-highgpu-8g"
            | "a3-edgegpu-8g" => Some(Self::Tcpx),
            "a3-megagpu-8g" => Some(Self::Tcpxo),
            "a3-ultragpu-8g" | "a4-highgpu-8g" => Some(Self::Rdma),
            _ => None,
        }
    }
}

impl fmt::Display for GpuDirectSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tcpx => "GPUDirect-TCPX",
            Self::Tcpxo => "GPUDirect-TCPXO",
            Self::Rdma => "GPUDirect-RDMA",
        };
        f.write_str(s)
    }
}

/// One record of `instance/network-interfaces/?recursive=true&alt=json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkInterface {
    #[serde(rename = "ip")]
    pub ipv4: String,
    pub ipv6: Vec<String>,
    pub mac: String,
    pub mtu: u32,
    /// Network path, `projects/<number>/networks/<name>`.
    pub network: String,
    pub ip_aliases: Vec<String>,
}

/// Point-in-time snapshot of a GCE VM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GceInstance {
    pub name: String,
    /// Final segment of the machine type path, e.g. `a3-megagpu-8g`.
    pub machine_type: String,
    pub accelerator_protocol: Option<GpuDirectSupport>,
    pub interfaces: Vec<NetworkInterface>,
    /// `physical_host` value, `/<block>/<subBlock>/<host>`.
    pub topology: Option<String>,
}

/// Network name and owning project number parsed from a network path.
fn parse_network_path(network: &str) -> Option<(String, i64)> {
    let caps = NETWORK_PATH.captures(network)?;
    let project: i64 = caps.get(1)?.as_str().parse().ok()?;
    Some((caps.get(2)?.as_str().to_string(), project))
}

impl GceInstance {
    fn insert_topology(&self, attributes: &mut DeviceAttributes) {
        let Some(topology) = self.topology.as_deref().filter(|t| !t.is_empty()) else {
            return;
        };
        let trimmed = topology.strip_prefix('/').unwrap_or(topology);
        let parts: Vec<&str> = trimmed.splitn(3, '/').collect();
        if let [block, sub_block, host] = parts.as_slice() {
            attributes.insert(ATTR_BLOCK.into(), (*block).into());
            attributes.insert(ATTR_SUB_BLOCK.into(), (*sub_block).into());
            attributes.insert(ATTR_HOST.into(), (*host).into());
        } else {
            warn!(
                topology,
                "Error parsing host topology; it may be unsupported for the VM"
            );
        }
    }
}

impl CloudInstance for GceInstance {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Gce
    }

    fn device_attributes(&self, id: &DeviceIdentifiers) -> Option<DeviceAttributes> {
        let mut attributes = DeviceAttributes::new();
        attributes.insert(
            QualifiedName::from(ATTR_MACHINE_TYPE),
            DeviceAttribute::from(self.machine_type.as_str()),
        );
        self.insert_topology(&mut attributes);

        if id.mac.is_empty() {
            return Some(attributes);
        }

        let Some(interface) = self.interfaces.iter().find(|i| i.mac == id.mac) else {
            debug!(
                mac = %id.mac,
                "No cloud metadata for device; it may have no cloud counterpart"
            );
            return Some(attributes);
        };

        if !interface.ip_aliases.is_empty() {
            attributes.insert(ATTR_IP_ALIASES.into(), interface.ip_aliases.join(",").into());
        }

        let Some((network_name, project_number)) = parse_network_path(&interface.network) else {
            warn!(network = %interface.network, mac = %id.mac, "Error parsing network path");
            return None;
        };
        attributes.insert(ATTR_NETWORK_NAME.into(), network_name.into());
        attributes.insert(
            ATTR_NETWORK_PROJECT_NUMBER.into(),
            DeviceAttribute::Int(project_number),
        );
        Some(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn iface(mac: &str, network: &str) -> NetworkInterface {
        NetworkInterface {
            mac: mac.to_string(),
            network: network.to_string(),
            ..Default::default()
        }
    }

    fn instance(interfaces: Vec<NetworkInterface>, topology: Option<&str>) -> GceInstance {
        GceInstance {
            name: "vm-1".to_string(),
            machine_type: "machine-type-a".to_string(),
            accelerator_protocol: None,
            interfaces,
            topology: topology.map(str::to_string),
        }
    }

    fn attrs(pairs: &[(&str, DeviceAttribute)]) -> DeviceAttributes {
        pairs
            .iter()
            .map(|(k, v)| (QualifiedName::from(*k), v.clone()))
            .collect()
    }

    fn query(instance: &GceInstance, mac: &str) -> Option<DeviceAttributes> {
        instance.device_attributes(&DeviceIdentifiers::with_mac(mac))
    }

    #[test]
    fn test_no_interfaces() {
        let got = query(&instance(vec![], None), "00:11:22:33:44:55");
        assert_eq!(
            got,
            Some(attrs(&[(ATTR_MACHINE_TYPE, "machine-type-a".into())]))
        );
    }

    #[test]
    fn test_mac_not_found_without_topology() {
        let gce = instance(
            vec![iface("00:11:22:33:44:55", "projects/12345/networks/test-network")],
            None,
        );
        let got = query(&gce, "00:11:22:33:44:FF");
        assert_eq!(
            got,
            Some(attrs(&[(ATTR_MACHINE_TYPE, "machine-type-a".into())]))
        );
    }

    #[test]
    fn test_mac_not_found_with_topology() {
        let gce = instance(
            vec![iface("00:11:22:33:44:55", "projects/12345/networks/test-network")],
            Some("/block/subblock/host"),
        );
        let got = query(&gce, "00:11:22:33:44:FF");
        assert_eq!(
            got,
            Some(attrs(&[
                (ATTR_BLOCK, "block".into()),
                (ATTR_SUB_BLOCK, "subblock".into()),
                (ATTR_HOST, "host".into()),
                (ATTR_MACHINE_TYPE, "machine-type-a".into()),
            ]))
        );
    }

    #[test]
    fn test_mac_found_valid_network() {
        let gce = instance(
            vec![
                iface("00:11:22:33:44:55", "projects/12345/networks/test-network"),
                iface("AA:BB:CC:DD:EE:FF", "projects/67890/networks/other-network"),
            ],
            Some("/block/subblock/host"),
        );
        let got = query(&gce, "00:11:22:33:44:55");
        assert_eq!(
            got,
            Some(attrs(&[
                (ATTR_BLOCK, "block".into()),
                (ATTR_SUB_BLOCK, "subblock".into()),
                (ATTR_HOST, "host".into()),
                (ATTR_NETWORK_NAME, "test-network".into()),
                (ATTR_NETWORK_PROJECT_NUMBER, DeviceAttribute::Int(12345)),
                (ATTR_MACHINE_TYPE, "machine-type-a".into()),
            ]))
        );
    }

    #[test]
    fn test_mac_found_invalid_network() {
        let gce = instance(
            vec![iface("00:11:22:33:44:55", "invalid-gce-network-string")],
            Some("/block/subblock/host"),
        );
        assert_eq!(query(&gce, "00:11:22:33:44:55"), None);
    }

    #[test]
    fn test_mac_found_invalid_topology() {
        let gce = instance(
            vec![
                iface("00:11:22:33:44:55", "projects/12345/networks/test-network"),
                iface("AA:BB:CC:DD:EE:FF", "projects/67890/networks/other-network"),
            ],
            Some("/block/subblock"),
        );
        let got = query(&gce, "00:11:22:33:44:55");
        assert_eq!(
            got,
            Some(attrs(&[
                (ATTR_NETWORK_NAME, "test-network".into()),
                (ATTR_NETWORK_PROJECT_NUMBER, DeviceAttribute::Int(12345)),
                (ATTR_MACHINE_TYPE, "machine-type-a".into()),
            ]))
        );
    }

    #[test]
    fn test_mac_found_with_ip_aliases() {
        let mut nic = iface("00:11:22:33:44:55", "projects/12345/networks/test-network");
        nic.ip_aliases = vec!["10.0.0.1/24".to_string(), "10.0.0.2/24".to_string()];
        let got = query(&instance(vec![nic], None), "00:11:22:33:44:55");
        assert_eq!(
            got,
            Some(attrs(&[
                (ATTR_NETWORK_NAME, "test-network".into()),
                (ATTR_NETWORK_PROJECT_NUMBER, DeviceAttribute::Int(12345)),
                (ATTR_IP_ALIASES, "10.0.0.1/24,10.0.0.2/24".into()),
                (ATTR_MACHINE_TYPE, "machine-type-a".into()),
            ]))
        );
    }

    #[test]
    fn test_mac_match_is_case_sensitive() {
        let gce = instance(
            vec![iface("aa:bb:cc:dd:ee:ff", "projects/1/networks/n")],
            None,
        );
        let got = query(&gce, "AA:BB:CC:DD:EE:FF").unwrap();
        assert!(!got.contains_key(&QualifiedName::from(ATTR_NETWORK_NAME)));
    }

    #[test]
    fn test_duplicate_mac_first_wins() {
        let gce = instance(
            vec![
                iface("00:11:22:33:44:55", "projects/1/networks/first"),
                iface("00:11:22:33:44:55", "projects/2/networks/second"),
            ],
            None,
        );
        let got = query(&gce, "00:11:22:33:44:55").unwrap();
        assert_eq!(
            got.get(&QualifiedName::from(ATTR_NETWORK_NAME)),
            Some(&DeviceAttribute::from("first"))
        );
    }

    #[test]
    fn test_empty_mac_node_attributes_only() {
        let gce = instance(
            vec![iface("", "projects/1/networks/n")],
            Some("block/subblock/host"),
        );
        let got = query(&gce, "").unwrap();
        assert_eq!(got.len(), 4);
        assert!(!got.contains_key(&QualifiedName::from(ATTR_NETWORK_NAME)));
    }

    #[test]
    fn test_topology_host_keeps_remaining_separators() {
        let gce = instance(vec![], Some("/b/sb/h/extra"));
        let got = query(&gce, "").unwrap();
        assert_eq!(
            got.get(&QualifiedName::from(ATTR_HOST)),
            Some(&DeviceAttribute::from("h/extra"))
        );
    }

    #[test]
    fn test_parse_network_path() {
        assert_eq!(
            parse_network_path("projects/12345/networks/test-network"),
            Some(("test-network".to_string(), 12345))
        );
        assert_eq!(parse_network_path("projects/x/networks/n"), None);
        assert_eq!(parse_network_path("projects/1/networks/"), None);
        assert_eq!(parse_network_path("projects/99999999999999999999/networks/n"), None);
    }

    #[test]
    fn test_accelerator_protocol() {
        assert_eq!(
            GpuDirectSupport::for_machine_type("a3-highgpu-8g"),
            Some(GpuDirectSupport::Tcpx)
        );
        assert_eq!(
            GpuDirectSupport::for_machine_type("a3-megagpu-8g"),
            Some(GpuDirectSupport::Tcpxo)
        );
        assert_eq!(
            GpuDirectSupport::for_machine_type("a4-highgpu-8g"),
            Some(GpuDirectSupport::Rdma)
        );
        assert_eq!(GpuDirectSupport::for_machine_type("n2-standard-4"), None);
        assert_eq!(GpuDirectSupport::Tcpxo.to_string(), "GPUDirect-TCPXO");
    }

    #[test]
    fn test_interfaces_json() {
        let raw = r#"[{"ip":"10.128.0.2","mac":"42:01:0a:80:00:02","mtu":1460,
            "network":"projects/12345/networks/default","ipAliases":["10.0.0.0/24"],
            "accessConfigs":[{"type":"ONE_TO_ONE_NAT"}]}]"#;
        let interfaces: Vec<NetworkInterface> = serde_json::from_str(raw).unwrap();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].ipv4, "10.128.0.2");
        assert_eq!(interfaces[0].mtu, 1460);
        assert_eq!(interfaces[0].ip_aliases, vec!["10.0.0.0/24".to_string()]);
        assert!(interfaces[0].ipv6.is_empty());
    }
}
