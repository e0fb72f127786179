//! Configuration file support for netdrad
//!
//! Loads and validates the daemon configuration from a TOML file.
//! Default location: /etc/netdra/netdrad.toml

use crate::error::{DaemonError, Result};
use netdra_cloud::{FetchPolicy, DEFAULT_METADATA_ENDPOINT};
use netdra_inventory::SYSFS_CLASS_NET;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/netdra/netdrad.toml";

/// Metadata server access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Base URL of the metadata server
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Delay between snapshot attempts in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Overall snapshot budget in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Local device discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Root of the network class in sysfs
    #[serde(default = "default_sysfs_net_path")]
    pub sysfs_net_path: PathBuf,

    /// Longest published device name
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

/// Complete netdrad configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub inventory: InventoryConfig,
}

fn default_endpoint() -> String {
    DEFAULT_METADATA_ENDPOINT.to_string()
}

fn default_poll_interval() -> u64 {
    1
}

fn default_timeout() -> u64 {
    15
}

fn default_request_timeout() -> u64 {
    5
}

fn default_sysfs_net_path() -> PathBuf {
    PathBuf::from(SYSFS_CLASS_NET)
}

fn default_max_name_length() -> usize {
    63
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            sysfs_net_path: default_sysfs_net_path(),
            max_name_length: default_max_name_length(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                DaemonError::Configuration(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(DaemonError::Io(e)),
        }
    }

    /// Snapshot retry cadence.
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            poll_interval: Duration::from_secs(self.metadata.poll_interval_secs),
            timeout: Duration::from_secs(self.metadata.timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata.request_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.metadata.endpoint.starts_with("http://")
            && !self.metadata.endpoint.starts_with("https://")
        {
            return Err(DaemonError::Configuration(format!(
                "metadata.endpoint must be an http(s) URL, got '{}'",
                self.metadata.endpoint
            )));
        }

        if self.metadata.poll_interval_secs == 0 {
            return Err(DaemonError::Configuration(
                "metadata.poll_interval_secs must be > 0".to_string(),
            ));
        }

        if self.metadata.timeout_secs < self.metadata.poll_interval_secs {
            return Err(DaemonError::Configuration(
                "metadata.timeout_secs must be >= poll_interval_secs".to_string(),
            ));
        }

        if self.metadata.request_timeout_secs == 0 {
            return Err(DaemonError::Configuration(
                "metadata.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.inventory.max_name_length == 0 {
            return Err(DaemonError::Configuration(
                "inventory.max_name_length must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
