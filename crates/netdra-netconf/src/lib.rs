//! Network configuration for allocated netdra devices
//!
//! The [`NetworkConfig`] model, its defaulting and validation, and the
//! engine that programs routes, rules, neighbors and VRF membership inside
//! a pod network namespace.

pub mod defaults;
pub mod engine;
pub mod error;
pub mod types;
pub mod validation;

pub use defaults::{vrf_table_for, VRF_TABLE_OFFSET};
pub use engine::configure;
#[cfg(target_os = "linux")]
pub use engine::apply_network_config;
pub use error::{NetconfError, Result};
pub use types::{
    EthtoolConfig, InterfaceConfig, NeighborConfig, NetworkConfig, RouteConfig, RuleConfig,
    VrfConfig, RT_SCOPE_LINK, RT_SCOPE_UNIVERSE,
};

impl NetworkConfig {
    /// Parse a JSON document, apply defaults, and validate.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let mut config: NetworkConfig = serde_json::from_slice(bytes)?;
        config.apply_defaults();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(NetconfError::Invalid(errors))
        }
    }
}
