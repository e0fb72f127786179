//! Typed, namespaced device attributes.
//!
//! Keys are qualified as `<domain>/<name>` (e.g. `gce.dra.net/machineType`),
//! so attributes from different providers and from local discovery never
//! collide when merged into one map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute key of the form `<domain>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedName(String);

impl QualifiedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QualifiedName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceAttribute {
    String(String),
    Int(i64),
}

impl DeviceAttribute {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DeviceAttribute::String(s) => Some(s),
            DeviceAttribute::Int(_) => None,
        }
    }
}

impl From<&str> for DeviceAttribute {
    fn from(value: &str) -> Self {
        DeviceAttribute::String(value.to_string())
    }
}

impl From<String> for DeviceAttribute {
    fn from(value: String) -> Self {
        DeviceAttribute::String(value)
    }
}

impl From<i64> for DeviceAttribute {
    fn from(value: i64) -> Self {
        DeviceAttribute::Int(value)
    }
}

/// Attribute set published for one device.
pub type DeviceAttributes = BTreeMap<QualifiedName, DeviceAttribute>;
