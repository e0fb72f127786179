//! Link-layer types shared by the inventory and the configuration engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Link-layer hardware address.
///
/// Accepts the IEEE 802 MAC-48, EUI-64 and 20-octet IP over InfiniBand
/// forms, with `:` or `-` separators (e.g. "00:11:22:33:44:55").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HardwareAddr(Vec<u8>);

impl HardwareAddr {
    /// Zero MAC address
    pub const ZERO: [u8; 6] = [0, 0, 0, 0, 0, 0];

    /// Wraps raw octets.
    pub fn new(octets: impl Into<Vec<u8>>) -> Self {
        Self(octets.into())
    }

    /// Parse from a separated hex string.
    pub fn parse(s: &str) -> Option<Self> {
        let sep = if s.contains(':') { ':' } else { '-' };
        let parts: Vec<&str> = s.split(sep).collect();
        if !matches!(parts.len(), 6 | 8 | 20) {
            return None;
        }
        let mut bytes = Vec::with_capacity(parts.len());
        for part in parts {
            if part.len() != 2 {
                return None;
            }
            bytes.push(u8::from_str_radix(part, 16).ok()?);
        }
        Some(Self(bytes))
    }

    /// Raw octets.
    pub fn octets(&self) -> &[u8] {
        &self.0
    }

    /// Check if this is an all-zero MAC-48 address
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == Self::ZERO
    }
}

impl fmt::Display for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for HardwareAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid hardware address '{}'", s))
    }
}

impl TryFrom<String> for HardwareAddr {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HardwareAddr> for String {
    fn from(value: HardwareAddr) -> Self {
        value.to_string()
    }
}
