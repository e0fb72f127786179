//! Defaulting, including VRF table allocation.

use crate::types::{NetworkConfig, VrfConfig};

/// First routing table reserved for derived VRF tables.
pub const VRF_TABLE_OFFSET: u32 = 1000;

/// Number of derived VRF tables.
const VRF_TABLE_RANGE: u32 = 1000;

/// FNV-1a 32-bit
fn fnv1a_32(bytes: &[u8]) -> u32 {
    const FNV_PRIME: u32 = 16777619;
    const FNV_OFFSET_BASIS: u32 = 2166136261;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Routing table for a VRF named `name`.
///
/// Stable across nodes and processes, so every interface joining the same
/// VRF lands in the same table. Distinct names may collide.
pub fn vrf_table_for(name: &str) -> u32 {
    fnv1a_32(name.as_bytes()) % VRF_TABLE_RANGE + VRF_TABLE_OFFSET
}

impl VrfConfig {
    pub fn apply_defaults(&mut self) {
        if self.table.is_none() && !self.name.is_empty() {
            // At most 1999, always fits.
            self.table = i32::try_from(vrf_table_for(&self.name)).ok();
        }
    }
}

impl NetworkConfig {
    pub fn apply_defaults(&mut self) {
        if let Some(vrf) = self.interface.vrf.as_mut() {
            vrf.apply_defaults();
        }
    }
}
