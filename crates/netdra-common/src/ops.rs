//! Operations the configuration engine performs inside a namespace.
//!
//! [`NetnsOps`] is the seam between the engine and the kernel: the netlink
//! handle implements it for real namespaces, tests implement it with a
//! recorder.

use crate::error::Result;
use crate::types::HardwareAddr;
use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;

/// A resolved route ready to be programmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub destination: IpNet,
    pub gateway: Option<IpAddr>,
    pub source: Option<IpAddr>,
    /// Kernel `rtm_scope` value.
    pub scope: u8,
    /// Routing table; 0 means main.
    pub table: u32,
    pub link_index: u32,
}

impl fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.destination)?;
        if let Some(gw) = self.gateway {
            write!(f, " via {}", gw)?;
        }
        if let Some(src) = self.source {
            write!(f, " src {}", src)?;
        }
        write!(
            f,
            " dev {} scope {} table {}",
            self.link_index, self.scope, self.table
        )
    }
}

/// A resolved policy routing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub priority: Option<u32>,
    /// Lookup table; 0 means main.
    pub table: u32,
    pub source: Option<IpNet>,
    pub destination: Option<IpNet>,
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.priority {
            Some(p) => write!(f, "{}:", p)?,
            None => f.write_str("-:")?,
        }
        match self.source {
            Some(src) => write!(f, " from {}", src)?,
            None => f.write_str(" from all")?,
        }
        if let Some(dst) = self.destination {
            write!(f, " to {}", dst)?;
        }
        write!(f, " lookup {}", self.table)
    }
}

/// A resolved permanent neighbor entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborSpec {
    pub destination: IpAddr,
    pub hardware_addr: HardwareAddr,
    pub link_index: u32,
}

impl fmt::Display for NeighborSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lladdr {} dev {} PERMANENT",
            self.destination, self.hardware_addr, self.link_index
        )
    }
}

/// Kernel operations scoped to one network namespace.
///
/// Every `add_*` call is a create-exclusive request: an object that already
/// exists fails with `EEXIST`, which callers check with
/// [`crate::NetdraError::is_already_exists`].
pub trait NetnsOps {
    /// Human-readable identity of the namespace (its path).
    fn namespace(&self) -> &str;

    /// Interface index of `name`, or `None` if there is no such link.
    fn link_index(&mut self, name: &str) -> Result<Option<u32>>;

    /// Create a VRF device bound to `table`.
    fn add_vrf(&mut self, name: &str, table: u32) -> Result<()>;

    /// Set a link administratively up.
    fn set_link_up(&mut self, index: u32) -> Result<()>;

    /// Enslave a link to a master device.
    fn set_link_master(&mut self, index: u32, master_index: u32) -> Result<()>;

    fn add_route(&mut self, route: &RouteSpec) -> Result<()>;

    fn add_rule(&mut self, rule: &RuleSpec) -> Result<()>;

    fn add_neighbor(&mut self, neighbor: &NeighborSpec) -> Result<()>;

    /// Let sockets bound to the default VRF accept traffic arriving on any
    /// VRF (`tcp_l3mdev_accept` and `udp_l3mdev_accept`).
    fn enable_l3mdev_accept(&mut self) -> Result<()>;
}
