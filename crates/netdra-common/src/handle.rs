//! [`NetnsOps`] backed by a real network namespace.

use crate::error::Result;
use crate::netlink::{self, NetlinkSocket};
use crate::netns::{with_netns, NetNs};
use crate::ops::{NeighborSpec, NetnsOps, RouteSpec, RuleSpec};
use crate::sysctl::{self, TCP_L3MDEV_ACCEPT, UDP_L3MDEV_ACCEPT};
use netlink_packet_route::RouteNetlinkMessage;
use std::path::Path;
use tracing::debug;

/// Netlink handle whose socket lives in a target namespace.
///
/// The socket is opened on a worker thread inside the namespace, so using
/// the handle never moves the calling thread. Only
/// [`NetnsOps::enable_l3mdev_accept`] switches the calling thread, under
/// the process-wide switch guard.
pub struct NetlinkHandle {
    netns: NetNs,
    label: String,
    socket: NetlinkSocket,
}

impl NetlinkHandle {
    /// Open a handle for the namespace at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let netns = NetNs::from_path(path)?;
        let socket = netns.run_in(NetlinkSocket::new)?;
        let label = netns.path().display().to_string();
        debug!(netns = %label, "Opened netlink handle");
        Ok(Self {
            netns,
            label,
            socket,
        })
    }

    fn execute(
        &mut self,
        message: RouteNetlinkMessage,
        operation: &str,
    ) -> Result<Vec<RouteNetlinkMessage>> {
        let flags = netlink::flags_for(&message);
        self.socket.request(message, flags, operation)
    }
}

impl NetnsOps for NetlinkHandle {
    fn namespace(&self) -> &str {
        &self.label
    }

    fn link_index(&mut self, name: &str) -> Result<Option<u32>> {
        let operation = format!("link get {}", name);
        match self.execute(netlink::link_get_by_name(name), &operation) {
            Ok(replies) => Ok(netlink::link_index_from(&replies)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn add_vrf(&mut self, name: &str, table: u32) -> Result<()> {
        let operation = format!("vrf add {} table {}", name, table);
        self.execute(netlink::vrf_add(name, table), &operation)?;
        Ok(())
    }

    fn set_link_up(&mut self, index: u32) -> Result<()> {
        let operation = format!("link set {} up", index);
        self.execute(netlink::link_set_up(index), &operation)?;
        Ok(())
    }

    fn set_link_master(&mut self, index: u32, master_index: u32) -> Result<()> {
        let operation = format!("link set {} master {}", index, master_index);
        self.execute(netlink::link_set_master(index, master_index), &operation)?;
        Ok(())
    }

    fn add_route(&mut self, route: &RouteSpec) -> Result<()> {
        let operation = format!("route add {}", route);
        self.execute(netlink::route_add(route), &operation)?;
        Ok(())
    }

    fn add_rule(&mut self, rule: &RuleSpec) -> Result<()> {
        let operation = format!("rule add {}", rule);
        self.execute(netlink::rule_add(rule), &operation)?;
        Ok(())
    }

    fn add_neighbor(&mut self, neighbor: &NeighborSpec) -> Result<()> {
        let operation = format!("neighbor add {}", neighbor);
        self.execute(netlink::neighbor_add(neighbor), &operation)?;
        Ok(())
    }

    fn enable_l3mdev_accept(&mut self) -> Result<()> {
        with_netns(&self.netns, || {
            sysctl::set_sysctl(TCP_L3MDEV_ACCEPT, 1)?;
            sysctl::set_sysctl(UDP_L3MDEV_ACCEPT, 1)
        })
    }
}

impl std::fmt::Debug for NetlinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetlinkHandle")
            .field("netns", &self.label)
            .finish()
    }
}
