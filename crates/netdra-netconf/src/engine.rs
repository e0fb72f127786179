//! Namespace configuration engine.
//!
//! Applies the kernel-side state of a [`NetworkConfig`] to one device in
//! one namespace, in this order:
//!
//! 1. VRF: create the device if absent, bring it up, enslave the target,
//!    enable `l3mdev` accept sysctls.
//! 2. Routes, link scope before universe scope. Once the device is a VRF
//!    member every route goes to the VRF table.
//! 3. Static neighbors (permanent).
//! 4. Policy rules.
//!
//! A missing device aborts the whole call. Anything else is collected per
//! entry and the remaining entries are still attempted. Entries that
//! already exist count as applied, so re-running the same config is the
//! recovery path after a partial failure; nothing is rolled back.

use crate::error::{NetconfError, Result};
use crate::types::{NeighborConfig, NetworkConfig, RouteConfig, RuleConfig, VrfConfig};
use ipnet::IpNet;
use netdra_common::{
    ErrorList, HardwareAddr, NeighborSpec, NetdraError, NetnsOps, RouteSpec, RuleSpec,
};
use std::net::IpAddr;
use tracing::{debug, info, instrument, warn};

/// Treat "already exists" as success.
fn tolerate_exists(result: netdra_common::Result<()>) -> netdra_common::Result<()> {
    match result {
        Err(e) if e.is_already_exists() => Ok(()),
        other => other,
    }
}

fn table_id(value: i32, field: &str) -> netdra_common::Result<u32> {
    u32::try_from(value)
        .map_err(|_| NetdraError::invalid(field, format!("table {} out of range", value)))
}

/// CIDR, or a bare address as a host prefix. Host bits are cleared.
fn parse_destination(s: &str) -> Option<IpNet> {
    s.parse::<IpNet>()
        .ok()
        .or_else(|| s.parse::<IpAddr>().ok().map(IpNet::from))
        .map(|net| net.trunc())
}

fn parse_optional_ip(s: &str, field: &str) -> netdra_common::Result<Option<IpAddr>> {
    if s.is_empty() {
        return Ok(None);
    }
    s.parse()
        .map(Some)
        .map_err(|_| NetdraError::invalid(field, format!("invalid IP address '{}'", s)))
}

fn parse_optional_cidr(s: &str, field: &str) -> netdra_common::Result<Option<IpNet>> {
    if s.is_empty() {
        return Ok(None);
    }
    s.parse::<IpNet>()
        .map(|net| Some(net.trunc()))
        .map_err(|_| NetdraError::invalid(field, format!("invalid CIDR '{}'", s)))
}

/// Create or reuse the VRF, then enslave the device to it. Returns the
/// VRF's table once the device is a member.
fn enslave_to_vrf<H: NetnsOps + ?Sized>(
    handle: &mut H,
    ifname: &str,
    link_index: u32,
    vrf: &VrfConfig,
) -> netdra_common::Result<u32> {
    if vrf.name.is_empty() {
        return Err(NetdraError::invalid("vrf.name", "not specified"));
    }
    let table = match vrf.table {
        Some(t) => table_id(t, "vrf.table")?,
        None => return Err(NetdraError::invalid("vrf.table", "not specified")),
    };

    let vrf_index = match handle.link_index(&vrf.name)? {
        Some(index) => {
            debug!(vrf = %vrf.name, index, "Reusing existing VRF");
            index
        }
        None => {
            tolerate_exists(handle.add_vrf(&vrf.name, table))?;
            handle
                .link_index(&vrf.name)?
                .ok_or_else(|| NetdraError::LinkNotFound {
                    name: vrf.name.clone(),
                    namespace: handle.namespace().to_string(),
                })?
        }
    };

    handle.set_link_up(vrf_index)?;
    handle.set_link_master(link_index, vrf_index)?;

    info!(vrf = %vrf.name, table, ifname, "Enslaved interface to VRF");
    Ok(table)
}

fn route_spec(
    route: &RouteConfig,
    field: &str,
    link_index: u32,
    vrf_table: Option<u32>,
) -> netdra_common::Result<RouteSpec> {
    let destination = parse_destination(&route.destination).ok_or_else(|| {
        NetdraError::invalid(
            format!("{}.destination", field),
            format!("invalid IP or CIDR '{}'", route.destination),
        )
    })?;
    let gateway = parse_optional_ip(&route.gateway, &format!("{}.gateway", field))?;
    let source = parse_optional_ip(&route.source, &format!("{}.source", field))?;
    let table = match vrf_table {
        Some(table) => table,
        None => table_id(route.table, &format!("{}.table", field))?,
    };

    Ok(RouteSpec {
        destination,
        gateway,
        source,
        scope: route.scope,
        table,
        link_index,
    })
}

fn apply_routes<H: NetnsOps + ?Sized>(
    handle: &mut H,
    ifname: &str,
    link_index: u32,
    routes: &[RouteConfig],
    vrf_table: Option<u32>,
    errors: &mut ErrorList,
) {
    // Link scope (253) sorts before universe (0): a gateway is only
    // reachable once its link route exists. The sort is stable.
    let mut ordered: Vec<(usize, &RouteConfig)> = routes.iter().enumerate().collect();
    ordered.sort_by(|(_, a), (_, b)| b.scope.cmp(&a.scope));

    for (i, route) in ordered {
        let field = format!("routes[{}]", i);
        let spec = match route_spec(route, &field, link_index, vrf_table) {
            Ok(spec) => spec,
            Err(e) => {
                warn!(ifname, error = %e, "Skipping route");
                errors.push(e);
                continue;
            }
        };
        match tolerate_exists(handle.add_route(&spec)) {
            Ok(()) => debug!(ifname, route = %spec, "Route applied"),
            Err(e) => {
                warn!(ifname, route = %spec, error = %e, "Failed to add route");
                errors.push(e);
            }
        }
    }
}

fn apply_neighbors<H: NetnsOps + ?Sized>(
    handle: &mut H,
    ifname: &str,
    link_index: u32,
    neighbors: &[NeighborConfig],
    errors: &mut ErrorList,
) {
    for (i, neighbor) in neighbors.iter().enumerate() {
        let Ok(destination) = neighbor.destination.parse::<IpAddr>() else {
            errors.push(NetdraError::invalid(
                format!("neighbors[{}].destination", i),
                format!("invalid ip address: {}", neighbor.destination),
            ));
            continue;
        };
        let Some(hardware_addr) = HardwareAddr::parse(&neighbor.hardware_addr) else {
            errors.push(NetdraError::invalid(
                format!("neighbors[{}].hardwareAddress", i),
                format!("invalid mac address: {}", neighbor.hardware_addr),
            ));
            continue;
        };

        let spec = NeighborSpec {
            destination,
            hardware_addr,
            link_index,
        };
        match tolerate_exists(handle.add_neighbor(&spec)) {
            Ok(()) => debug!(ifname, neighbor = %spec, "Neighbor applied"),
            Err(e) => {
                warn!(ifname, neighbor = %spec, error = %e, "Failed to add permanent neighbor");
                errors.push(e);
            }
        }
    }
}

fn rule_spec(rule: &RuleConfig, field: &str) -> netdra_common::Result<RuleSpec> {
    let priority = u32::try_from(rule.priority).map_err(|_| {
        NetdraError::invalid(
            format!("{}.priority", field),
            format!("priority {} out of range", rule.priority),
        )
    })?;
    Ok(RuleSpec {
        priority: Some(priority),
        table: table_id(rule.table, &format!("{}.table", field))?,
        source: parse_optional_cidr(&rule.source, &format!("{}.source", field))?,
        destination: parse_optional_cidr(&rule.destination, &format!("{}.destination", field))?,
    })
}

fn apply_rules<H: NetnsOps + ?Sized>(handle: &mut H, rules: &[RuleConfig], errors: &mut ErrorList) {
    for (i, rule) in rules.iter().enumerate() {
        let spec = match rule_spec(rule, &format!("rules[{}]", i)) {
            Ok(spec) => spec,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        match tolerate_exists(handle.add_rule(&spec)) {
            Ok(()) => debug!(rule = %spec, "Rule applied"),
            Err(e) => {
                warn!(rule = %spec, error = %e, "Failed to add rule");
                errors.push(e);
            }
        }
    }
}

/// Apply `config` to `ifname` through `handle`.
///
/// Returns [`NetconfError::Kernel`] if the device cannot be resolved, and
/// [`NetconfError::Apply`] with every per-entry failure otherwise.
#[instrument(skip(handle, config))]
pub fn configure<H: NetnsOps + ?Sized>(
    handle: &mut H,
    ifname: &str,
    config: &NetworkConfig,
) -> Result<()> {
    let link_index = handle
        .link_index(ifname)?
        .ok_or_else(|| NetdraError::LinkNotFound {
            name: ifname.to_string(),
            namespace: handle.namespace().to_string(),
        })?;

    info!(
        ifname,
        netns = handle.namespace(),
        routes = config.routes.len(),
        rules = config.rules.len(),
        neighbors = config.neighbors.len(),
        vrf = config.interface.vrf.as_ref().map(|v| v.name.as_str()),
        "Applying network config"
    );

    let mut errors = ErrorList::new();

    // Routes follow the device into the VRF table only once it is a member;
    // otherwise they keep their configured table.
    let mut vrf_table = None;
    if let Some(vrf) = &config.interface.vrf {
        match enslave_to_vrf(handle, ifname, link_index, vrf) {
            Ok(table) => {
                vrf_table = Some(table);
                if let Err(e) = handle.enable_l3mdev_accept() {
                    warn!(ifname, vrf = %vrf.name, error = %e, "Failed to enable l3mdev accept");
                    errors.push(e);
                }
            }
            Err(e) => {
                warn!(ifname, vrf = %vrf.name, error = %e, "Failed to apply VRF");
                errors.push(e);
            }
        }
    }

    apply_routes(handle, ifname, link_index, &config.routes, vrf_table, &mut errors);
    apply_neighbors(handle, ifname, link_index, &config.neighbors, &mut errors);
    apply_rules(handle, &config.rules, &mut errors);

    if errors.is_empty() {
        info!(ifname, "Network config applied");
    } else {
        warn!(ifname, failures = errors.len(), "Network config partially applied");
    }
    errors.into_result().map_err(NetconfError::Apply)
}

/// Open the namespace at `netns_path` and apply `config` to `ifname`.
///
/// The namespace and netlink handles are released when this returns.
#[cfg(target_os = "linux")]
#[instrument(skip(config))]
pub fn apply_network_config(netns_path: &str, ifname: &str, config: &NetworkConfig) -> Result<()> {
    let mut handle = netdra_common::NetlinkHandle::open(netns_path)?;
    configure(&mut handle, ifname, config)
}
