//! Validation of a defaulted [`NetworkConfig`].
//!
//! Every problem is reported, not just the first; each error names the
//! offending field by its JSON path (e.g. `routes[2].gateway`).

use crate::types::{
    InterfaceConfig, NeighborConfig, NetworkConfig, RouteConfig, RuleConfig, VrfConfig,
    RT_SCOPE_LINK, RT_SCOPE_UNIVERSE,
};
use ipnet::IpNet;
use netdra_common::{ErrorList, HardwareAddr, NetdraError};
use std::net::IpAddr;

pub const MIN_MTU: i32 = 68;
pub const MAX_INTERFACE_NAME_LEN: usize = 15;
pub const MAX_RULE_PRIORITY: i32 = 32767;

/// Routing tables the kernel reserves (default, main, local).
const RESERVED_TABLES: [i32; 3] = [253, 254, 255];

fn is_ip(s: &str) -> bool {
    s.parse::<IpAddr>().is_ok()
}

fn is_cidr(s: &str) -> bool {
    s.parse::<IpNet>().is_ok()
}

fn validate_interface_name(name: &str, field: &str, errors: &mut ErrorList) {
    if name.is_empty() {
        return;
    }
    if name.len() > MAX_INTERFACE_NAME_LEN {
        errors.push(NetdraError::invalid(
            field,
            format!(
                "name '{}' exceeds maximum length of {} characters",
                name, MAX_INTERFACE_NAME_LEN
            ),
        ));
    }
    if name.contains('/') {
        errors.push(NetdraError::invalid(
            field,
            format!("name '{}' cannot contain '/'", name),
        ));
    }
    if name.chars().any(char::is_whitespace) {
        errors.push(NetdraError::invalid(
            field,
            format!("name '{}' cannot contain whitespace", name),
        ));
    }
    if name == "." || name == ".." {
        errors.push(NetdraError::invalid(
            field,
            format!("name '{}' cannot be '.' or '..'", name),
        ));
    }
    for c in name.chars() {
        let allowed = c.is_alphanumeric() || matches!(c, '-' | '_' | '.');
        // '/' and whitespace already have their own message.
        if !allowed && c != '/' && !c.is_whitespace() {
            errors.push(NetdraError::invalid(
                field,
                format!(
                    "name '{}' contains invalid character '{}'; only letters, digits, '-', '_', '.' are allowed",
                    name, c
                ),
            ));
        }
    }
}

fn validate_positive(value: Option<i32>, field: &str, errors: &mut ErrorList) {
    if let Some(v) = value.filter(|v| *v <= 0) {
        errors.push(NetdraError::invalid(
            field,
            format!("must be positive, got {}", v),
        ));
    }
}

fn validate_vrf(vrf: &VrfConfig, field: &str, errors: &mut ErrorList) {
    if vrf.name.is_empty() {
        errors.push(NetdraError::invalid(format!("{}.name", field), "cannot be empty"));
    }
    if let Some(table) = vrf.table {
        let field = format!("{}.table", field);
        if table <= 0 {
            errors.push(NetdraError::invalid(
                &field,
                format!("must be a positive integer, got {}", table),
            ));
        }
        if RESERVED_TABLES.contains(&table) {
            errors.push(NetdraError::invalid(
                &field,
                format!("cannot use reserved table ID {}", table),
            ));
        }
    }
}

fn validate_interface(cfg: &InterfaceConfig, field: &str, errors: &mut ErrorList) {
    validate_interface_name(&cfg.name, &format!("{}.name", field), errors);

    for (i, addr) in cfg.addresses.iter().enumerate() {
        if !is_cidr(addr) {
            errors.push(NetdraError::invalid(
                format!("{}.addresses[{}]", field, i),
                format!("invalid IP CIDR format '{}'", addr),
            ));
        }
    }

    if cfg.dhcp == Some(true) && !cfg.addresses.is_empty() {
        errors.push(NetdraError::invalid(
            field,
            "dhcp and addresses are mutually exclusive",
        ));
    }

    if let Some(mtu) = cfg.mtu.filter(|m| *m < MIN_MTU) {
        errors.push(NetdraError::invalid(
            format!("{}.mtu", field),
            format!("must be at least {}, got {}", MIN_MTU, mtu),
        ));
    }

    if let Some(mac) = cfg.hardware_addr.as_deref() {
        if HardwareAddr::parse(mac).is_none() {
            errors.push(NetdraError::invalid(
                format!("{}.hardwareAddress", field),
                format!("invalid hardware address format '{}'", mac),
            ));
        }
    }

    validate_positive(cfg.gso_max_size, &format!("{}.gsoMaxSize", field), errors);
    validate_positive(cfg.gro_max_size, &format!("{}.groMaxSize", field), errors);
    validate_positive(cfg.gso_ipv4_max_size, &format!("{}.gsov4MaxSize", field), errors);
    validate_positive(cfg.gro_ipv4_max_size, &format!("{}.grov4MaxSize", field), errors);

    if let Some(vrf) = &cfg.vrf {
        validate_vrf(vrf, &format!("{}.vrf", field), errors);
    }
}

fn validate_route(route: &RouteConfig, field: &str, errors: &mut ErrorList) {
    if route.destination.is_empty() {
        errors.push(NetdraError::invalid(
            format!("{}.destination", field),
            "cannot be empty",
        ));
    } else if !is_cidr(&route.destination) && !is_ip(&route.destination) {
        errors.push(NetdraError::invalid(
            format!("{}.destination", field),
            format!("invalid IP or CIDR format '{}'", route.destination),
        ));
    }

    if route.scope != RT_SCOPE_UNIVERSE && route.scope != RT_SCOPE_LINK {
        errors.push(NetdraError::invalid(
            format!("{}.scope", field),
            format!(
                "invalid scope '{}', only Link ({}) or Universe ({}) allowed",
                route.scope, RT_SCOPE_LINK, RT_SCOPE_UNIVERSE
            ),
        ));
    }

    if !route.gateway.is_empty() {
        if !is_ip(&route.gateway) {
            errors.push(NetdraError::invalid(
                format!("{}.gateway", field),
                format!("invalid IP address format '{}'", route.gateway),
            ));
        }
    } else if route.scope != RT_SCOPE_LINK {
        errors.push(NetdraError::invalid(
            format!("{}.gateway", field),
            "must be specified for Universe scope routes",
        ));
    }

    if !route.source.is_empty() && !is_ip(&route.source) {
        errors.push(NetdraError::invalid(
            format!("{}.source", field),
            format!("invalid IP address format '{}'", route.source),
        ));
    }

    if route.table < 0 {
        errors.push(NetdraError::invalid(
            format!("{}.table", field),
            format!("must be a non-negative integer, got {}", route.table),
        ));
    }
}

fn validate_rule(rule: &RuleConfig, field: &str, errors: &mut ErrorList) {
    if !(0..=MAX_RULE_PRIORITY).contains(&rule.priority) {
        errors.push(NetdraError::invalid(
            format!("{}.priority", field),
            format!(
                "must be an integer between 0 and {}, got {}",
                MAX_RULE_PRIORITY, rule.priority
            ),
        ));
    }
    if rule.table < 0 {
        errors.push(NetdraError::invalid(
            format!("{}.table", field),
            format!("must be a non-negative integer, got {}", rule.table),
        ));
    }
    for (name, value) in [("source", &rule.source), ("destination", &rule.destination)] {
        if !value.is_empty() && !is_cidr(value) {
            errors.push(NetdraError::invalid(
                format!("{}.{}", field, name),
                format!("invalid CIDR format '{}'", value),
            ));
        }
    }
}

fn validate_neighbor(neighbor: &NeighborConfig, field: &str, errors: &mut ErrorList) {
    if neighbor.destination.is_empty() {
        errors.push(NetdraError::invalid(
            format!("{}.destination", field),
            "cannot be empty",
        ));
    } else if !is_ip(&neighbor.destination) {
        errors.push(NetdraError::invalid(
            format!("{}.destination", field),
            format!("invalid IP address format '{}'", neighbor.destination),
        ));
    }

    if neighbor.hardware_addr.is_empty() {
        errors.push(NetdraError::invalid(
            format!("{}.hardwareAddress", field),
            "cannot be empty",
        ));
    } else if HardwareAddr::parse(&neighbor.hardware_addr).is_none() {
        errors.push(NetdraError::invalid(
            format!("{}.hardwareAddress", field),
            format!("invalid hardware address format '{}'", neighbor.hardware_addr),
        ));
    }
}

impl NetworkConfig {
    /// Check every invariant of a defaulted config.
    pub fn validate(&self) -> ErrorList {
        let mut errors = ErrorList::new();

        validate_interface(&self.interface, "interface", &mut errors);

        for (i, route) in self.routes.iter().enumerate() {
            validate_route(route, &format!("routes[{}]", i), &mut errors);
        }

        if !self.rules.is_empty() {
            if self.interface.vrf.is_some() {
                errors.push(NetdraError::invalid(
                    "rules",
                    "rules are not supported when VRF is enabled",
                ));
            } else {
                for (i, rule) in self.rules.iter().enumerate() {
                    validate_rule(rule, &format!("rules[{}]", i), &mut errors);
                }
            }
        }

        for (i, neighbor) in self.neighbors.iter().enumerate() {
            validate_neighbor(neighbor, &format!("neighbors[{}]", i), &mut errors);
        }

        errors
    }
}
