//! rtnetlink request/acknowledge plumbing and message builders.
//!
//! Every request is sent with `NLM_F_ACK`, so the kernel always terminates
//! the exchange with either an acknowledgement, an error, or (for dumps)
//! `NLMSG_DONE`. Kernel errors come back as negative errno values and are
//! surfaced as [`NetdraError::Netlink`] carrying the raw OS error.

use crate::error::{NetdraError, Result};
use crate::ops::{NeighborSpec, RouteSpec, RuleSpec};
use netlink_packet_core::{
    NetlinkHeader, NetlinkMessage, NetlinkPayload, NLM_F_ACK, NLM_F_CREATE, NLM_F_EXCL,
    NLM_F_REQUEST,
};
use netlink_packet_route::link::{
    InfoData, InfoKind, InfoVrf, LinkAttribute, LinkFlags, LinkInfo, LinkMessage,
};
use netlink_packet_route::neighbour::{
    NeighbourAddress, NeighbourAttribute, NeighbourMessage, NeighbourState,
};
use netlink_packet_route::route::{
    RouteAddress, RouteAttribute, RouteMessage, RouteProtocol, RouteScope, RouteType,
};
use netlink_packet_route::rule::{RuleAction, RuleAttribute, RuleMessage};
use netlink_packet_route::{AddressFamily, RouteNetlinkMessage};
use netlink_sys::{protocols::NETLINK_ROUTE, Socket, SocketAddr};
use std::io;
use std::net::IpAddr;
use tracing::trace;

/// Kernel main routing table.
pub const RT_TABLE_MAIN: u32 = 254;

/// Header value meaning "look at the table attribute".
const RT_TABLE_UNSPEC: u8 = 0;

/// Flags for requests that create a new object.
fn create_flags() -> u16 {
    NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL
}

/// Flags for requests that read or modify an existing object.
fn request_flags() -> u16 {
    NLM_F_REQUEST | NLM_F_ACK
}

/// A blocking `NETLINK_ROUTE` socket bound to the namespace it was created in.
pub struct NetlinkSocket {
    socket: Socket,
    sequence: u32,
}

impl NetlinkSocket {
    /// Open and connect a route socket in the calling thread's namespace.
    pub fn new() -> Result<Self> {
        let mut socket = Socket::new(NETLINK_ROUTE)
            .map_err(|e| NetdraError::netlink("socket open", e))?;
        socket
            .bind_auto()
            .map_err(|e| NetdraError::netlink("socket bind", e))?;
        socket
            .connect(&SocketAddr::new(0, 0))
            .map_err(|e| NetdraError::netlink("socket connect", e))?;
        Ok(Self {
            socket,
            sequence: 0,
        })
    }

    /// Send one request and collect the kernel's replies until it is
    /// acknowledged.
    pub fn request(
        &mut self,
        message: RouteNetlinkMessage,
        flags: u16,
        operation: &str,
    ) -> Result<Vec<RouteNetlinkMessage>> {
        self.sequence = self.sequence.wrapping_add(1);
        let sequence = self.sequence;

        let mut header = NetlinkHeader::default();
        header.flags = flags;
        header.sequence_number = sequence;

        let mut packet = NetlinkMessage::new(header, NetlinkPayload::InnerMessage(message));
        packet.finalize();
        let mut buf = vec![0u8; packet.buffer_len()];
        packet.serialize(&mut buf);

        self.socket
            .send(&buf, 0)
            .map_err(|e| NetdraError::netlink(operation, e))?;
        trace!(operation, sequence, "Sent netlink request");

        let mut replies = Vec::new();
        loop {
            let (data, _) = self
                .socket
                .recv_from_full()
                .map_err(|e| NetdraError::netlink(operation, e))?;

            let mut offset = 0;
            while offset < data.len() {
                let msg = NetlinkMessage::<RouteNetlinkMessage>::deserialize(&data[offset..])
                    .map_err(|e| NetdraError::protocol(operation, e.to_string()))?;
                let length = msg.header.length as usize;
                if length == 0 {
                    return Err(NetdraError::protocol(operation, "zero-length message"));
                }
                offset += length;
                offset = (offset + 3) & !3;

                if msg.header.sequence_number != sequence {
                    trace!(
                        operation,
                        got = msg.header.sequence_number,
                        "Skipping reply for another request"
                    );
                    continue;
                }

                match msg.payload {
                    NetlinkPayload::Done(_) => return Ok(replies),
                    NetlinkPayload::Error(err) => {
                        return match err.code {
                            None => Ok(replies),
                            Some(code) => Err(NetdraError::netlink(
                                operation,
                                io::Error::from_raw_os_error(-code.get()),
                            )),
                        };
                    }
                    NetlinkPayload::InnerMessage(inner) => replies.push(inner),
                    _ => {}
                }
            }
        }
    }
}

fn address_family(ip: &IpAddr) -> AddressFamily {
    match ip {
        IpAddr::V4(_) => AddressFamily::Inet,
        IpAddr::V6(_) => AddressFamily::Inet6,
    }
}

fn route_address(ip: IpAddr) -> RouteAddress {
    match ip {
        IpAddr::V4(v4) => RouteAddress::Inet(v4),
        IpAddr::V6(v6) => RouteAddress::Inet6(v6),
    }
}

/// Split a table id between the 8-bit header field and the 32-bit attribute.
fn header_table(table: u32) -> u8 {
    u8::try_from(table).unwrap_or(RT_TABLE_UNSPEC)
}

/// Table 0 means "unspecified", which the kernel resolves to main.
fn effective_table(table: u32) -> u32 {
    if table == 0 {
        RT_TABLE_MAIN
    } else {
        table
    }
}

/// `RTM_GETLINK` by interface name.
pub fn link_get_by_name(name: &str) -> RouteNetlinkMessage {
    let mut msg = LinkMessage::default();
    msg.attributes.push(LinkAttribute::IfName(name.to_string()));
    RouteNetlinkMessage::GetLink(msg)
}

/// `RTM_NEWLINK` creating a VRF device bound to `table`.
pub fn vrf_add(name: &str, table: u32) -> RouteNetlinkMessage {
    let mut msg = LinkMessage::default();
    msg.attributes.push(LinkAttribute::IfName(name.to_string()));
    msg.attributes.push(LinkAttribute::LinkInfo(vec![
        LinkInfo::Kind(InfoKind::Vrf),
        LinkInfo::Data(InfoData::Vrf(vec![InfoVrf::TableId(table)])),
    ]));
    RouteNetlinkMessage::NewLink(msg)
}

/// `RTM_SETLINK` raising the administrative state of a link.
pub fn link_set_up(index: u32) -> RouteNetlinkMessage {
    let mut msg = LinkMessage::default();
    msg.header.index = index;
    msg.header.flags = LinkFlags::Up;
    msg.header.change_mask = LinkFlags::Up;
    RouteNetlinkMessage::SetLink(msg)
}

/// `RTM_SETLINK` enslaving a link to a master device.
pub fn link_set_master(index: u32, master_index: u32) -> RouteNetlinkMessage {
    let mut msg = LinkMessage::default();
    msg.header.index = index;
    msg.attributes.push(LinkAttribute::Controller(master_index));
    RouteNetlinkMessage::SetLink(msg)
}

/// `RTM_NEWROUTE` for a unicast route.
pub fn route_add(route: &RouteSpec) -> RouteNetlinkMessage {
    let mut msg = RouteMessage::default();
    let table = effective_table(route.table);
    let destination = route.destination.network();

    msg.header.address_family = address_family(&destination);
    msg.header.destination_prefix_length = route.destination.prefix_len();
    msg.header.table = header_table(table);
    msg.header.protocol = RouteProtocol::Boot;
    msg.header.scope = RouteScope::from(route.scope);
    msg.header.kind = RouteType::Unicast;

    msg.attributes.push(RouteAttribute::Table(table));
    msg.attributes
        .push(RouteAttribute::Destination(route_address(destination)));
    if let Some(gateway) = route.gateway {
        msg.attributes
            .push(RouteAttribute::Gateway(route_address(gateway)));
    }
    if let Some(source) = route.source {
        msg.attributes
            .push(RouteAttribute::PrefSource(route_address(source)));
    }
    msg.attributes.push(RouteAttribute::Oif(route.link_index));
    RouteNetlinkMessage::NewRoute(msg)
}

/// `RTM_NEWRULE` with a lookup action.
pub fn rule_add(rule: &RuleSpec) -> RouteNetlinkMessage {
    let mut msg = RuleMessage::default();
    let table = effective_table(rule.table);

    let family = rule
        .source
        .or(rule.destination)
        .map(|net| address_family(&net.network()))
        .unwrap_or(AddressFamily::Inet);
    msg.header.family = family;
    msg.header.table = header_table(table);
    msg.header.action = RuleAction::ToTable;

    msg.attributes.push(RuleAttribute::Table(table));
    if let Some(priority) = rule.priority {
        msg.attributes.push(RuleAttribute::Priority(priority));
    }
    if let Some(source) = rule.source {
        msg.header.src_len = source.prefix_len();
        msg.attributes
            .push(RuleAttribute::Source(source.network()));
    }
    if let Some(destination) = rule.destination {
        msg.header.dst_len = destination.prefix_len();
        msg.attributes
            .push(RuleAttribute::Destination(destination.network()));
    }
    RouteNetlinkMessage::NewRule(msg)
}

/// `RTM_NEWNEIGH` for a permanent entry.
pub fn neighbor_add(neighbor: &NeighborSpec) -> RouteNetlinkMessage {
    let mut msg = NeighbourMessage::default();
    msg.header.family = address_family(&neighbor.destination);
    msg.header.ifindex = neighbor.link_index;
    msg.header.state = NeighbourState::Permanent;

    let destination = match neighbor.destination {
        IpAddr::V4(v4) => NeighbourAddress::Inet(v4),
        IpAddr::V6(v6) => NeighbourAddress::Inet6(v6),
    };
    msg.attributes
        .push(NeighbourAttribute::Destination(destination));
    msg.attributes.push(NeighbourAttribute::LinkLocalAddress(
        neighbor.hardware_addr.octets().to_vec(),
    ));
    RouteNetlinkMessage::NewNeighbour(msg)
}

/// Flags used for the given builder output.
pub fn flags_for(message: &RouteNetlinkMessage) -> u16 {
    match message {
        RouteNetlinkMessage::NewLink(_)
        | RouteNetlinkMessage::NewRoute(_)
        | RouteNetlinkMessage::NewRule(_)
        | RouteNetlinkMessage::NewNeighbour(_) => create_flags(),
        _ => request_flags(),
    }
}

/// Interface index from a `RTM_NEWLINK` reply.
pub fn link_index_from(replies: &[RouteNetlinkMessage]) -> Option<u32> {
    replies.iter().find_map(|reply| match reply {
        RouteNetlinkMessage::NewLink(link) => Some(link.header.index),
        _ => None,
    })
}
