use std::net::Ipv6Addr;

use anyhow::Context;
use pnet::packet::icmpv6::ndp::{
    MutableNeighborSolicitPacket, MutableRouterSolicitPacket, NdpOption, NdpOptionTypes,
};
use pnet::packet::icmpv6::{Icmpv6Code, Icmpv6Types};
use pnet::util::MacAddr;

use crate::utils::{NS_LEN, RS_LEN};

/// Source link-layer address option: type 1, length 1 (one 8 byte unit).
fn source_ll_option(src_mac: MacAddr) -> NdpOption {
    NdpOption {
        option_type: NdpOptionTypes::SourceLLAddr,
        length: 1,
        data: src_mac.octets().to_vec(),
    }
}

/// Builds a 32 byte Neighbor Solicitation (type 135) for `target`, checksum left at zero.
pub fn create_neighbor_solicitation(target: Ipv6Addr, src_mac: MacAddr) -> anyhow::Result<Vec<u8>> {
    let mut buffer = vec![0u8; NS_LEN];
    {
        let mut ns = MutableNeighborSolicitPacket::new(&mut buffer)
            .context("failed to create neighbor solicitation packet")?;
        ns.set_icmpv6_type(Icmpv6Types::NeighborSolicit);
        ns.set_icmpv6_code(Icmpv6Code(0));
        ns.set_checksum(0);
        ns.set_reserved(0);
        ns.set_target_addr(target);
        ns.set_options(&[source_ll_option(src_mac)]);
    }
    Ok(buffer)
}

/// Builds a 16 byte Router Solicitation (type 133), checksum left at zero.
pub fn create_router_solicitation(src_mac: MacAddr) -> anyhow::Result<Vec<u8>> {
    let mut buffer = vec![0u8; RS_LEN];
    {
        let mut rs = MutableRouterSolicitPacket::new(&mut buffer)
            .context("failed to create router solicitation packet")?;
        rs.set_icmpv6_type(Icmpv6Types::RouterSolicit);
        rs.set_icmpv6_code(Icmpv6Code(0));
        rs.set_checksum(0);
        rs.set_reserved(0);
        rs.set_options(&[source_ll_option(src_mac)]);
    }
    Ok(buffer)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
