use std::net::Ipv6Addr;

use anyhow::Context;
use pnet::packet::ethernet::EtherTypes;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv6::MutableIpv6Packet;
use pnet::util::MacAddr;

use crate::ethernet;
use crate::utils::{ETH_HDR_LEN, IP_V6_HDR_LEN};

/// Hop limit required on neighbor discovery messages (RFC 4861).
pub const NDP_HOP_LIMIT: u8 = 255;

pub struct Ipv6Route {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub src_addr: Ipv6Addr,
    pub dst_addr: Ipv6Addr,
    pub hop_limit: u8,
}

fn create_ipv6_header(
    buf: &mut [u8],
    route: &Ipv6Route,
    payload_len: usize,
) -> anyhow::Result<()> {
    let payload_len = u16::try_from(payload_len).context("IPv6 payload too large")?;
    let mut pkt = MutableIpv6Packet::new(&mut buf[ETH_HDR_LEN..ETH_HDR_LEN + IP_V6_HDR_LEN])
        .context("creating ipv6 packet")?;
    pkt.set_version(6);
    pkt.set_traffic_class(0);
    pkt.set_flow_label(rand::random::<u32>() & 0x000f_ffff);
    pkt.set_payload_length(payload_len);
    pkt.set_next_header(IpNextHeaderProtocols::Icmpv6);
    pkt.set_hop_limit(route.hop_limit);
    pkt.set_source(route.src_addr);
    pkt.set_destination(route.dst_addr);
    Ok(())
}

/// Wraps an ICMPv6 message in IPv6 and Ethernet headers for link-layer injection.
pub fn frame_icmpv6(route: &Ipv6Route, icmpv6: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut frame = vec![0u8; ETH_HDR_LEN + IP_V6_HDR_LEN + icmpv6.len()];
    ethernet::make_header(&mut frame, route.src_mac, route.dst_mac, EtherTypes::Ipv6)?;
    create_ipv6_header(&mut frame, route, icmpv6.len())?;
    frame[ETH_HDR_LEN + IP_V6_HDR_LEN..].copy_from_slice(icmpv6);
    Ok(frame)
}
