use std::net::Ipv6Addr;

use anyhow::Context;
use pnet::packet::icmpv6::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmpv6::{self, Icmpv6Code, Icmpv6Packet, Icmpv6Types};

use crate::icmp::{self, EchoSequence};
use crate::utils::ICMP_HDR_LEN;

/// Builds an ICMPv6 echo request (type 128). The checksum is left at zero; see [`fill_checksum`].
pub fn create_echo_request(
    sequence: &mut EchoSequence,
    data_size: usize,
    timestamp_ms: u64,
) -> anyhow::Result<Vec<u8>> {
    let mut buffer = vec![0u8; ICMP_HDR_LEN + data_size];
    {
        let mut icmp = MutableEchoRequestPacket::new(&mut buffer)
            .context("failed to create echo request packet")?;
        icmp.set_icmpv6_type(Icmpv6Types::EchoRequest);
        icmp.set_icmpv6_code(Icmpv6Code(0));
        icmp.set_identifier(sequence.identifier());
        icmp.set_sequence_number(sequence.advance());
        icmp.set_payload(&icmp::echo_payload(data_size, timestamp_ms));
        icmp.set_checksum(0);
    }
    Ok(buffer)
}

pub fn has_checksum(packet: &[u8]) -> bool {
    packet.len() >= 4 && (packet[2] != 0 || packet[3] != 0)
}

/// Computes the pseudo-header checksum of an ICMPv6 message travelling `src` -> `dst`
/// and writes it at offset 2.
pub fn fill_checksum(packet: &mut [u8], src: Ipv6Addr, dst: Ipv6Addr) -> anyhow::Result<()> {
    if packet.len() < ICMP_HDR_LEN {
        anyhow::bail!("ICMPv6 message too short for a checksum ({} bytes)", packet.len());
    }
    packet[2..4].copy_from_slice(&[0, 0]);
    let csm = {
        let view = Icmpv6Packet::new(&*packet).context("failed to create ICMPv6 packet")?;
        icmpv6::checksum(&view, &src, &dst)
    };
    packet[2..4].copy_from_slice(&csm.to_be_bytes());
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
