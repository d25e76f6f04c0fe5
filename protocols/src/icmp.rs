use anyhow::Context;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpTypes, MutableIcmpPacket};
use crate::utils::{ECHO_TIMESTAMP_LEN, ICMP_HDR_LEN};

/// Identifier and running sequence number shared by the echo requests of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoSequence {
    identifier: u16,
    next: u16,
}

impl EchoSequence {
    pub fn new(identifier: u16, start: u16) -> Self {
        Self {
            identifier,
            next: start,
        }
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Hands out the current sequence number and moves on, wrapping after 65535.
    pub fn advance(&mut self) -> u16 {
        let current = self.next;
        self.next = self.next.wrapping_add(1);
        current
    }
}

/// Echo payload: the send time in milliseconds, then the printable pattern `0x20 + (i % 95)`.
///
/// Payloads shorter than the timestamp carry the pattern only.
pub fn echo_payload(size: usize, timestamp_ms: u64) -> Vec<u8> {
    let mut data = vec![0u8; size];
    if size >= ECHO_TIMESTAMP_LEN {
        data[..ECHO_TIMESTAMP_LEN].copy_from_slice(&timestamp_ms.to_be_bytes());
    }
    for (i, byte) in data.iter_mut().enumerate().skip(ECHO_TIMESTAMP_LEN) {
        *byte = 0x20 + (i % 95) as u8;
    }
    data
}

/// Builds an ICMPv4 echo request (type 8) with its checksum filled in.
pub fn create_echo_request(
    sequence: &mut EchoSequence,
    data_size: usize,
    timestamp_ms: u64,
) -> anyhow::Result<Vec<u8>> {
    let mut buffer = vec![0u8; ICMP_HDR_LEN + data_size];
    {
        let mut icmp = MutableEchoRequestPacket::new(&mut buffer)
            .context("failed to create echo request packet")?;
        icmp.set_icmp_type(IcmpTypes::EchoRequest);
        icmp.set_icmp_code(IcmpCode(0));
        icmp.set_identifier(sequence.identifier());
        icmp.set_sequence_number(sequence.advance());
        icmp.set_payload(&echo_payload(data_size, timestamp_ms));
        icmp.set_checksum(0);
    }
    let csm = icmp::checksum(&IcmpPacket::new(&buffer).context("failed to create ICMP packet")?);
    MutableIcmpPacket::new(&mut buffer)
        .context("failed to create ICMP packet")?
        .set_checksum(csm);
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
