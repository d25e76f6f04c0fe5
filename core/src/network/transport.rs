//! Raw Layer-4 transmitter for ICMP and ICMPv6 echo requests.

use std::net::IpAddr;

use pnet::packet::icmp::IcmpPacket;
use pnet::packet::icmpv6::Icmpv6Packet;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::{self, TransportChannelType, TransportProtocol, TransportSender};

use crate::injector::{ProtocolFamily, TransmitError, Transmitter};

use super::TRACING_TARGET;

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));
const CHANNEL_TYPE_ICMPV6: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv6(IpNextHeaderProtocols::Icmpv6));

/// Sends echo requests through the kernel's raw ICMP sockets.
///
/// The socket is bound to the run's interface (`SO_BINDTODEVICE`), so packets
/// leave through it whatever the routing table says and link-local IPv6
/// targets resolve against it. On raw ICMPv6 sockets the kernel also writes
/// the checksum.
pub struct TransportTransmitter {
    family: ProtocolFamily,
    tx: Option<TransportSender>,
}

impl TransportTransmitter {
    pub fn new(family: ProtocolFamily) -> Self {
        Self { family, tx: None }
    }

    fn channel_type(&self) -> TransportChannelType {
        match self.family {
            ProtocolFamily::Icmpv6 => CHANNEL_TYPE_ICMPV6,
            _ => CHANNEL_TYPE_ICMP,
        }
    }
}

impl Transmitter for TransportTransmitter {
    fn initialize(&mut self, interface: &str) -> Result<(), TransmitError> {
        super::find_interface(interface)?;
        let (tx, _rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, self.channel_type())?;
        bind_sender(&tx, interface)?;
        tracing::debug!(target: TRACING_TARGET, family = %self.family, interface, "transport channel open and bound");
        self.tx = Some(tx);
        Ok(())
    }

    fn send(&mut self, target: Option<IpAddr>, packet: &[u8]) -> Result<(), TransmitError> {
        let tx = self.tx.as_mut().ok_or(TransmitError::NotInitialized)?;
        let malformed = || TransmitError::Frame(anyhow::anyhow!("{} packet too short ({} bytes)", self.family, packet.len()));

        match (self.family, target) {
            (ProtocolFamily::Icmpv6, Some(dst @ IpAddr::V6(_))) => {
                let view = Icmpv6Packet::new(packet).ok_or_else(malformed)?;
                tx.send_to(view, dst)?;
            }
            (ProtocolFamily::Icmp, Some(dst @ IpAddr::V4(_))) => {
                let view = IcmpPacket::new(packet).ok_or_else(malformed)?;
                tx.send_to(view, dst)?;
            }
            (family, _) => return Err(TransmitError::MissingTarget(family)),
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.tx.take().is_some() {
            tracing::debug!(target: TRACING_TARGET, family = %self.family, "transport channel closed");
        }
    }

    fn is_initialized(&self) -> bool {
        self.tx.is_some()
    }
}

#[cfg(target_os = "linux")]
fn bind_sender(tx: &TransportSender, interface: &str) -> std::io::Result<()> {
    // SAFETY: `tx` owns the descriptor and outlives this borrow.
    let fd = unsafe { std::os::fd::BorrowedFd::borrow_raw(tx.socket.fd) };
    bind_to_device(fd, interface)
}

#[cfg(not(target_os = "linux"))]
fn bind_sender(_tx: &TransportSender, _interface: &str) -> std::io::Result<()> {
    Ok(())
}

/// Restricts `socket` to packets sent and received on `interface`.
#[cfg(target_os = "linux")]
fn bind_to_device(socket: impl std::os::fd::AsFd, interface: &str) -> std::io::Result<()> {
    socket2::SockRef::from(&socket).bind_device(Some(interface.as_bytes()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
