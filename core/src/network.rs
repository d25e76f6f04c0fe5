//! # Raw Transmitters
//!
//! [`Transmitter`]s backed by `pnet`. ARP and neighbor discovery go out as
//! Ethernet frames on the chosen interface; echo requests use raw Layer-4
//! sockets and let the kernel route them.
//!
//! Opening either kind of socket requires root, and only Linux is supported.

pub mod datalink;
pub mod transport;

use pnet::datalink::NetworkInterface;

use crate::injector::{ProtocolFamily, TransmitError, Transmitter, TransmitterFactory};

use self::datalink::EthernetTransmitter;
use self::transport::TransportTransmitter;

const TRACING_TARGET: &str = "probeflow_core::network";

/// The host's raw sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTransmitters;

impl TransmitterFactory for SystemTransmitters {
    fn is_available(&self, family: ProtocolFamily) -> bool {
        let available = cfg!(target_os = "linux") && is_root::is_root();
        if !available {
            tracing::debug!(target: TRACING_TARGET, %family, "raw injection unavailable (needs root on Linux)");
        }
        available
    }

    fn create(&self, family: ProtocolFamily) -> Box<dyn Transmitter> {
        match family {
            ProtocolFamily::Arp | ProtocolFamily::Ns | ProtocolFamily::Rs => {
                Box::new(EthernetTransmitter::new(family))
            }
            ProtocolFamily::Icmp | ProtocolFamily::Icmpv6 => Box::new(TransportTransmitter::new(family)),
        }
    }
}

pub(crate) fn find_interface(name: &str) -> Result<NetworkInterface, TransmitError> {
    pnet::datalink::interfaces()
        .into_iter()
        .find(|intf| intf.name == name)
        .ok_or_else(|| TransmitError::InterfaceNotFound(name.to_string()))
}
