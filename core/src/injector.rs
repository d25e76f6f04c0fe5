//! # Packet Injection
//!
//! The engine never opens sockets itself. Generated packets leave the host through a
//! [`Transmitter`], one per [`ProtocolFamily`], handed out by a
//! [`TransmitterFactory`]. The sink step drives them through a
//! [`dispatcher::InjectorDispatcher`].

pub mod dispatcher;

use std::fmt;
use std::net::IpAddr;

use probeflow_common::network::interface::InterfaceError;
use serde::Serialize;
use thiserror::Error;

/// The wire protocol of a packet stream, and the transmitter that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ProtocolFamily {
    #[serde(rename = "arp-scan")]
    Arp,
    #[serde(rename = "icmp-ping")]
    Icmp,
    #[serde(rename = "icmpv6-ping")]
    Icmpv6,
    #[serde(rename = "ipv6-ns")]
    Ns,
    #[serde(rename = "ipv6-rs")]
    Rs,
}

impl ProtocolFamily {
    pub const ALL: [ProtocolFamily; 5] = [
        ProtocolFamily::Arp,
        ProtocolFamily::Icmp,
        ProtocolFamily::Icmpv6,
        ProtocolFamily::Ns,
        ProtocolFamily::Rs,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn injector_name(self) -> &'static str {
        match self {
            ProtocolFamily::Arp => "ArpInjector",
            ProtocolFamily::Icmp => "IcmpInjector",
            ProtocolFamily::Icmpv6 => "Icmpv6Injector",
            ProtocolFamily::Ns => "Ipv6NsInjector",
            ProtocolFamily::Rs => "Ipv6RsInjector",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProtocolFamily::Arp => "ARP",
            ProtocolFamily::Icmp => "ICMP",
            ProtocolFamily::Icmpv6 => "ICMPv6",
            ProtocolFamily::Ns => "IPv6 NS",
            ProtocolFamily::Rs => "IPv6 RS",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            ProtocolFamily::Icmp | ProtocolFamily::Icmpv6 => "pings",
            _ => "packets",
        }
    }

    /// Completion line reported once a stream has been fully processed.
    pub fn summary(self, sent: usize, total: usize, failed: usize) -> String {
        let mut line = format!("{}: Sent {sent}/{total} {}", self.label(), self.unit());
        if failed > 0 {
            line.push_str(&format!(", {failed} failed"));
        }
        line
    }

    /// Warning raised when a single packet could not be sent.
    pub fn send_failure(self, target: Option<IpAddr>, error: &TransmitError) -> String {
        let target = target.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".into());
        match self {
            ProtocolFamily::Arp => format!("Failed to send ARP packet: {error}"),
            ProtocolFamily::Icmp => format!("Failed to send ICMP ping to {target}: {error}"),
            ProtocolFamily::Icmpv6 => format!("Failed to send ICMPv6 ping to {target}: {error}"),
            ProtocolFamily::Ns => format!("Failed to send IPv6 NS to {target}: {error}"),
            ProtocolFamily::Rs => format!("Failed to send IPv6 RS: {error}"),
        }
    }
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum TransmitError {
    #[error("transmitter is not initialized")]
    NotInitialized,
    #[error("{0} injection is not available on this platform")]
    Unavailable(ProtocolFamily),
    #[error("network interface \"{0}\" not found")]
    InterfaceNotFound(String),
    #[error("{0} packet has no usable target address")]
    MissingTarget(ProtocolFamily),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] anyhow::Error),
}

/// A raw packet sender bound to one interface.
///
/// A transmitter is owned by exactly one dispatcher and never shared across tasks.
pub trait Transmitter: Send {
    fn initialize(&mut self, interface: &str) -> Result<(), TransmitError>;

    /// Sends one packet. `target` is the per-packet destination, when the family has one.
    fn send(&mut self, target: Option<IpAddr>, packet: &[u8]) -> Result<(), TransmitError>;

    /// Releases the underlying socket or channel. Calling it twice is harmless.
    fn close(&mut self);

    fn is_initialized(&self) -> bool;
}

pub trait TransmitterFactory: Send + Sync {
    /// Whether this host can carry `family` at all; checked before [`TransmitterFactory::create`].
    fn is_available(&self, family: ProtocolFamily) -> bool;

    fn create(&self, family: ProtocolFamily) -> Box<dyn Transmitter>;
}
