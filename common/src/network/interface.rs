use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::util::MacAddr;
use thiserror::Error;

use crate::network::mac;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    fn matches(&self, ip: &IpAddr) -> bool {
        matches!(
            (self, ip),
            (AddressFamily::Ipv4, IpAddr::V4(_)) | (AddressFamily::Ipv6, IpAddr::V6(_))
        )
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Ipv4 => f.write_str("IPv4"),
            AddressFamily::Ipv6 => f.write_str("IPv6"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterfaceError {
    /// The run context did not name an interface.
    #[error("Interface name must be a non-empty string")]
    MissingName,
    /// No interface with this name exists on the host.
    #[error("Network interface \"{0}\" not found")]
    NotFound(String),
    /// Every address on the interface is internal (e.g., `lo`).
    #[error("Network interface \"{name}\" is a loopback interface and cannot be used for {purpose}")]
    Loopback { name: String, purpose: &'static str },
    /// The interface has no external address of the family the builder needs.
    #[error("Network interface \"{name}\" does not have a valid {family} address for {purpose}")]
    NoUsableAddress {
        name: String,
        family: AddressFamily,
        purpose: &'static str,
    },
    /// The builder writes a source MAC but the interface has none, or only zeros.
    #[error("Network interface \"{0}\" does not have a valid MAC address")]
    NoUsableMac(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub ip: IpAddr,
    /// Loopback style address that never leaves the host.
    pub internal: bool,
}

/// Point-in-time view of one local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSnapshot {
    pub name: String,
    pub mac: Option<MacAddr>,
    pub addresses: Vec<InterfaceAddress>,
}

impl InterfaceSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mac: None,
            addresses: Vec::new(),
        }
    }

    pub fn with_mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn with_address(mut self, ip: IpAddr, internal: bool) -> Self {
        self.addresses.push(InterfaceAddress { ip, internal });
        self
    }
}

/// Read-only source of local interface snapshots.
pub trait InterfaceInventory: Send + Sync {
    fn interfaces(&self) -> Vec<InterfaceSnapshot>;

    fn find(&self, name: &str) -> Option<InterfaceSnapshot> {
        self.interfaces().into_iter().find(|iface| iface.name == name)
    }
}

/// Fixed inventory, handy where the host's interfaces must not matter.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    interfaces: Vec<InterfaceSnapshot>,
}

impl StaticInventory {
    pub fn new(interfaces: Vec<InterfaceSnapshot>) -> Self {
        Self { interfaces }
    }
}

impl InterfaceInventory for StaticInventory {
    fn interfaces(&self) -> Vec<InterfaceSnapshot> {
        self.interfaces.clone()
    }
}

/// What a builder needs from the interface it transmits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceRequirement {
    pub family: AddressFamily,
    pub needs_mac: bool,
    /// Human readable builder name used in error messages.
    pub purpose: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInterface {
    pub name: String,
    pub address: IpAddr,
    pub mac: Option<MacAddr>,
}

impl ResolvedInterface {
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        match self.address {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        }
    }

    pub fn ipv6(&self) -> Option<Ipv6Addr> {
        match self.address {
            IpAddr::V6(v6) => Some(v6),
            IpAddr::V4(_) => None,
        }
    }
}

/// Picks the source address (and MAC) a builder will use on `name`.
///
/// IPv6 prefers a link-local address, which is what neighbor discovery must
/// be sourced from, and falls back to the first external IPv6 address.
pub fn resolve(
    inventory: &dyn InterfaceInventory,
    name: &str,
    requirement: InterfaceRequirement,
) -> Result<ResolvedInterface, InterfaceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InterfaceError::MissingName);
    }

    let iface = inventory
        .find(name)
        .ok_or_else(|| InterfaceError::NotFound(name.to_string()))?;

    let has_addresses = !iface.addresses.is_empty();
    if has_addresses && iface.addresses.iter().all(|addr| addr.internal) {
        return Err(InterfaceError::Loopback {
            name: iface.name,
            purpose: requirement.purpose,
        });
    }

    let mut candidates = iface
        .addresses
        .iter()
        .filter(|addr| !addr.internal && requirement.family.matches(&addr.ip))
        .map(|addr| addr.ip);

    let address = match requirement.family {
        AddressFamily::Ipv4 => candidates.next(),
        AddressFamily::Ipv6 => {
            let all: Vec<IpAddr> = candidates.collect();
            all.iter()
                .copied()
                .find(|ip| matches!(ip, IpAddr::V6(v6) if v6.is_unicast_link_local()))
                .or_else(|| all.first().copied())
        }
    };

    let Some(address) = address else {
        return Err(InterfaceError::NoUsableAddress {
            name: iface.name,
            family: requirement.family,
            purpose: requirement.purpose,
        });
    };

    if requirement.needs_mac && !mac::is_usable(iface.mac) {
        return Err(InterfaceError::NoUsableMac(iface.name));
    }

    Ok(ResolvedInterface {
        name: iface.name,
        address,
        mac: iface.mac,
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    const ARP: InterfaceRequirement = InterfaceRequirement {
        family: AddressFamily::Ipv4,
        needs_mac: true,
        purpose: "ARP scanning",
    };

    const ICMP: InterfaceRequirement = InterfaceRequirement {
        family: AddressFamily::Ipv4,
        needs_mac: false,
        purpose: "ICMP ping",
    };

    const NS: InterfaceRequirement = InterfaceRequirement {
        family: AddressFamily::Ipv6,
        needs_mac: true,
        purpose: "IPv6 NS",
    };

    fn default_mac() -> MacAddr {
        MacAddr(0x1, 0x2, 0x3, 0x4, 0x5, 0x6)
    }

    fn create_mock_inventory() -> StaticInventory {
        StaticInventory::new(vec![
            InterfaceSnapshot::new("lo")
                .with_mac(MacAddr::zero())
                .with_address("127.0.0.1".parse().unwrap(), true)
                .with_address("::1".parse().unwrap(), true),
            InterfaceSnapshot::new("eth0")
                .with_mac(default_mac())
                .with_address("192.168.1.100".parse().unwrap(), false)
                .with_address("2001:db8::10".parse().unwrap(), false)
                .with_address("fe80::10".parse().unwrap(), false),
            InterfaceSnapshot::new("tun0").with_address("10.8.0.2".parse().unwrap(), false),
            InterfaceSnapshot::new("eth1").with_mac(default_mac()),
        ])
    }

    #[test]
    fn resolve_should_succeed_with_ipv4_and_mac() {
        let inventory = create_mock_inventory();
        let resolved = resolve(&inventory, "eth0", ARP).unwrap();
        assert_eq!(resolved.ipv4(), Some(Ipv4Addr::new(192, 168, 1, 100)));
        assert_eq!(resolved.mac, Some(default_mac()));
    }

    #[test]
    fn resolve_should_prefer_ipv6_link_local() {
        let inventory = create_mock_inventory();
        let resolved = resolve(&inventory, "eth0", NS).unwrap();
        assert_eq!(resolved.ipv6(), Some("fe80::10".parse().unwrap()));
    }

    #[test]
    fn resolve_should_fail_on_blank_name() {
        let inventory = create_mock_inventory();
        assert_eq!(resolve(&inventory, "  ", ARP), Err(InterfaceError::MissingName));
    }

    #[test]
    fn resolve_should_fail_when_missing() {
        let inventory = create_mock_inventory();
        assert_eq!(
            resolve(&inventory, "wlan9", ARP),
            Err(InterfaceError::NotFound("wlan9".into()))
        );
    }

    #[test]
    fn resolve_should_fail_loop_back() {
        let inventory = create_mock_inventory();
        let err = resolve(&inventory, "lo", ICMP).unwrap_err();
        assert!(matches!(err, InterfaceError::Loopback { .. }));
        assert_eq!(
            err.to_string(),
            "Network interface \"lo\" is a loopback interface and cannot be used for ICMP ping"
        );
    }

    #[test]
    fn resolve_should_fail_without_family_address() {
        let inventory = create_mock_inventory();
        assert!(matches!(
            resolve(&inventory, "tun0", NS),
            Err(InterfaceError::NoUsableAddress { family: AddressFamily::Ipv6, .. })
        ));
        assert!(matches!(
            resolve(&inventory, "eth1", ICMP),
            Err(InterfaceError::NoUsableAddress { family: AddressFamily::Ipv4, .. })
        ));
    }

    #[test]
    fn resolve_should_fail_no_mac_addr() {
        let inventory = create_mock_inventory();
        assert_eq!(
            resolve(&inventory, "tun0", ARP),
            Err(InterfaceError::NoUsableMac("tun0".into()))
        );
    }

    #[test]
    fn resolve_should_fail_zero_mac() {
        let inventory = StaticInventory::new(vec![
            InterfaceSnapshot::new("veth0")
                .with_mac(MacAddr::zero())
                .with_address("fe80::1".parse().unwrap(), false),
        ]);
        assert_eq!(
            resolve(&inventory, "veth0", NS),
            Err(InterfaceError::NoUsableMac("veth0".into()))
        );
    }

    #[test]
    fn icmp_does_not_need_a_mac() {
        let inventory = create_mock_inventory();
        let resolved = resolve(&inventory, "tun0", ICMP).unwrap();
        assert_eq!(resolved.ipv4(), Some(Ipv4Addr::new(10, 8, 0, 2)));
    }
}
