//! # Scan Target Model
//!
//! Parses and expands the addresses that packet builders aim at.
//!
//! Addresses enter a workflow as text typed into a node and are checked against a
//! strict grammar before anything else sees them:
//! * A dotted-quad IPv4 address (e.g., `192.168.1.5`).
//! * A colon-hex IPv6 address, full or `::` compressed (e.g., `fe80::1`).
//!
//! Generators hand their addresses downstream as [`Ipv4Target`]s, which the
//! builders expand into a flat list of destinations.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::network::range::Ipv4Range;

static IPV4_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])(\.(25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])){3}$")
        .expect("IPv4 grammar is a valid regex")
});

static IPV6_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(",
        r"(?:[0-9A-Fa-f]{1,4}:){7}[0-9A-Fa-f]{1,4}",
        r"|(?:[0-9A-Fa-f]{1,4}:){1,7}:",
        r"|:(?::[0-9A-Fa-f]{1,4}){1,7}",
        r"|(?:[0-9A-Fa-f]{1,4}:){1,6}:[0-9A-Fa-f]{1,4}",
        r"|(?:[0-9A-Fa-f]{1,4}:){1,5}(?::[0-9A-Fa-f]{1,4}){1,2}",
        r"|(?:[0-9A-Fa-f]{1,4}:){1,4}(?::[0-9A-Fa-f]{1,4}){1,3}",
        r"|(?:[0-9A-Fa-f]{1,4}:){1,3}(?::[0-9A-Fa-f]{1,4}){1,4}",
        r"|(?:[0-9A-Fa-f]{1,4}:){1,2}(?::[0-9A-Fa-f]{1,4}){1,5}",
        r"|[0-9A-Fa-f]{1,4}:(?::[0-9A-Fa-f]{1,4}){1,6}",
        r"|:(?::[0-9A-Fa-f]{1,4}){1,6}",
        r")$"
    ))
    .expect("IPv6 grammar is a valid regex")
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The text does not match the address grammar of its family.
    #[error("Invalid IP address format: {0}")]
    InvalidAddress(String),
    /// The range start lies after the range end.
    #[error("Invalid IP range: {start} is greater than {end}")]
    InvalidRange { start: Ipv4Addr, end: Ipv4Addr },
    /// Expansion and filtering left nothing to scan.
    #[error("{0}")]
    EmptyTargetSet(String),
}

/// An IPv4 destination handed downstream by an address generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv4Target {
    /// A single host.
    Host(Ipv4Addr),
    /// An inclusive range of hosts.
    Range(Ipv4Range),
}

/// Which generated addresses a builder is willing to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFilter {
    /// Every address is kept.
    All,
    /// Drops addresses ending in `.0` or `.255`, which ARP cannot resolve.
    ExcludeNetworkAndBroadcast,
}

impl TargetFilter {
    pub fn accepts(&self, addr: Ipv4Addr) -> bool {
        match self {
            TargetFilter::All => true,
            TargetFilter::ExcludeNetworkAndBroadcast => !matches!(addr.octets()[3], 0 | 255),
        }
    }
}

pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr, AddressError> {
    if !IPV4_GRAMMAR.is_match(s) {
        return Err(AddressError::InvalidAddress(s.to_string()));
    }
    s.parse::<Ipv4Addr>()
        .map_err(|_| AddressError::InvalidAddress(s.to_string()))
}

pub fn parse_ipv6(s: &str) -> Result<Ipv6Addr, AddressError> {
    if !IPV6_GRAMMAR.is_match(s) {
        return Err(AddressError::InvalidAddress(s.to_string()));
    }
    s.parse::<Ipv6Addr>()
        .map_err(|_| AddressError::InvalidAddress(s.to_string()))
}

/// Flattens hosts and ranges into the ordered list of addresses to scan.
///
/// Ranges are validated before they are walked. `empty_reason` becomes the
/// message of the [`AddressError::EmptyTargetSet`] raised when nothing survives.
pub fn expand_ipv4_targets<I>(
    targets: I,
    filter: TargetFilter,
    empty_reason: &str,
) -> Result<Vec<Ipv4Addr>, AddressError>
where
    I: IntoIterator<Item = Ipv4Target>,
{
    let mut addrs: Vec<Ipv4Addr> = Vec::new();

    for target in targets {
        match target {
            Ipv4Target::Host(addr) => {
                if filter.accepts(addr) {
                    addrs.push(addr);
                }
            }
            Ipv4Target::Range(range) => {
                range.validate()?;
                addrs.extend(range.to_iter().filter(|addr| filter.accepts(*addr)));
            }
        }
    }

    if addrs.is_empty() {
        return Err(AddressError::EmptyTargetSet(empty_reason.to_string()));
    }
    Ok(addrs)
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

    #[test]
    fn ipv4_grammar_accepts_dotted_quads() {
        assert_eq!(parse_ipv4("10.0.0.1"), Ok(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(parse_ipv4("255.255.255.255"), Ok(Ipv4Addr::BROADCAST));
        assert_eq!(parse_ipv4("0.0.0.0"), Ok(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn ipv4_grammar_rejects_malformed_input() {
        for bad in ["", "10.0.0", "10.0.0.256", "10.0.0.1.", "010.0.0.1", "a.b.c.d", " 10.0.0.1"] {
            assert_eq!(
                parse_ipv4(bad),
                Err(AddressError::InvalidAddress(bad.to_string())),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn ipv6_grammar_accepts_full_and_compressed_forms() {
        assert!(parse_ipv6("2001:0db8:0000:0000:0000:0000:0000:0001").is_ok());
        assert!(parse_ipv6("fe80::1").is_ok());
        assert!(parse_ipv6("::1").is_ok());
        assert!(parse_ipv6("2001:db8::").is_ok());
    }

    #[test]
    fn ipv6_grammar_rejects_malformed_input() {
        assert!(parse_ipv6("fe80::1::2").is_err());
        assert!(parse_ipv6("12345::1").is_err());
        assert!(parse_ipv6("10.0.0.1").is_err());
        assert!(parse_ipv6("fe80::1%eth0").is_err());
    }

    #[test]
    fn arp_filter_excludes_network_and_broadcast() {
        let range = Ipv4Range::new(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 255));
        let addrs = expand_ipv4_targets(
            [Ipv4Target::Range(range)],
            TargetFilter::ExcludeNetworkAndBroadcast,
            "none",
        )
        .unwrap();

        assert_eq!(addrs.len(), 254);
        assert!(!addrs.contains(&Ipv4Addr::new(10, 0, 0, 0)));
        assert!(!addrs.contains(&Ipv4Addr::new(10, 0, 0, 255)));
    }

    #[test]
    fn unfiltered_expansion_keeps_every_address_in_order() {
        let range = Ipv4Range::new(Ipv4Addr::new(10, 0, 0, 254), Ipv4Addr::new(10, 0, 0, 255));
        let addrs = expand_ipv4_targets(
            [Ipv4Target::Host(Ipv4Addr::new(1, 1, 1, 1)), Ipv4Target::Range(range)],
            TargetFilter::All,
            "none",
        )
        .unwrap();

        assert_eq!(
            addrs,
            vec![
                Ipv4Addr::new(1, 1, 1, 1),
                Ipv4Addr::new(10, 0, 0, 254),
                Ipv4Addr::new(10, 0, 0, 255),
            ]
        );
    }

    #[test]
    fn expansion_fails_when_nothing_survives() {
        let result = expand_ipv4_targets(
            [Ipv4Target::Host(Ipv4Addr::new(192, 168, 1, 255))],
            TargetFilter::ExcludeNetworkAndBroadcast,
            "IP range contains no valid ARP targets",
        );
        assert_eq!(
            result,
            Err(AddressError::EmptyTargetSet("IP range contains no valid ARP targets".into()))
        );
    }

    #[test]
    fn expansion_rejects_inverted_ranges() {
        let range = Ipv4Range::new(Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 1));
        let result = expand_ipv4_targets([Ipv4Target::Range(range)], TargetFilter::All, "none");
        assert!(matches!(result, Err(AddressError::InvalidRange { .. })));
    }
}
