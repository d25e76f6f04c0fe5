use std::net::Ipv6Addr;

use pnet::util::MacAddr;

/// A MAC is only usable as a packet source when it exists and is not `00:00:00:00:00:00`.
pub fn is_usable(mac: Option<MacAddr>) -> bool {
    matches!(mac, Some(mac) if mac != MacAddr::zero())
}

/// Maps an IPv6 multicast group onto its Ethernet address (`33:33` + low 32 bits).
pub fn ipv6_multicast_mac(group: Ipv6Addr) -> MacAddr {
    let o = group.octets();
    MacAddr::new(0x33, 0x33, o[12], o[13], o[14], o[15])
}
