pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;
pub const IP_V6_HDR_LEN: usize = 40;
pub const ICMP_HDR_LEN: usize = 8;
pub const NS_LEN: usize = 32;
pub const RS_LEN: usize = 16;
/// Leading payload bytes carrying the send time of an echo request.
pub const ECHO_TIMESTAMP_LEN: usize = 8;
/// Largest ICMPv4 echo payload that fits a 1500 byte MTU.
pub const MAX_ICMP_DATA: usize = 1472;
/// Largest ICMPv6 echo payload that fits the 1280 byte IPv6 minimum MTU.
pub const MAX_ICMPV6_DATA: usize = 1232;
