use pnet::datalink::NetworkInterface;

use crate::network::interface::{InterfaceAddress, InterfaceSnapshot};

pub trait NetworkInterfaceExtension {
    /// Captures the interface in the inventory model; loopback addresses are internal.
    fn to_snapshot(&self) -> InterfaceSnapshot;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn to_snapshot(&self) -> InterfaceSnapshot {
        let internal = self.is_loopback();
        InterfaceSnapshot {
            name: self.name.clone(),
            mac: self.mac,
            addresses: self
                .ips
                .iter()
                .map(|net| InterfaceAddress {
                    ip: net.ip(),
                    internal: internal || net.ip().is_loopback(),
                })
                .collect(),
        }
    }
}
