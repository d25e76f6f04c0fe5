use pnet::datalink::{self, NetworkInterface};

use probeflow_common::network::interface::{InterfaceInventory, InterfaceSnapshot};
use probeflow_common::utils::interface::NetworkInterfaceExtension;

/// Interfaces of the running host, read fresh on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInventory;

impl InterfaceInventory for SystemInventory {
    fn interfaces(&self) -> Vec<InterfaceSnapshot> {
        datalink::interfaces().iter().map(NetworkInterface::to_snapshot).collect()
    }
}
