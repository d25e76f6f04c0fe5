//! Ethernet channel transmitter for ARP, NS and RS.

use std::borrow::Cow;
use std::io;
use std::net::{IpAddr, Ipv6Addr};

use anyhow::{Context, bail};
use pnet::datalink::{self, Channel, Config, DataLinkSender, NetworkInterface};
use pnet::util::MacAddr;
use probeflow_common::network::interface::{
    self, AddressFamily, InterfaceRequirement, StaticInventory,
};
use probeflow_common::network::mac::ipv6_multicast_mac;
use probeflow_common::utils::interface::NetworkInterfaceExtension;
use probeflow_common::utils::ip::{ALL_ROUTERS, solicited_node_multicast};
use probeflow_protocols::icmpv6;
use probeflow_protocols::ip::{self, Ipv6Route, NDP_HOP_LIMIT};

use crate::injector::{ProtocolFamily, TransmitError, Transmitter};

use super::TRACING_TARGET;

/// Opens the link-layer channel. Swappable so tests can run on `pnet`'s dummy interface.
pub type ChannelOpener = Box<dyn FnMut(&NetworkInterface, Config) -> io::Result<Channel> + Send>;

struct Link {
    tx: Box<dyn DataLinkSender>,
    src_mac: MacAddr,
    /// Link-local source of NS/RS frames; unused for ARP, whose frames come fully built.
    src_addr: Option<Ipv6Addr>,
}

pub struct EthernetTransmitter {
    family: ProtocolFamily,
    opener: ChannelOpener,
    link: Option<Link>,
}

impl EthernetTransmitter {
    pub fn new(family: ProtocolFamily) -> Self {
        Self::with_opener(family, Box::new(datalink::channel))
    }

    pub fn with_opener(family: ProtocolFamily, opener: ChannelOpener) -> Self {
        Self {
            family,
            opener,
            link: None,
        }
    }

    /// Opens the channel on an already looked up interface.
    pub fn attach(&mut self, intf: &NetworkInterface) -> Result<(), TransmitError> {
        let snapshot = intf.to_snapshot();
        let needs_ipv6 = matches!(self.family, ProtocolFamily::Ns | ProtocolFamily::Rs);

        let (src_mac, src_addr) = if needs_ipv6 {
            let requirement = InterfaceRequirement {
                family: AddressFamily::Ipv6,
                needs_mac: true,
                purpose: self.family.label(),
            };
            let inventory = StaticInventory::new(vec![snapshot]);
            let resolved = interface::resolve(&inventory, &intf.name, requirement)?;
            let mac = resolved
                .mac
                .ok_or_else(|| interface::InterfaceError::NoUsableMac(intf.name.clone()))?;
            (mac, resolved.ipv6())
        } else {
            let mac = snapshot
                .mac
                .ok_or_else(|| interface::InterfaceError::NoUsableMac(intf.name.clone()))?;
            (mac, None)
        };

        let tx = open_eth_channel(intf, &Config::default(), &mut self.opener)?;
        tracing::debug!(target: TRACING_TARGET, family = %self.family, interface = %intf.name, "ethernet channel open");
        self.link = Some(Link { tx, src_mac, src_addr });
        Ok(())
    }

    fn frame<'a>(&self, link: &Link, target: Option<IpAddr>, packet: &'a [u8]) -> Result<Cow<'a, [u8]>, TransmitError> {
        let dst_addr = match (self.family, target) {
            (ProtocolFamily::Ns, Some(IpAddr::V6(target))) => solicited_node_multicast(target),
            (ProtocolFamily::Ns, _) => return Err(TransmitError::MissingTarget(self.family)),
            (ProtocolFamily::Rs, _) => ALL_ROUTERS,
            _ => return Ok(Cow::Borrowed(packet)),
        };
        let src_addr = link
            .src_addr
            .ok_or_else(|| TransmitError::Frame(anyhow::anyhow!("no IPv6 source address on the link")))?;

        let mut message = packet.to_vec();
        if !icmpv6::has_checksum(&message) {
            icmpv6::fill_checksum(&mut message, src_addr, dst_addr)?;
        }

        let route = Ipv6Route {
            src_mac: link.src_mac,
            dst_mac: ipv6_multicast_mac(dst_addr),
            src_addr,
            dst_addr,
            hop_limit: NDP_HOP_LIMIT,
        };
        Ok(Cow::Owned(ip::frame_icmpv6(&route, &message)?))
    }
}

impl Transmitter for EthernetTransmitter {
    fn initialize(&mut self, interface: &str) -> Result<(), TransmitError> {
        let intf = super::find_interface(interface)?;
        self.attach(&intf)
    }

    fn send(&mut self, target: Option<IpAddr>, packet: &[u8]) -> Result<(), TransmitError> {
        let mut link = self.link.take().ok_or(TransmitError::NotInitialized)?;
        let result = self.frame(&link, target, packet).and_then(|frame| {
            match link.tx.send_to(&frame, None) {
                Some(Ok(())) => Ok(()),
                Some(Err(e)) => Err(TransmitError::Io(e)),
                None => Err(TransmitError::Io(io::Error::other("datalink sender dropped the frame"))),
            }
        });
        self.link = Some(link);
        result
    }

    fn close(&mut self) {
        if self.link.take().is_some() {
            tracing::debug!(target: TRACING_TARGET, family = %self.family, "ethernet channel closed");
        }
    }

    fn is_initialized(&self) -> bool {
        self.link.is_some()
    }
}

fn open_eth_channel(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: &mut ChannelOpener,
) -> anyhow::Result<Box<dyn DataLinkSender>> {
    let ch: Channel = channel_opener(intf, *cfg).with_context(|| format!("opening on {}", intf.name))?;
    match ch {
        Channel::Ethernet(tx, _rx) => Ok(tx),
        _ => bail!("non-ethernet channel for {}", intf.name),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
