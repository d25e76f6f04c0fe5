use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use probeflow_common::network::interface::{AddressFamily, InterfaceInventory, InterfaceRequirement};
use probeflow_common::network::target::TargetFilter;
use probeflow_protocols::arp;

use crate::error::{WorkflowError, WorkflowResult};
use crate::event::NodeEvents;
use crate::factory::StepKind;
use crate::injector::ProtocolFamily;
use crate::step::{PacketStream, StepInput, StepOutput, WorkflowContext, WorkflowStep};
use crate::steps::{PacingParams, collect_ipv4_targets, resolve_interface, source_mac};

const REQUIREMENT: InterfaceRequirement = InterfaceRequirement {
    family: AddressFamily::Ipv4,
    needs_mac: true,
    purpose: "ARP scanning",
};

/// `arp-scan`: one broadcast ARP request per IPv4 target.
///
/// Network (`.0`) and broadcast (`.255`) addresses are dropped, whether they
/// come from a range or a single address.
pub struct ArpScanStep {
    inventory: Arc<dyn InterfaceInventory>,
}

impl ArpScanStep {
    pub fn new(inventory: Arc<dyn InterfaceInventory>) -> Self {
        Self { inventory }
    }
}

#[async_trait]
impl WorkflowStep for ArpScanStep {
    fn kind(&self) -> StepKind {
        StepKind::ArpScan
    }

    async fn execute(
        &self,
        context: &WorkflowContext,
        input: &StepInput,
        _events: &NodeEvents,
    ) -> WorkflowResult<StepOutput> {
        let params = PacingParams::parse(&input.node)?;
        let resolved = resolve_interface(self.inventory.as_ref(), context, REQUIREMENT)?;
        let src_mac = source_mac(&resolved)?;
        let src_addr = resolved
            .ipv4()
            .ok_or_else(|| WorkflowError::Packet(anyhow::anyhow!("resolved interface has no IPv4 address")))?;

        let targets = collect_ipv4_targets(
            input,
            TargetFilter::ExcludeNetworkAndBroadcast,
            "IP range contains no valid ARP targets",
        )?;

        let packets = targets
            .into_iter()
            .map(|dst| Ok((arp::create_request(src_mac, src_addr, dst)?, Some(IpAddr::V4(dst)))))
            .collect::<WorkflowResult<Vec<_>>>()?;

        tracing::debug!(node = %input.node.id, packets = packets.len(), "built ARP requests");

        Ok(StepOutput::PacketStream(PacketStream::paced(
            ProtocolFamily::Arp,
            Some(IpAddr::V4(src_addr)),
            packets,
            params.delay,
        )))
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
