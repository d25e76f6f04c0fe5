use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use probeflow_common::network::interface::{AddressFamily, InterfaceInventory, InterfaceRequirement};
use probeflow_common::network::target::TargetFilter;
use probeflow_protocols::icmp::{self, EchoSequence};
use probeflow_protocols::utils::MAX_ICMP_DATA;

use crate::error::WorkflowResult;
use crate::event::NodeEvents;
use crate::factory::StepKind;
use crate::injector::ProtocolFamily;
use crate::step::{PacketStream, StepInput, StepOutput, WorkflowContext, WorkflowStep};
use crate::steps::{EchoParams, collect_ipv4_targets, now_ms, resolve_interface};

const REQUIREMENT: InterfaceRequirement = InterfaceRequirement {
    family: AddressFamily::Ipv4,
    needs_mac: false,
    purpose: "ICMP ping",
};

/// `icmp-ping`: ICMPv4 echo requests, one per IPv4 target, sequence numbers counting up.
pub struct IcmpPingStep {
    inventory: Arc<dyn InterfaceInventory>,
}

impl IcmpPingStep {
    pub fn new(inventory: Arc<dyn InterfaceInventory>) -> Self {
        Self { inventory }
    }
}

#[async_trait]
impl WorkflowStep for IcmpPingStep {
    fn kind(&self) -> StepKind {
        StepKind::IcmpPing
    }

    async fn execute(
        &self,
        context: &WorkflowContext,
        input: &StepInput,
        _events: &NodeEvents,
    ) -> WorkflowResult<StepOutput> {
        let settings = EchoParams::parse(&input.node, MAX_ICMP_DATA)?;
        let resolved = resolve_interface(self.inventory.as_ref(), context, REQUIREMENT)?;
        let targets = collect_ipv4_targets(
            input,
            TargetFilter::All,
            "IP range contains no valid ping targets",
        )?;

        let mut sequence = EchoSequence::new(settings.identifier, settings.sequence_start);
        let mut packets = Vec::with_capacity(targets.len());
        for dst in targets {
            let bytes = icmp::create_echo_request(&mut sequence, settings.data_size, now_ms())?;
            packets.push((bytes, Some(IpAddr::V4(dst))));
        }

        tracing::debug!(
            node = %input.node.id,
            identifier = settings.identifier,
            packets = packets.len(),
            "built ICMP echo requests"
        );

        Ok(StepOutput::PacketStream(PacketStream::paced(
            ProtocolFamily::Icmp,
            Some(resolved.address),
            packets,
            settings.delay,
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
