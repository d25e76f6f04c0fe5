use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use probeflow_common::config::EngineConfig;
use probeflow_common::network::interface::{AddressFamily, InterfaceInventory, InterfaceRequirement};
use probeflow_common::network::target::AddressError;
use probeflow_common::utils::ip::solicited_node_multicast;
use probeflow_protocols::ndp;

use crate::error::WorkflowResult;
use crate::event::NodeEvents;
use crate::factory::StepKind;
use crate::injector::ProtocolFamily;
use crate::step::{PacketStream, StepInput, StepOutput, WorkflowContext, WorkflowStep};
use crate::steps::icmpv6_ping::NO_IPV6_TARGETS;
use crate::steps::{PacingParams, finish_icmpv6, resolve_interface, source_mac};

const REQUIREMENT: InterfaceRequirement = InterfaceRequirement {
    family: AddressFamily::Ipv6,
    needs_mac: true,
    purpose: "IPv6 NS",
};

/// `ipv6-ns`: a Neighbor Solicitation for every IPv6 target, carrying our MAC
/// as the source link-layer option.
pub struct Ipv6NsStep {
    inventory: Arc<dyn InterfaceInventory>,
    config: EngineConfig,
}

impl Ipv6NsStep {
    pub fn new(inventory: Arc<dyn InterfaceInventory>, config: EngineConfig) -> Self {
        Self { inventory, config }
    }
}

#[async_trait]
impl WorkflowStep for Ipv6NsStep {
    fn kind(&self) -> StepKind {
        StepKind::Ipv6Ns
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
        let targets = input.ipv6_targets();
        if targets.is_empty() {
            return Err(AddressError::EmptyTargetSet(NO_IPV6_TARGETS.into()).into());
        }

        let mut packets = Vec::with_capacity(targets.len());
        for target in targets {
            let mut bytes = ndp::create_neighbor_solicitation(target, src_mac)?;
            finish_icmpv6(
                self.config.checksum_mode,
                &mut bytes,
                resolved.ipv6(),
                solicited_node_multicast(target),
            )?;
            packets.push((bytes, Some(IpAddr::V6(target))));
        }

        Ok(StepOutput::PacketStream(PacketStream::paced(
            ProtocolFamily::Ns,
            Some(resolved.address),
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
