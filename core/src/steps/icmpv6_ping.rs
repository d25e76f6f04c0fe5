use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use probeflow_common::config::EngineConfig;
use probeflow_common::network::interface::{AddressFamily, InterfaceInventory, InterfaceRequirement};
use probeflow_common::network::target::AddressError;
use probeflow_protocols::icmp::EchoSequence;
use probeflow_protocols::icmpv6;
use probeflow_protocols::utils::MAX_ICMPV6_DATA;

use crate::error::WorkflowResult;
use crate::event::NodeEvents;
use crate::factory::StepKind;
use crate::injector::ProtocolFamily;
use crate::step::{PacketStream, StepInput, StepOutput, WorkflowContext, WorkflowStep};
use crate::steps::{EchoParams, finish_icmpv6, now_ms, resolve_interface};

const REQUIREMENT: InterfaceRequirement = InterfaceRequirement {
    family: AddressFamily::Ipv6,
    needs_mac: true,
    purpose: "ICMPv6 ping",
};

pub(crate) const NO_IPV6_TARGETS: &str = "No valid IPv6 addresses found in inputs";

/// `icmpv6-ping`: ICMPv6 echo requests, one per IPv6 target.
pub struct Icmpv6PingStep {
    inventory: Arc<dyn InterfaceInventory>,
    config: EngineConfig,
}

impl Icmpv6PingStep {
    pub fn new(inventory: Arc<dyn InterfaceInventory>, config: EngineConfig) -> Self {
        Self { inventory, config }
    }
}

#[async_trait]
impl WorkflowStep for Icmpv6PingStep {
    fn kind(&self) -> StepKind {
        StepKind::Icmpv6Ping
    }

    async fn execute(
        &self,
        context: &WorkflowContext,
        input: &StepInput,
        _events: &NodeEvents,
    ) -> WorkflowResult<StepOutput> {
        let settings = EchoParams::parse(&input.node, MAX_ICMPV6_DATA)?;
        let resolved = resolve_interface(self.inventory.as_ref(), context, REQUIREMENT)?;
        let targets = input.ipv6_targets();
        if targets.is_empty() {
            return Err(AddressError::EmptyTargetSet(NO_IPV6_TARGETS.into()).into());
        }

        let mut sequence = EchoSequence::new(settings.identifier, settings.sequence_start);
        let mut packets = Vec::with_capacity(targets.len());
        for dst in targets {
            let mut bytes = icmpv6::create_echo_request(&mut sequence, settings.data_size, now_ms())?;
            finish_icmpv6(self.config.checksum_mode, &mut bytes, resolved.ipv6(), dst)?;
            packets.push((bytes, Some(IpAddr::V6(dst))));
        }

        Ok(StepOutput::PacketStream(PacketStream::paced(
            ProtocolFamily::Icmpv6,
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
