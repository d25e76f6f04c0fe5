use std::sync::Arc;

use async_trait::async_trait;
use probeflow_common::config::EngineConfig;
use probeflow_common::network::interface::{AddressFamily, InterfaceInventory, InterfaceRequirement};
use probeflow_common::utils::ip::ALL_ROUTERS;
use probeflow_protocols::ndp;

use crate::error::WorkflowResult;
use crate::event::NodeEvents;
use crate::factory::StepKind;
use crate::injector::ProtocolFamily;
use crate::step::{PacketStream, StepInput, StepOutput, WorkflowContext, WorkflowStep};
use crate::steps::{PacingParams, finish_icmpv6, resolve_interface, source_mac};

const REQUIREMENT: InterfaceRequirement = InterfaceRequirement {
    family: AddressFamily::Ipv6,
    needs_mac: true,
    purpose: "IPv6 RS",
};

/// `ipv6-rs`: a single Router Solicitation for the all-routers group.
///
/// Takes no inputs. The `delay` parameter is accepted but a one packet stream has nothing to pace.
pub struct Ipv6RsStep {
    inventory: Arc<dyn InterfaceInventory>,
    config: EngineConfig,
}

impl Ipv6RsStep {
    pub fn new(inventory: Arc<dyn InterfaceInventory>, config: EngineConfig) -> Self {
        Self { inventory, config }
    }
}

#[async_trait]
impl WorkflowStep for Ipv6RsStep {
    fn kind(&self) -> StepKind {
        StepKind::Ipv6Rs
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

        let mut bytes = ndp::create_router_solicitation(src_mac)?;
        finish_icmpv6(self.config.checksum_mode, &mut bytes, resolved.ipv6(), ALL_ROUTERS)?;

        Ok(StepOutput::PacketStream(PacketStream::paced(
            ProtocolFamily::Rs,
            Some(resolved.address),
            [(bytes, None)],
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;
    use crate::graph::GraphNode;
    use crate::step::StreamItem;
    use crate::steps::fixtures;
    use pnet::packet::icmpv6::ndp::RouterSolicitPacket;
    use pnet::packet::icmpv6::{Icmpv6Packet, Icmpv6Types};
    use probeflow_common::config::ChecksumMode;
    use probeflow_common::network::interface::InterfaceError;
    use serde_json::json;
    use std::net::Ipv6Addr;

    async fn run(interface: &str, mode: ChecksumMode) -> WorkflowResult<StepOutput> {
        let config = EngineConfig {
            checksum_mode: mode,
            ..EngineConfig::default()
        };
        let step = Ipv6RsStep::new(fixtures::inventory(), config);
        let input = StepInput::new(GraphNode::new("rs", "ipv6-rs", json!({ "delay": 1000 })));
        step.execute(&WorkflowContext::with_interface(interface), &input, &fixtures::events())
            .await
    }

    #[tokio::test]
    async fn emits_one_solicitation_without_trailing_delay() {
        let StepOutput::PacketStream(stream) = run("eth0", ChecksumMode::Transmitter).await.unwrap() else {
            panic!("expected a packet stream");
        };
        assert_eq!(stream.kind, ProtocolFamily::Rs);
        assert_eq!(stream.items.len(), 1);

        let StreamItem::Packet { bytes, target } = &stream.items[0] else {
            panic!("expected a packet");
        };
        assert_eq!(*target, None);
        assert_eq!(bytes.len(), 16);

        let rs = RouterSolicitPacket::new(bytes).unwrap();
        assert_eq!(rs.get_icmpv6_type(), Icmpv6Types::RouterSolicit);
        assert_eq!(rs.get_checksum(), 0);
        assert_eq!(bytes[8], 1);
        assert_eq!(bytes[9], 1);
        assert_eq!(&bytes[10..16], &[0x02, 0x42, 0xac, 0x11, 0x00, 0x02]);
    }

    #[tokio::test]
    async fn builder_checksum_targets_all_routers() {
        let StepOutput::PacketStream(stream) = run("eth0", ChecksumMode::Builder).await.unwrap() else {
            panic!("expected a packet stream");
        };
        let StreamItem::Packet { bytes, .. } = &stream.items[0] else {
            panic!("expected a packet");
        };
        let view = Icmpv6Packet::new(bytes).unwrap();
        let src: Ipv6Addr = "fe80::42:acff:fe11:2".parse().unwrap();
        assert_eq!(view.get_checksum(), pnet::packet::icmpv6::checksum(&view, &src, &ALL_ROUTERS));
    }

    #[tokio::test]
    async fn loopback_is_refused() {
        let err = run("lo", ChecksumMode::Transmitter).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Network interface \"lo\" is a loopback interface and cannot be used for IPv6 RS"
        );
        assert!(matches!(err, WorkflowError::Interface(InterfaceError::Loopback { .. })));
    }
}
