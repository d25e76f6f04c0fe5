//! # Step Factory
//!
//! Maps a node's declared type onto one of the known [`StepKind`]s and builds
//! the step behind it. The match is exhaustive, so adding a kind without a
//! step does not compile.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use probeflow_common::config::EngineConfig;
use probeflow_common::network::interface::InterfaceInventory;

use crate::error::{WorkflowError, WorkflowResult};
use crate::injector::TransmitterFactory;
use crate::step::WorkflowStep;
use crate::steps::address::{IpRangeStep, IpSingleStep, Ipv6SingleStep};
use crate::steps::arp_scan::ArpScanStep;
use crate::steps::icmp_ping::IcmpPingStep;
use crate::steps::icmpv6_ping::Icmpv6PingStep;
use crate::steps::ipv6_ns::Ipv6NsStep;
use crate::steps::ipv6_rs::Ipv6RsStep;
use crate::steps::net_output::NetOutputStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    IpRange,
    IpSingle,
    Ipv6Single,
    ArpScan,
    IcmpPing,
    Icmpv6Ping,
    Ipv6Ns,
    Ipv6Rs,
    NetOutput,
}

impl StepKind {
    pub const ALL: [StepKind; 9] = [
        StepKind::IpRange,
        StepKind::IpSingle,
        StepKind::Ipv6Single,
        StepKind::ArpScan,
        StepKind::IcmpPing,
        StepKind::Icmpv6Ping,
        StepKind::Ipv6Ns,
        StepKind::Ipv6Rs,
        StepKind::NetOutput,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::IpRange => "ip-range",
            StepKind::IpSingle => "ip-single",
            StepKind::Ipv6Single => "ipv6-single",
            StepKind::ArpScan => "arp-scan",
            StepKind::IcmpPing => "icmp-ping",
            StepKind::Icmpv6Ping => "icmpv6-ping",
            StepKind::Ipv6Ns => "ipv6-ns",
            StepKind::Ipv6Rs => "ipv6-rs",
            StepKind::NetOutput => "net-output",
        }
    }
}

impl FromStr for StepKind {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| WorkflowError::UnsupportedStepType(s.to_string()))
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host capabilities the steps are built against.
#[derive(Clone)]
pub struct StepServices {
    pub inventory: Arc<dyn InterfaceInventory>,
    pub transmitters: Arc<dyn TransmitterFactory>,
    pub config: EngineConfig,
}

impl StepServices {
    pub fn new(
        inventory: Arc<dyn InterfaceInventory>,
        transmitters: Arc<dyn TransmitterFactory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            inventory,
            transmitters,
            config,
        }
    }
}

/// Turns a node type into something the orchestrator can execute.
pub trait StepResolver: Send + Sync {
    fn resolve(&self, node_type: &str) -> WorkflowResult<Arc<dyn WorkflowStep>>;
}

pub struct StepFactory {
    services: StepServices,
}

impl StepFactory {
    pub fn new(services: StepServices) -> Self {
        Self { services }
    }

    pub fn create(&self, kind: StepKind) -> Arc<dyn WorkflowStep> {
        let services = &self.services;
        match kind {
            StepKind::IpRange => Arc::new(IpRangeStep),
            StepKind::IpSingle => Arc::new(IpSingleStep),
            StepKind::Ipv6Single => Arc::new(Ipv6SingleStep),
            StepKind::ArpScan => Arc::new(ArpScanStep::new(services.inventory.clone())),
            StepKind::IcmpPing => Arc::new(IcmpPingStep::new(services.inventory.clone())),
            StepKind::Icmpv6Ping => Arc::new(Icmpv6PingStep::new(services.inventory.clone(), services.config)),
            StepKind::Ipv6Ns => Arc::new(Ipv6NsStep::new(services.inventory.clone(), services.config)),
            StepKind::Ipv6Rs => Arc::new(Ipv6RsStep::new(services.inventory.clone(), services.config)),
            StepKind::NetOutput => Arc::new(NetOutputStep::new(services.transmitters.clone())),
        }
    }
}

impl StepResolver for StepFactory {
    fn resolve(&self, node_type: &str) -> WorkflowResult<Arc<dyn WorkflowStep>> {
        let kind = StepKind::from_str(node_type)?;
        Ok(self.create(kind))
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
