//! # Step Contract
//!
//! Every node of a workflow is executed by a [`WorkflowStep`]. A step sees the
//! run's [`WorkflowContext`], the outputs of its direct parents in a
//! [`StepInput`], and a [`NodeEvents`] handle for progress reporting.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use async_trait::async_trait;
use probeflow_common::network::range::Ipv4Range;
use probeflow_common::network::target::Ipv4Target;
use serde::Serialize;

use crate::error::WorkflowResult;
use crate::event::NodeEvents;
use crate::factory::StepKind;
use crate::graph::GraphNode;
use crate::injector::ProtocolFamily;

const INTERFACE_KEY: &str = "interface";

/// Key/value settings supplied once per run. Steps only read it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowContext {
    values: BTreeMap<String, String>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interface(interface: impl Into<String>) -> Self {
        Self::new().with(INTERFACE_KEY, interface)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The interface selected for this run, if a non-blank one was given.
    pub fn interface(&self) -> Option<&str> {
        self.get(INTERFACE_KEY).map(str::trim).filter(|name| !name.is_empty())
    }
}

/// What a node receives: itself, and its direct parents' outputs in edge order.
#[derive(Debug, Clone)]
pub struct StepInput {
    pub node: GraphNode,
    pub inputs: Vec<(String, StepOutput)>,
}

impl StepInput {
    pub fn new(node: GraphNode) -> Self {
        Self {
            node,
            inputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, parent: impl Into<String>, output: StepOutput) -> Self {
        self.inputs.push((parent.into(), output));
        self
    }

    pub fn outputs(&self) -> impl Iterator<Item = &StepOutput> {
        self.inputs.iter().map(|(_, output)| output)
    }

    /// IPv4 hosts and ranges among the inputs. Other shapes are ignored.
    pub fn ipv4_targets(&self) -> Vec<Ipv4Target> {
        self.outputs()
            .filter_map(|output| match output {
                StepOutput::AddressRange(range) => Some(Ipv4Target::Range(*range)),
                StepOutput::SingleAddress(IpAddr::V4(addr)) => Some(Ipv4Target::Host(*addr)),
                _ => None,
            })
            .collect()
    }

    pub fn ipv6_targets(&self) -> Vec<Ipv6Addr> {
        self.outputs()
            .filter_map(|output| match output {
                StepOutput::SingleAddress(IpAddr::V6(addr)) => Some(*addr),
                _ => None,
            })
            .collect()
    }

    pub fn packet_streams(&self) -> Vec<&PacketStream> {
        self.outputs()
            .filter_map(|output| match output {
                StepOutput::PacketStream(stream) => Some(stream),
                _ => None,
            })
            .collect()
    }
}

/// The value a step hands to its dependents. One variant per producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum StepOutput {
    AddressRange(Ipv4Range),
    SingleAddress(IpAddr),
    PacketStream(PacketStream),
    Sent(Vec<StreamReport>),
}

impl StepOutput {
    pub fn ipv4(addr: Ipv4Addr) -> Self {
        StepOutput::SingleAddress(IpAddr::V4(addr))
    }

    pub fn ipv6(addr: Ipv6Addr) -> Self {
        StepOutput::SingleAddress(IpAddr::V6(addr))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamItem {
    Packet {
        bytes: Vec<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<IpAddr>,
    },
    /// Pause before the next packet, in milliseconds.
    Delay(u64),
}

/// Ordered packets of one builder, paced by delay markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketStream {
    pub kind: ProtocolFamily,
    /// Interface address the packets were built for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<IpAddr>,
    pub items: Vec<StreamItem>,
}

impl PacketStream {
    /// Puts a `delay_ms` marker between consecutive packets, never after the last one.
    pub fn paced<I>(kind: ProtocolFamily, source: Option<IpAddr>, packets: I, delay_ms: u64) -> Self
    where
        I: IntoIterator<Item = (Vec<u8>, Option<IpAddr>)>,
    {
        let mut items = Vec::new();
        for (bytes, target) in packets {
            if delay_ms > 0 && !items.is_empty() {
                items.push(StreamItem::Delay(delay_ms));
            }
            items.push(StreamItem::Packet { bytes, target });
        }
        Self { kind, source, items }
    }

    pub fn packet_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, StreamItem::Packet { .. }))
            .count()
    }
}

/// Per-stream outcome reported by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamReport {
    pub kind: ProtocolFamily,
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
}

#[async_trait]
pub trait WorkflowStep: Send + Sync {
    fn kind(&self) -> StepKind;

    async fn execute(
        &self,
        context: &WorkflowContext,
        input: &StepInput,
        events: &NodeEvents,
    ) -> WorkflowResult<StepOutput>;
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
