//! # Step Library
//!
//! Address generators, packet builders and the `net-output` sink.
//!
//! Builders share one shape: parse the node's parameters, resolve the run's
//! interface, collect targets from the parents, then emit a paced
//! [`PacketStream`](crate::step::PacketStream).

pub mod address;
pub mod arp_scan;
pub mod icmp_ping;
pub mod icmpv6_ping;
pub mod ipv6_ns;
pub mod ipv6_rs;
pub mod net_output;

use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::util::MacAddr;
use probeflow_common::config::ChecksumMode;
use probeflow_common::network::interface::{self, InterfaceError, InterfaceInventory, InterfaceRequirement, ResolvedInterface};
use probeflow_common::network::target::{Ipv4Target, TargetFilter, expand_ipv4_targets};
use probeflow_protocols::icmpv6;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::GraphNode;
use crate::step::{StepInput, WorkflowContext};

/// Longest pause a builder may put between two packets.
pub const MAX_DELAY_MS: u64 = 5000;

/// Echo requests carry 32 bytes of payload unless told otherwise.
pub const DEFAULT_DATA_SIZE: usize = 32;

pub const DEFAULT_SEQUENCE_START: u16 = 1;

/// Most IPv4 addresses a single builder will expand: one /16.
pub const MAX_IPV4_TARGETS: u64 = 65_536;

/// Reads `node.data` into `T`. A node without data reads as `{}`.
pub(crate) fn parse_params<T: DeserializeOwned>(node: &GraphNode) -> WorkflowResult<T> {
    let data = match &node.data {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(data).map_err(|e| WorkflowError::invalid_parameters(&node.id, e.to_string()))
}

pub(crate) fn ensure_at_most(node: &GraphNode, field: &str, value: u64, max: u64) -> WorkflowResult<()> {
    if value > max {
        return Err(WorkflowError::invalid_parameters(
            &node.id,
            format!("{field} must be between 0 and {max}, got {value}"),
        ));
    }
    Ok(())
}

/// Expands the IPv4 targets handed in by the parents.
///
/// The address count is checked against [`MAX_IPV4_TARGETS`] before anything is allocated.
pub(crate) fn collect_ipv4_targets(
    input: &StepInput,
    filter: TargetFilter,
    empty_reason: &str,
) -> WorkflowResult<Vec<Ipv4Addr>> {
    let targets = input.ipv4_targets();
    let requested: u64 = targets
        .iter()
        .map(|target| match target {
            Ipv4Target::Host(_) => 1,
            Ipv4Target::Range(range) => range.len(),
        })
        .sum();
    if requested > MAX_IPV4_TARGETS {
        return Err(WorkflowError::invalid_parameters(
            &input.node.id,
            format!("{requested} IPv4 targets requested, at most {MAX_IPV4_TARGETS} are allowed"),
        ));
    }
    Ok(expand_ipv4_targets(targets, filter, empty_reason)?)
}

/// Parameters of builders that only take a pacing delay.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PacingParams {
    #[serde(default)]
    pub delay: u64,
}

impl PacingParams {
    pub fn parse(node: &GraphNode) -> WorkflowResult<Self> {
        let params: Self = parse_params(node)?;
        ensure_at_most(node, "delay", params.delay, MAX_DELAY_MS)?;
        Ok(params)
    }
}

/// Parameters shared by the ICMPv4 and ICMPv6 echo builders.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EchoParams {
    #[serde(default)]
    delay: u64,
    identifier: Option<u64>,
    sequence_start: Option<u64>,
    data_size: Option<u64>,
}

/// [`EchoParams`] after bounds checks and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EchoSettings {
    pub delay: u64,
    pub identifier: u16,
    pub sequence_start: u16,
    pub data_size: usize,
}

impl EchoParams {
    /// Validates against `max_data_size`. A missing identifier is drawn at random.
    pub fn parse(node: &GraphNode, max_data_size: usize) -> WorkflowResult<EchoSettings> {
        let params: Self = parse_params(node)?;
        let max_u16 = u64::from(u16::MAX);
        ensure_at_most(node, "delay", params.delay, MAX_DELAY_MS)?;

        let identifier = match params.identifier {
            Some(id) => {
                ensure_at_most(node, "identifier", id, max_u16)?;
                id as u16
            }
            None => rand::random::<u16>(),
        };
        let sequence_start = match params.sequence_start {
            Some(seq) => {
                ensure_at_most(node, "sequenceStart", seq, max_u16)?;
                seq as u16
            }
            None => DEFAULT_SEQUENCE_START,
        };
        let data_size = match params.data_size {
            Some(size) => {
                ensure_at_most(node, "dataSize", size, max_data_size as u64)?;
                size as usize
            }
            None => DEFAULT_DATA_SIZE,
        };

        Ok(EchoSettings {
            delay: params.delay,
            identifier,
            sequence_start,
            data_size,
        })
    }
}

pub(crate) fn resolve_interface(
    inventory: &dyn InterfaceInventory,
    context: &WorkflowContext,
    requirement: InterfaceRequirement,
) -> WorkflowResult<ResolvedInterface> {
    let name = context.interface().ok_or(InterfaceError::MissingName)?;
    Ok(interface::resolve(inventory, name, requirement)?)
}

/// The MAC a resolved interface was required to have.
pub(crate) fn source_mac(resolved: &ResolvedInterface) -> WorkflowResult<MacAddr> {
    resolved
        .mac
        .ok_or_else(|| InterfaceError::NoUsableMac(resolved.name.clone()).into())
}

/// Applies `mode` to a freshly built ICMPv6 message headed for `dst`.
pub(crate) fn finish_icmpv6(
    mode: ChecksumMode,
    packet: &mut [u8],
    src: Option<Ipv6Addr>,
    dst: Ipv6Addr,
) -> WorkflowResult<()> {
    match (mode, src) {
        (ChecksumMode::Transmitter, _) => Ok(()),
        (ChecksumMode::Builder, Some(src)) => Ok(icmpv6::fill_checksum(packet, src, dst)?),
        (ChecksumMode::Builder, None) => Err(WorkflowError::Packet(anyhow::anyhow!(
            "no IPv6 source address to compute the ICMPv6 checksum"
        ))),
    }
}

pub(crate) fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
