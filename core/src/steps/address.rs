//! Address generators. They only parse their own parameters and never touch the network.

use async_trait::async_trait;
use probeflow_common::network::range::Ipv4Range;
use probeflow_common::network::target::{parse_ipv4, parse_ipv6};
use serde::Deserialize;

use crate::error::WorkflowResult;
use crate::event::NodeEvents;
use crate::factory::StepKind;
use crate::step::{StepInput, StepOutput, WorkflowContext, WorkflowStep};
use crate::steps::parse_params;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeParams {
    start_ip: String,
    end_ip: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SingleParams {
    ip_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SingleV6Params {
    ipv6_address: String,
}

/// `ip-range`: emits the inclusive IPv4 range `startIp..=endIp`.
///
/// Ordering of the bounds is checked by the consumers, which walk the range.
pub struct IpRangeStep;

#[async_trait]
impl WorkflowStep for IpRangeStep {
    fn kind(&self) -> StepKind {
        StepKind::IpRange
    }

    async fn execute(
        &self,
        _context: &WorkflowContext,
        input: &StepInput,
        _events: &NodeEvents,
    ) -> WorkflowResult<StepOutput> {
        let params: RangeParams = parse_params(&input.node)?;
        let start = parse_ipv4(&params.start_ip)?;
        let end = parse_ipv4(&params.end_ip)?;
        Ok(StepOutput::AddressRange(Ipv4Range::new(start, end)))
    }
}

/// `ip-single`: emits one IPv4 address.
pub struct IpSingleStep;

#[async_trait]
impl WorkflowStep for IpSingleStep {
    fn kind(&self) -> StepKind {
        StepKind::IpSingle
    }

    async fn execute(
        &self,
        _context: &WorkflowContext,
        input: &StepInput,
        _events: &NodeEvents,
    ) -> WorkflowResult<StepOutput> {
        let params: SingleParams = parse_params(&input.node)?;
        Ok(StepOutput::ipv4(parse_ipv4(&params.ip_address)?))
    }
}

/// `ipv6-single`: emits one IPv6 address.
pub struct Ipv6SingleStep;

#[async_trait]
impl WorkflowStep for Ipv6SingleStep {
    fn kind(&self) -> StepKind {
        StepKind::Ipv6Single
    }

    async fn execute(
        &self,
        _context: &WorkflowContext,
        input: &StepInput,
        _events: &NodeEvents,
    ) -> WorkflowResult<StepOutput> {
        let params: SingleV6Params = parse_params(&input.node)?;
        Ok(StepOutput::ipv6(parse_ipv6(&params.ipv6_address)?))
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
