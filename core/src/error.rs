use probeflow_common::network::interface::InterfaceError;
use probeflow_common::network::target::AddressError;
use thiserror::Error;

use crate::injector::{ProtocolFamily, TransmitError};

/// Convenience type alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Everything that can stop a graph from being prepared or a node from completing.
///
/// Preparation errors abort a run before any node executes. Every other variant
/// is caught by the orchestrator and recorded against the node that raised it.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The graph is structurally unusable (no nodes, no edge list, duplicate ids, dangling edges).
    #[error("{0}")]
    InvalidGraph(String),

    /// Kahn's algorithm could not resolve every node.
    #[error("Cycle detected in workflow graph")]
    CycleDetected,

    /// A node's `data` does not fit the parameters of its step.
    #[error("Invalid parameters for node {node}: {reason}")]
    InvalidParameters { node: String, reason: String },

    /// An address failed its grammar, a range was inverted, or no targets were left.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// The run's interface cannot source this packet type.
    #[error(transparent)]
    Interface(#[from] InterfaceError),

    /// A packet builder rejected its input.
    #[error(transparent)]
    Packet(#[from] anyhow::Error),

    /// A transmitter could not be brought up on the chosen interface.
    #[error("Failed to initialize {} on interface \"{interface}\"", family.injector_name())]
    InjectorInitFailed {
        family: ProtocolFamily,
        interface: String,
        #[source]
        source: TransmitError,
    },

    /// The run context carries no interface for the sink to transmit on.
    #[error("Interface name not found in workflow context")]
    MissingInterface,

    /// The sink found nothing to send among its parents' outputs.
    #[error("No packet streams found in inputs")]
    NoPacketStreams,

    /// The node type has no step behind it.
    #[error("Unsupported step type: {0}")]
    UnsupportedStepType(String),
}

impl WorkflowError {
    pub fn invalid_graph(message: impl Into<String>) -> Self {
        WorkflowError::InvalidGraph(message.into())
    }

    pub fn invalid_parameters(node: &str, reason: impl Into<String>) -> Self {
        WorkflowError::InvalidParameters {
            node: node.to_string(),
            reason: reason.into(),
        }
    }
}
