//! # Workflow Events
//!
//! Progress and diagnostics leave the engine as [`WorkflowEvent`] values pushed
//! into an unbounded channel. The orchestrator and the steps are producers; the
//! caller holding the receiver is the only consumer.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::step::StepOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed | NodeStatus::Skipped)
    }

    /// `pending -> running -> {completed | failed}` or `pending -> skipped`.
    ///
    /// `pending -> failed` is also legal for nodes whose step cannot be created.
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (NodeStatus::Pending, NodeStatus::Running)
                | (NodeStatus::Pending, NodeStatus::Skipped)
                | (NodeStatus::Pending, NodeStatus::Failed)
                | (NodeStatus::Running, NodeStatus::Completed)
                | (NodeStatus::Running, NodeStatus::Failed)
        )
    }
}

/// Final per-node outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub status_by_node_id: BTreeMap<String, NodeStatus>,
    pub output_by_node_id: BTreeMap<String, StepOutput>,
    pub error_by_node_id: BTreeMap<String, String>,
}

impl ExecutionSummary {
    pub fn count(&self, status: NodeStatus) -> usize {
        self.status_by_node_id.values().filter(|s| **s == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(NodeStatus::Failed) > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum WorkflowEventKind {
    NodeStatus { node_id: String, status: NodeStatus },
    NodeError { node_id: String, error_message: String },
    NodeInfo { node_id: String, message: String },
    NodeWarning { node_id: String, message: String },
    WorkflowStart,
    WorkflowComplete { result: ExecutionSummary },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowEvent {
    /// Milliseconds since the Unix epoch at creation.
    pub timestamp: i64,
    #[serde(flatten)]
    pub kind: WorkflowEventKind,
}

impl WorkflowEvent {
    pub fn now(kind: WorkflowEventKind) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            kind,
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        match &self.kind {
            WorkflowEventKind::NodeStatus { node_id, .. }
            | WorkflowEventKind::NodeError { node_id, .. }
            | WorkflowEventKind::NodeInfo { node_id, .. }
            | WorkflowEventKind::NodeWarning { node_id, .. } => Some(node_id),
            WorkflowEventKind::WorkflowStart | WorkflowEventKind::WorkflowComplete { .. } => None,
        }
    }
}

/// Producer side of the event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<WorkflowEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink without subscriber; every event is dropped.
    pub fn discard() -> Self {
        Self { tx: None }
    }

    /// Timestamps and publishes `kind`. A receiver that went away is not an error.
    pub fn emit(&self, kind: WorkflowEventKind) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(WorkflowEvent::now(kind));
        }
    }

    pub fn node(&self, node_id: &str) -> NodeEvents {
        NodeEvents {
            sink: self.clone(),
            node_id: node_id.to_string(),
        }
    }
}

/// Event sink scoped to a single node; this is the progress channel a step sees.
#[derive(Debug, Clone)]
pub struct NodeEvents {
    sink: EventSink,
    node_id: String,
}

impl NodeEvents {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn status(&self, status: NodeStatus) {
        self.sink.emit(WorkflowEventKind::NodeStatus {
            node_id: self.node_id.clone(),
            status,
        });
    }

    pub fn error(&self, error_message: impl Into<String>) {
        self.sink.emit(WorkflowEventKind::NodeError {
            node_id: self.node_id.clone(),
            error_message: error_message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.sink.emit(WorkflowEventKind::NodeInfo {
            node_id: self.node_id.clone(),
            message: message.into(),
        });
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.sink.emit(WorkflowEventKind::NodeWarning {
            node_id: self.node_id.clone(),
            message: message.into(),
        });
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
