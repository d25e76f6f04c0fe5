//! Human readable rendering of workflow events on stdout.
//!
//! Logs go to stderr through [`super::logging`], so stdout carries only the
//! event stream and can be piped.

use colored::*;
use probeflow_core::event::{ExecutionSummary, NodeStatus, WorkflowEvent, WorkflowEventKind};
use probeflow_core::graph::{Dag, Graph};
use probeflow_core::step::StepOutput;

const SEPARATOR_WIDTH: usize = 60;

pub fn header(msg: &str) {
    let title = format!(" {} ", msg.to_uppercase());
    let pad = SEPARATOR_WIDTH.saturating_sub(title.len());
    let left = pad / 2;
    println!(
        "{}{}{}",
        "═".repeat(left).bright_black(),
        title.bold(),
        "═".repeat(pad - left).bright_black()
    );
}

fn separator() {
    println!("{}", "─".repeat(SEPARATOR_WIDTH).bright_black());
}

pub fn status(status: NodeStatus) -> ColoredString {
    let label = format!("{status:?}").to_lowercase();
    match status {
        NodeStatus::Pending => label.dimmed(),
        NodeStatus::Running => label.cyan(),
        NodeStatus::Completed => label.green().bold(),
        NodeStatus::Failed => label.red().bold(),
        NodeStatus::Skipped => label.yellow(),
    }
}

pub fn event(event: &WorkflowEvent) {
    match &event.kind {
        WorkflowEventKind::NodeStatus { node_id, status: s } => {
            // every node starts pending; only transitions are worth a line
            if *s != NodeStatus::Pending {
                println!("{} {}", node(node_id), status(*s));
            }
        }
        WorkflowEventKind::NodeInfo { node_id, message } => {
            println!("{} {}", node(node_id), message);
        }
        WorkflowEventKind::NodeWarning { node_id, message } => {
            println!("{} {}", node(node_id), message.yellow());
        }
        WorkflowEventKind::NodeError { node_id, error_message } => {
            println!("{} {}", node(node_id), error_message.red());
        }
        WorkflowEventKind::WorkflowStart => {}
        WorkflowEventKind::WorkflowComplete { .. } => separator(),
    }
}

/// One JSON object per line, in the shape consumers of the event stream expect.
pub fn event_json(event: &WorkflowEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!("failed to encode event: {e}"),
    }
}

pub fn summary(summary: &ExecutionSummary) {
    for (id, s) in &summary.status_by_node_id {
        let detail = match (summary.output_by_node_id.get(id), summary.error_by_node_id.get(id)) {
            (_, Some(error)) => error.red().to_string(),
            (Some(output), None) => describe(output),
            (None, None) => String::new(),
        };
        println!("{:<24} {:<10} {}", id.bold(), status(*s), detail.dimmed());
    }

    println!(
        "{} completed, {} failed, {} skipped",
        summary.count(NodeStatus::Completed).to_string().green().bold(),
        summary.count(NodeStatus::Failed).to_string().red().bold(),
        summary.count(NodeStatus::Skipped).to_string().yellow(),
    );
}

pub fn waves(graph: &Graph, dag: &Dag) {
    for (i, wave) in dag.waves().into_iter().enumerate() {
        let nodes: Vec<String> = wave
            .iter()
            .map(|id| format!("{} ({})", id.bold(), node_type(graph, id).dimmed()))
            .collect();
        println!("{} {}", format!("wave {}:", i + 1).cyan(), nodes.join(", "));
    }
    println!("{} nodes, {} edges", dag.node_count(), graph.edges().len());
}

fn node_type<'a>(graph: &'a Graph, id: &str) -> &'a str {
    graph
        .nodes
        .iter()
        .find(|n| n.id == id)
        .map(|n| n.node_type.as_str())
        .unwrap_or("?")
}

fn node(id: &str) -> ColoredString {
    format!("[{id}]").bright_black()
}

fn describe(output: &StepOutput) -> String {
    match output {
        StepOutput::AddressRange(range) => format!("range {}-{}", range.start_addr, range.end_addr),
        StepOutput::SingleAddress(addr) => format!("address {addr}"),
        StepOutput::PacketStream(stream) => {
            format!("{} stream, {} packets", stream.kind, stream.packet_count())
        }
        StepOutput::Sent(reports) => reports
            .iter()
            .map(|r| format!("{}: {}/{}", r.kind, r.sent, r.total))
            .collect::<Vec<_>>()
            .join(", "),
    }
}
