//! # Orchestrator
//!
//! Runs a prepared graph wave by wave. Every node whose dependencies have all
//! settled joins the current wave; the wave's steps execute concurrently and
//! the next wave only starts once all of them have finished.
//!
//! Step failures never abort the run. They are recorded against the node, and
//! every node downstream of a failed or skipped node is skipped.

use std::sync::Arc;

use futures::future::join_all;

use crate::error::{WorkflowError, WorkflowResult};
use crate::event::{EventSink, ExecutionSummary, NodeEvents, NodeStatus, WorkflowEventKind};
use crate::factory::StepResolver;
use crate::graph::{Dag, Graph};
use crate::step::{StepInput, StepOutput, WorkflowContext, WorkflowStep};

const TRACING_TARGET: &str = "probeflow_core::orchestrator";

/// Per-run tables, indexed like the [`Dag`].
struct RunState {
    status: Vec<NodeStatus>,
    outputs: Vec<Option<StepOutput>>,
    errors: Vec<Option<String>>,
}

impl RunState {
    fn new(len: usize) -> Self {
        Self {
            status: vec![NodeStatus::Pending; len],
            outputs: vec![None; len],
            errors: vec![None; len],
        }
    }

    fn transition(&mut self, idx: usize, next: NodeStatus) {
        debug_assert!(
            self.status[idx].can_transition_to(next),
            "illegal transition {:?} -> {next:?}",
            self.status[idx]
        );
        self.status[idx] = next;
    }

    fn blocked(&self, dag: &Dag, idx: usize) -> bool {
        dag.parents(idx)
            .iter()
            .any(|&parent| matches!(self.status[parent], NodeStatus::Failed | NodeStatus::Skipped))
    }

    fn input_for(&self, dag: &Dag, graph: &Graph, idx: usize) -> StepInput {
        let inputs = dag
            .parents(idx)
            .iter()
            .filter_map(|&parent| {
                self.outputs[parent]
                    .as_ref()
                    .map(|output| (dag.id(parent).to_string(), output.clone()))
            })
            .collect();
        StepInput {
            node: graph.nodes[idx].clone(),
            inputs,
        }
    }

    fn into_summary(self, dag: &Dag) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();
        let entries = self.status.into_iter().zip(self.outputs).zip(self.errors);
        for (idx, ((status, output), error)) in entries.enumerate() {
            let id = dag.id(idx).to_string();
            if let Some(output) = output {
                summary.output_by_node_id.insert(id.clone(), output);
            }
            if let Some(error) = error {
                summary.error_by_node_id.insert(id.clone(), error);
            }
            summary.status_by_node_id.insert(id, status);
        }
        summary
    }
}

struct Scheduled {
    idx: usize,
    step: Arc<dyn WorkflowStep>,
    input: StepInput,
    events: NodeEvents,
}

pub struct Orchestrator {
    resolver: Arc<dyn StepResolver>,
    sink: EventSink,
}

impl Orchestrator {
    pub fn new(resolver: Arc<dyn StepResolver>, sink: EventSink) -> Self {
        Self { resolver, sink }
    }

    /// Executes `graph` to completion. `dag` must have been prepared from the same graph,
    /// otherwise the run is refused with `InvalidGraph` before any event is emitted.
    ///
    /// Once started, a run always ends with a `workflow-complete` event carrying the returned summary.
    pub async fn run(&self, graph: &Graph, dag: &Dag, context: &WorkflowContext) -> WorkflowResult<ExecutionSummary> {
        ensure_matches(graph, dag)?;

        let mut state = RunState::new(dag.node_count());
        for idx in 0..dag.node_count() {
            self.sink.node(dag.id(idx)).status(NodeStatus::Pending);
        }

        let mut remaining = dag.in_degrees().to_vec();
        let mut ready = dag.roots();
        let mut wave = 0usize;

        while !ready.is_empty() {
            wave += 1;
            tracing::debug!(target: TRACING_TARGET, wave, nodes = ready.len(), "starting wave");

            let scheduled = self.schedule(graph, dag, &ready, &mut state);
            let outcomes = join_all(scheduled.into_iter().map(|job| execute(job, context))).await;

            for (idx, result) in outcomes {
                match result {
                    Ok(output) => {
                        state.outputs[idx] = Some(output);
                        state.transition(idx, NodeStatus::Completed);
                    }
                    Err(e) => {
                        state.errors[idx] = Some(e.to_string());
                        state.transition(idx, NodeStatus::Failed);
                    }
                }
            }

            let mut next = Vec::new();
            for &idx in &ready {
                for &child in dag.children(idx) {
                    remaining[child] -= 1;
                    if remaining[child] == 0 {
                        next.push(child);
                    }
                }
            }
            ready = next;
        }

        let summary = state.into_summary(dag);
        tracing::info!(
            target: TRACING_TARGET,
            completed = summary.count(NodeStatus::Completed),
            failed = summary.count(NodeStatus::Failed),
            skipped = summary.count(NodeStatus::Skipped),
            "workflow finished"
        );
        self.sink.emit(WorkflowEventKind::WorkflowComplete {
            result: summary.clone(),
        });
        Ok(summary)
    }

    /// Settles skips and unknown step types, and marks everything else running.
    fn schedule(&self, graph: &Graph, dag: &Dag, ready: &[usize], state: &mut RunState) -> Vec<Scheduled> {
        let mut scheduled = Vec::with_capacity(ready.len());

        for &idx in ready {
            let node = &graph.nodes[idx];
            let events = self.sink.node(&node.id);

            if state.blocked(dag, idx) {
                state.transition(idx, NodeStatus::Skipped);
                events.status(NodeStatus::Skipped);
                continue;
            }

            let step = match self.resolver.resolve(&node.node_type) {
                Ok(step) => step,
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(target: TRACING_TARGET, node = %node.id, "{message}");
                    state.errors[idx] = Some(message.clone());
                    state.transition(idx, NodeStatus::Failed);
                    events.status(NodeStatus::Failed);
                    events.error(message);
                    continue;
                }
            };

            state.transition(idx, NodeStatus::Running);
            events.status(NodeStatus::Running);
            scheduled.push(Scheduled {
                idx,
                step,
                input: state.input_for(dag, graph, idx),
                events,
            });
        }
        scheduled
    }
}

/// Node indices are shared between `graph` and `dag`, so both must list the same ids in the same order.
fn ensure_matches(graph: &Graph, dag: &Dag) -> WorkflowResult<()> {
    let same = graph.nodes.len() == dag.node_count()
        && graph.nodes.iter().enumerate().all(|(idx, node)| node.id == dag.id(idx));
    if !same {
        return Err(WorkflowError::invalid_graph("Graph does not match the prepared DAG"));
    }
    Ok(())
}

async fn execute(job: Scheduled, context: &WorkflowContext) -> (usize, WorkflowResult<StepOutput>) {
    let Scheduled { idx, step, input, events } = job;
    let result = step.execute(context, &input, &events).await;
    match &result {
        Ok(_) => events.status(NodeStatus::Completed),
        Err(e) => {
            tracing::debug!(target: TRACING_TARGET, node = %input.node.id, error = %e, "step failed");
            events.status(NodeStatus::Failed);
            events.error(e.to_string());
        }
    }
    (idx, result)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
