//! # Workflow Engine
//!
//! Entry point for callers. Wires the step factory to the host (or to
//! whatever inventory and transmitters it is given) and runs one graph per call.

use std::sync::Arc;

use probeflow_common::config::EngineConfig;
use probeflow_common::network::interface::InterfaceInventory;

use crate::error::WorkflowResult;
use crate::event::{EventSink, ExecutionSummary, WorkflowEventKind};
use crate::factory::{StepFactory, StepResolver, StepServices};
use crate::graph::{self, Dag, Graph};
use crate::injector::TransmitterFactory;
use crate::network::SystemTransmitters;
use crate::orchestrator::Orchestrator;
use crate::step::WorkflowContext;
use crate::system::SystemInventory;

const TRACING_TARGET: &str = "probeflow_core::engine";

/// Application service for analysis workflows.
///
/// A run goes through:
/// 1. **Preparation**: validation, DAG construction and cycle detection. Failures surface here, before any event.
/// 2. **Execution**: wavefront scheduling of the steps, reported on the event sink.
pub struct Engine {
    resolver: Arc<dyn StepResolver>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        inventory: Arc<dyn InterfaceInventory>,
        transmitters: Arc<dyn TransmitterFactory>,
        config: EngineConfig,
    ) -> Self {
        let factory = StepFactory::new(StepServices::new(inventory, transmitters, config));
        Self::with_resolver(Arc::new(factory), config)
    }

    /// Engine bound to the host's interfaces and raw sockets.
    pub fn system(config: EngineConfig) -> Self {
        Self::new(Arc::new(SystemInventory), Arc::new(SystemTransmitters), config)
    }

    pub fn with_resolver(resolver: Arc<dyn StepResolver>, config: EngineConfig) -> Self {
        Self { resolver, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn prepare(&self, graph: &Graph) -> WorkflowResult<Dag> {
        graph::prepare_graph_with(graph, &self.config)
    }

    /// Prepares and runs `graph`, streaming progress into `sink`.
    pub async fn start(
        &self,
        graph: &Graph,
        context: &WorkflowContext,
        sink: EventSink,
    ) -> WorkflowResult<ExecutionSummary> {
        let dag = self.prepare(graph)?;
        tracing::info!(
            target: TRACING_TARGET,
            nodes = dag.node_count(),
            interface = context.interface().unwrap_or("-"),
            "starting workflow"
        );

        sink.emit(WorkflowEventKind::WorkflowStart);
        let orchestrator = Orchestrator::new(self.resolver.clone(), sink);
        orchestrator.run(graph, &dag, context).await
    }
}
