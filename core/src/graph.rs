//! # Workflow Graph
//!
//! Turns the node/edge document authored in the editor into a [`Dag`].
//!
//! Preparation runs in three fail-fast stages, all before any step executes:
//! 1. [`validate`] checks the document's structure.
//! 2. [`build_dag`] derives adjacency and in-degrees in one pass over the edges.
//! 3. [`assert_acyclic`] runs Kahn's algorithm over the result.

use std::collections::{HashMap, HashSet, VecDeque};
use std::str::FromStr;

use probeflow_common::config::EngineConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WorkflowError, WorkflowResult};
use crate::factory::StepKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Step specific parameters, interpreted by the step itself.
    #[serde(default)]
    pub data: Value,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// The raw document. `edges` stays optional so a missing list can be told apart from an empty one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Option<Vec<GraphEdge>>,
}

impl Graph {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self {
            nodes,
            edges: Some(edges),
        }
    }

    pub fn edges(&self) -> &[GraphEdge] {
        self.edges.as_deref().unwrap_or_default()
    }
}

impl FromStr for Graph {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|e| WorkflowError::invalid_graph(format!("Malformed graph document: {e}")))
    }
}

/// Read-only, index based view of a validated graph.
///
/// Node indices follow declaration order in the document, so two
/// preparations of the same graph produce identical values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dag {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
    parents: Vec<Vec<usize>>,
    in_degree: Vec<usize>,
}

impl Dag {
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn id(&self, idx: usize) -> &str {
        &self.ids[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Dependents of `idx`, once per edge.
    pub fn children(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    /// Direct parents of `idx` in edge declaration order, each listed once.
    pub fn parents(&self, idx: usize) -> &[usize] {
        &self.parents[idx]
    }

    pub fn in_degree(&self, idx: usize) -> usize {
        self.in_degree[idx]
    }

    pub fn in_degrees(&self) -> &[usize] {
        &self.in_degree
    }

    pub fn roots(&self) -> Vec<usize> {
        (0..self.node_count()).filter(|&i| self.in_degree[i] == 0).collect()
    }

    /// Groups nodes into the waves the orchestrator will run, by node id.
    pub fn waves(&self) -> Vec<Vec<&str>> {
        let mut remaining = self.in_degree.clone();
        let mut ready = self.roots();
        let mut waves = Vec::new();

        while !ready.is_empty() {
            let mut next = Vec::new();
            for &node in &ready {
                for &child in &self.children[node] {
                    remaining[child] -= 1;
                    if remaining[child] == 0 {
                        next.push(child);
                    }
                }
            }
            waves.push(ready.iter().map(|&i| self.ids[i].as_str()).collect());
            ready = next;
        }
        waves
    }
}

pub fn validate(graph: &Graph) -> WorkflowResult<()> {
    if graph.nodes.is_empty() {
        return Err(WorkflowError::invalid_graph("Graph has no nodes"));
    }
    let Some(edges) = graph.edges.as_ref() else {
        return Err(WorkflowError::invalid_graph("Graph has no edges"));
    };

    let mut seen: HashSet<&str> = HashSet::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(WorkflowError::invalid_graph(format!("Duplicate node id: {}", node.id)));
        }
    }

    for edge in edges {
        if !seen.contains(edge.source.as_str()) {
            return Err(WorkflowError::invalid_graph(format!("Edge source not found: {}", edge.source)));
        }
        if !seen.contains(edge.target.as_str()) {
            return Err(WorkflowError::invalid_graph(format!("Edge target not found: {}", edge.target)));
        }
    }

    Ok(())
}

/// Builds adjacency and in-degrees. Expects a graph that passed [`validate`].
pub fn build_dag(graph: &Graph) -> WorkflowResult<Dag> {
    let ids: Vec<String> = graph.nodes.iter().map(|node| node.id.clone()).collect();
    let index: HashMap<String, usize> = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();

    let mut children = vec![Vec::new(); ids.len()];
    let mut parents: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    let mut in_degree = vec![0usize; ids.len()];

    for edge in graph.edges() {
        let (Some(&source), Some(&target)) = (index.get(&edge.source), index.get(&edge.target)) else {
            return Err(WorkflowError::invalid_graph(format!(
                "Edge references unknown node: {} -> {}",
                edge.source, edge.target
            )));
        };
        children[source].push(target);
        in_degree[target] += 1;
        if !parents[target].contains(&source) {
            parents[target].push(source);
        }
    }

    Ok(Dag {
        ids,
        index,
        children,
        parents,
        in_degree,
    })
}

pub fn assert_acyclic(dag: &Dag) -> WorkflowResult<()> {
    let mut in_degree = dag.in_degree.clone();
    let mut queue: VecDeque<usize> = dag.roots().into();
    let mut resolved = 0usize;

    while let Some(node) = queue.pop_front() {
        resolved += 1;
        for &child in dag.children(node) {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    if resolved < dag.node_count() {
        return Err(WorkflowError::CycleDetected);
    }
    Ok(())
}

pub fn prepare_graph(graph: &Graph) -> WorkflowResult<Dag> {
    validate(graph)?;
    let dag = build_dag(graph)?;
    assert_acyclic(&dag)?;
    Ok(dag)
}

/// [`prepare_graph`], plus load-time rejection of unknown step types when the config asks for it.
pub fn prepare_graph_with(graph: &Graph, config: &EngineConfig) -> WorkflowResult<Dag> {
    let dag = prepare_graph(graph)?;
    if config.strict_step_types {
        for node in &graph.nodes {
            StepKind::from_str(&node.node_type)?;
        }
    }
    Ok(dag)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
