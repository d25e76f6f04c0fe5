use probeflow_common::config::EngineConfig;
use probeflow_core::graph;

use crate::commands::{ValidateArgs, load_graph};
use crate::terminal::print;

pub fn validate(args: ValidateArgs) -> anyhow::Result<()> {
    let graph = load_graph(&args.graph)?;
    let config = EngineConfig {
        strict_step_types: args.strict,
        ..EngineConfig::default()
    };
    let dag = graph::prepare_graph_with(&graph, &config)?;

    print::header("workflow plan");
    print::waves(&graph, &dag);
    Ok(())
}
