use anyhow::bail;
use probeflow_core::engine::Engine;
use probeflow_core::event::{EventSink, NodeStatus};
use probeflow_core::step::WorkflowContext;

use crate::commands::{RunArgs, load_graph};
use crate::terminal::print;

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let graph = load_graph(&args.graph)?;
    let engine = Engine::system(args.config());
    let context = WorkflowContext::with_interface(args.interface.as_str());

    if !args.json {
        print::header("running workflow");
    }

    let (sink, mut rx) = EventSink::channel();
    let json = args.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if json {
                print::event_json(&event);
            } else {
                print::event(&event);
            }
        }
    });

    let outcome = engine.start(&graph, &context, sink).await;
    printer.await?;
    let summary = outcome?;

    if !json {
        print::summary(&summary);
    }

    let failed = summary.count(NodeStatus::Failed);
    if failed > 0 {
        bail!("{failed} node(s) failed");
    }
    Ok(())
}
