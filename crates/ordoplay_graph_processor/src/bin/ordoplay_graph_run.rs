// SPDX-License-Identifier: MIT OR Apache-2.0
//! Run a graph snapshot from the command line.
//!
//! Usage: `ordoplay_graph_run <graph.ron> [config.ron]`

use ordoplay_graph_processor::{
    ConditionalProcessor, EngineConfig, EngineError, Graph, GraphProcessor, Node, NodeId, ProcessorEnv,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// How long to block on one pending wait before re-checking the others
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Longest the runner keeps a graph alive for pending waits
const WAIT_DEADLINE: Duration = Duration::from_secs(60);

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ordoplay_graph_processor=info,ordoplay_graph_run=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OrdoPlay graph runner v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args_os().skip(1);
    let Some(graph_path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: ordoplay_graph_run <graph.ron> [config.ron]");
        std::process::exit(2);
    };
    let config_path = args.next().map(PathBuf::from);

    if let Err(e) = run(graph_path, config_path) {
        tracing::error!("Run failed: {e}");
        std::process::exit(1);
    }
}

fn run(graph_path: PathBuf, config_path: Option<PathBuf>) -> Result<(), EngineError> {
    let config = match config_path {
        Some(path) => EngineConfig::load(&path)?,
        None => EngineConfig::default(),
    };
    let graph = Graph::load(&graph_path)?;
    tracing::info!(
        "Loaded '{}': {} nodes, {} edges",
        graph.name,
        graph.node_count(),
        graph.edge_count()
    );

    let mut processor = ConditionalProcessor::new(graph, ProcessorEnv::with_builtins().with_config(config))?;
    processor.add_observer(Box::new(|id: NodeId, node: &Node| {
        tracing::info!("Processed '{}' ({})", node.name, id);
    }));

    let report = processor.run()?;
    tracing::info!("Pass finished after {} node(s)", report.executed.len());

    // Untimed waits have nobody to fire them here; give up after a while
    let deadline = Instant::now() + WAIT_DEADLINE;
    while processor.pending_wait_count() > 0 {
        if Instant::now() >= deadline {
            tracing::warn!("{} wait(s) still pending, giving up", processor.pending_wait_count());
            break;
        }
        if let Some(wait) = processor.pending_waits().first() {
            wait.trigger.wait_timeout(WAIT_POLL_INTERVAL);
        }
        let executed = processor.poll_waits()?;
        if !executed.is_empty() {
            tracing::info!("Wait continuation ran {} node(s)", executed.len());
        }
    }

    for (name, value) in processor.graph().parameters() {
        tracing::info!("Parameter {name} = {value}");
    }
    Ok(())
}
