//! Meshroute simulated mesh: entry point.
//!
//! Builds an in-process mesh from a TOML file or defaults, runs one routing
//! engine per node, replays the scripted topology changes and reports what
//! every node saw.

// Some node accessors are only exercised by tests.
#![allow(dead_code)]

mod commands;
mod config;
mod node;
mod sim;
mod state;

use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing_subscriber::EnvFilter;

use meshroute_core::NodeId;

use config::{MeshConfig, ScriptedEvent};
use node::{MeshNode, NodeHandle};
use sim::SimulatedMesh;

/// Meshroute simulated mesh
#[derive(Parser, Debug)]
#[command(name = "meshroute-node", version, about = "Cost-adaptive mesh routing simulator")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "meshroute.toml")]
    config: PathBuf,

    /// Override the sink node id.
    #[arg(long)]
    sink: Option<NodeId>,

    /// Override the run duration, in seconds.
    #[arg(long)]
    duration: Option<u64>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        let config = MeshConfig::default();
        config.save(&args.config)?;
        println!("wrote default config to {}", args.config.display());
        return Ok(());
    }

    // Load configuration
    let mut config = MeshConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(sink) = args.sink {
        config.routing.sink = Some(sink);
    }
    if let Some(duration) = args.duration {
        config.simulation.duration_secs = duration;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, &config.logging.format);
    config.validate()?;

    tracing::info!("Meshroute node simulator v{}", env!("CARGO_PKG_VERSION"));

    let (mesh, endpoints) = SimulatedMesh::new(&config.simulation.nodes);
    for [a, b] in &config.simulation.links {
        mesh.connect(*a, *b);
    }

    let mut handles = HashMap::new();
    let mut tasks = Vec::new();
    for (transport, inbox) in endpoints {
        let (node, handle) = MeshNode::new(transport, inbox, config.routing.clone())?;
        handles.insert(handle.id(), handle);
        tasks.push(tokio::spawn(node.run()));
    }
    tracing::info!(
        nodes = handles.len(),
        links = mesh.links().len(),
        sink = ?config.routing.sink,
        "mesh started"
    );

    let start = Instant::now();
    let duration = Duration::from_secs(config.simulation.duration_secs);
    let timeline = config.timeline();

    let run = async {
        for event in timeline {
            let at = Duration::from_secs(event.at_secs());
            if at > duration {
                tracing::warn!(?event, "scripted event falls after the end of the run");
                continue;
            }
            sleep_until(start + at).await;
            apply(&mesh, &handles, &config, event).await;
        }
        sleep_until(start + duration).await;
    };

    tokio::select! {
        _ = run => {
            tracing::info!("simulation finished");
        }
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => tracing::info!("received shutdown signal"),
                Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
            }
        }
    }

    for handle in handles.values() {
        handle.shutdown().await;
    }

    let mut reports = Vec::new();
    for task in tasks {
        match task.await {
            Ok(report) => reports.push(report),
            Err(e) => tracing::error!(error = %e, "node task failed"),
        }
    }
    reports.sort_by_key(|r| r.node);

    for report in &reports {
        tracing::info!(
            node = %report.node,
            role = %report.role,
            originated = report.stats.originated,
            forwarded = report.stats.forwarded,
            delivered = report.stats.delivered,
            dropped = report.stats.dropped,
            graph_version = report.graph_version,
            cache_hits = report.cache_hits,
            cache_misses = report.cache_misses,
            "node report"
        );
    }
    println!("{}", serde_json::to_string_pretty(&reports)?);

    tracing::info!("meshroute simulator exited cleanly");
    Ok(())
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

async fn apply(
    mesh: &SimulatedMesh,
    handles: &HashMap<NodeId, NodeHandle>,
    config: &MeshConfig,
    event: ScriptedEvent,
) {
    tracing::info!(?event, "applying scripted event");
    match event {
        ScriptedEvent::LinkDown { a, b, .. } => {
            if !mesh.disconnect(a, b) {
                tracing::warn!(%a, %b, "link was already down");
            }
        }
        ScriptedEvent::LinkUp { a, b, .. } => {
            if !mesh.connect(a, b) {
                tracing::warn!(%a, %b, "link was already up");
            }
        }
        ScriptedEvent::NodeDown { node, .. } => {
            mesh.node_down(node);
        }
        ScriptedEvent::Originate { node, .. } => {
            let Some(handle) = handles.get(&node) else {
                return;
            };
            match handle.originate(config.routing.payload_for(node)).await {
                Ok(response) => tracing::info!(%node, path = %response.path, "scripted message sent"),
                Err(e) => tracing::warn!(%node, error = %e, "scripted message failed"),
            }
        }
    }
}
