//! Commands dispatched from the simulation driver to a node's event loop.

use meshroute_core::{NodeId, Role};
use meshroute_routing::{CacheStats, EngineStats};
use serde::Serialize;
use tokio::sync::oneshot;

/// A command sent from the driver to one node's main event loop.
pub enum NodeCommand {
    /// Originate a message toward the configured sink right away.
    Originate {
        payload: String,
        reply: oneshot::Sender<Result<OriginateResponse, String>>,
    },
    /// Report the node's counters.
    Report { reply: oneshot::Sender<NodeReport> },
    /// Leave the event loop.
    Shutdown,
}

/// Result of a driver-initiated origination.
#[derive(Debug, Clone, Serialize)]
pub struct OriginateResponse {
    pub message_id: String,
    pub next_hop: Option<NodeId>,
    pub path: String,
}

/// Snapshot of one node's state at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub node: NodeId,
    pub role: Role,
    pub stats: EngineStats,
    pub graph_version: u64,
    pub known_nodes: usize,
    pub live_links: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl NodeReport {
    pub(crate) fn new(
        node: NodeId,
        role: Role,
        stats: EngineStats,
        graph_version: u64,
        known_nodes: usize,
        live_links: usize,
        cache: CacheStats,
    ) -> Self {
        Self {
            node,
            role,
            stats,
            graph_version,
            known_nodes,
            live_links,
            cache_hits: cache.hits,
            cache_misses: cache.misses,
        }
    }
}
