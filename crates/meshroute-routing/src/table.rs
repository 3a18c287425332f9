use std::collections::HashMap;

use meshroute_core::NodeId;
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::graph::CostGraph;
use crate::path::Path;
use crate::pathfinder::PathFinder;

/// A cached path together with the graph version it was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// The path from the local node to the destination.
    pub path: Path,
    /// [`CostGraph::version`] at computation time.
    pub graph_version: u64,
}

impl RouteEntry {
    /// Returns true if the graph has changed since this entry was computed.
    pub fn is_stale(&self, graph: &CostGraph) -> bool {
        self.graph_version != graph.version()
    }
}

/// Lookup counters, exposed so recomputation can be observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that ran the path finder.
    pub misses: u64,
}

/// Per-destination path cache of the local node.
///
/// Entries are never invalidated eagerly; a lookup compares the stored
/// version against the graph's and recomputes on mismatch. Failed searches
/// are never cached, so the next lookup after any topology change retries.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    local: NodeId,
    finder: PathFinder,
    entries: HashMap<NodeId, RouteEntry>,
    stats: CacheStats,
}

impl RoutingTable {
    /// Create a new, empty table for paths leaving `local`.
    pub fn new(local: NodeId) -> Self {
        Self {
            local,
            finder: PathFinder::new(),
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn local(&self) -> NodeId {
        self.local
    }

    /// Path from the local node to `destination`, cached when still fresh.
    pub fn resolve(&mut self, graph: &CostGraph, destination: NodeId) -> Result<Path, RoutingError> {
        if let Some(entry) = self.entries.get(&destination) {
            if !entry.is_stale(graph) {
                self.stats.hits += 1;
                return Ok(entry.path.clone());
            }
        }

        self.stats.misses += 1;
        match self.finder.shortest_path(graph, self.local, destination) {
            Ok(path) => {
                self.entries.insert(
                    destination,
                    RouteEntry {
                        path: path.clone(),
                        graph_version: graph.version(),
                    },
                );
                Ok(path)
            }
            Err(e) => {
                self.entries.remove(&destination);
                Err(e)
            }
        }
    }

    /// The cached entry for `destination`, fresh or not.
    pub fn cached(&self, destination: NodeId) -> Option<&RouteEntry> {
        self.entries.get(&destination)
    }


    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
