use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use meshroute_core::NodeId;

use crate::error::RoutingError;
use crate::graph::CostGraph;
use crate::path::Path;

/// Shortest-path search over a [`CostGraph`] snapshot.
///
/// Plain Dijkstra with early exit: the search stops as soon as the target is
/// popped from the frontier, which is sound because every stored cost is at
/// least 1. Runs in O((V + E) log V).
#[derive(Debug, Clone, Copy, Default)]
pub struct PathFinder;

/// Internal node representation for the priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchNode {
    node: NodeId,
    /// Tentative distance from the source.
    distance: u64,
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse so the smallest distance pops
        // first, lowest node id breaking ties.
        other
            .distance
            .cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PathFinder {
    pub fn new() -> Self {
        Self
    }

    /// Find the cheapest path from `from` to `to`.
    ///
    /// Returns [`RoutingError::RouteNotFound`] when the frontier empties
    /// before `to` is reached; callers treat that as "no route currently
    /// known".
    pub fn shortest_path(
        &self,
        graph: &CostGraph,
        from: NodeId,
        to: NodeId,
    ) -> Result<Path, RoutingError> {
        if from == to {
            return Ok(Path::local(from));
        }

        let mut distances: HashMap<NodeId, u64> = HashMap::new();
        let mut previous: HashMap<NodeId, NodeId> = HashMap::new();
        let mut heap = BinaryHeap::new();

        distances.insert(from, 0);
        heap.push(SearchNode {
            node: from,
            distance: 0,
        });

        while let Some(SearchNode { node, distance }) = heap.pop() {
            if node == to {
                return Ok(Self::rebuild(&previous, from, to, distance));
            }

            // Stale heap entry: a cheaper one was already expanded.
            if distances.get(&node).is_some_and(|best| distance > *best) {
                continue;
            }

            for (next, cost) in graph.live_neighbors(node) {
                let candidate = distance + u64::from(cost);
                let improves = distances
                    .get(&next)
                    .map_or(true, |known| candidate < *known);
                if improves {
                    distances.insert(next, candidate);
                    previous.insert(next, node);
                    heap.push(SearchNode {
                        node: next,
                        distance: candidate,
                    });
                }
            }
        }

        tracing::debug!(%from, %to, explored = distances.len(), "frontier exhausted");
        Err(RoutingError::RouteNotFound { from, to })
    }

    /// Total cost of walking `nodes` in order, or `None` if any link along
    /// the way is missing or torn down.
    pub fn path_cost(graph: &CostGraph, nodes: &[NodeId]) -> Option<u64> {
        nodes.windows(2).try_fold(0u64, |acc, pair| {
            graph
                .cost(pair[0], pair[1])
                .map(|cost| acc + u64::from(cost))
        })
    }

    fn rebuild(previous: &HashMap<NodeId, NodeId>, from: NodeId, to: NodeId, cost: u64) -> Path {
        let mut nodes = vec![to];
        let mut current = to;
        while current != from {
            match previous.get(&current) {
                Some(prev) => {
                    current = *prev;
                    nodes.push(current);
                }
                None => break,
            }
        }
        nodes.reverse();
        Path::new(nodes, cost).unwrap_or_else(|| Path::local(from))
    }
}
