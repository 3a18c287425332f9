use std::collections::BTreeSet;

use meshroute_core::{Cost, NodeId, BASE_COST, INFINITE_COST};

use crate::error::RoutingError;
use crate::graph::CostGraph;

/// Applies join/leave events to a [`CostGraph`].
///
/// Invalidation is lazy: the graph's version bump is the only signal the
/// routing table needs, and paths are recomputed on the next lookup that
/// misses. Nothing here walks all pairs on churn, so a single event costs
/// O(degree) no matter how large the mesh grows.
#[derive(Debug, Clone)]
pub struct TopologyManager {
    local: NodeId,
    base_cost: Cost,
}

/// Outcome of reconciling the graph against the transport's neighbor set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyDelta {
    pub joined: Vec<NodeId>,
    pub left: Vec<NodeId>,
}

impl TopologyDelta {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

impl TopologyManager {
    pub fn new(local: NodeId, base_cost: Cost) -> Self {
        Self { local, base_cost }
    }

    /// A manager using [`BASE_COST`] for new links.
    pub fn with_defaults(local: NodeId) -> Self {
        Self::new(local, BASE_COST)
    }

    pub fn local(&self) -> NodeId {
        self.local
    }

    pub fn base_cost(&self) -> Cost {
        self.base_cost
    }

    /// A direct neighbor connected: insert `(local, id)` and `(id, local)`.
    ///
    /// Returns true if a new link was created. A link that is already live
    /// keeps its accumulated cost.
    pub fn neighbor_joined(&self, graph: &mut CostGraph, id: NodeId) -> Result<bool, RoutingError> {
        if id == self.local {
            return Ok(false);
        }
        graph.add_node(self.local);
        self.link_up(graph, self.local, id)
    }

    /// A direct neighbor disconnected: tear down every edge incident to it,
    /// then drop its record.
    ///
    /// Returns [`RoutingError::UnknownNode`] if `id` had no record; callers
    /// treat that as a no-op.
    pub fn neighbor_left(&self, graph: &mut CostGraph, id: NodeId) -> Result<(), RoutingError> {
        if id == self.local {
            return Ok(());
        }
        if !graph.contains(id) {
            return Err(RoutingError::UnknownNode(id));
        }

        let incident: Vec<NodeId> = graph.neighbors(id).keys().copied().collect();
        for other in incident {
            graph.set_cost(id, other, INFINITE_COST)?;
            graph.set_cost(other, id, INFINITE_COST)?;
        }
        graph.remove_node(id);

        tracing::debug!(node = %id, version = graph.version(), "node removed from cost graph");
        Ok(())
    }

    /// A link between `a` and `b` is up, as reported by the transport's
    /// mesh-wide view. Returns true if a new link was created.
    pub fn link_up(&self, graph: &mut CostGraph, a: NodeId, b: NodeId) -> Result<bool, RoutingError> {
        if a == b {
            return Err(RoutingError::SelfEdge(a));
        }
        if graph.cost(a, b).is_some() && graph.cost(b, a).is_some() {
            return Ok(false);
        }
        graph.set_cost(a, b, self.base_cost)?;
        graph.set_cost(b, a, self.base_cost)?;

        tracing::debug!(%a, %b, cost = self.base_cost, "link up");
        Ok(true)
    }

    /// A link between `a` and `b` went down.
    ///
    /// If it was a direct link of the local node, the far end is treated as
    /// a departed neighbor. Otherwise only the pair is torn down, and any
    /// node left with no edges at all is dropped. Returns the nodes removed.
    pub fn link_down(
        &self,
        graph: &mut CostGraph,
        a: NodeId,
        b: NodeId,
    ) -> Result<Vec<NodeId>, RoutingError> {
        if a == b {
            return Err(RoutingError::SelfEdge(a));
        }
        if a == self.local || b == self.local {
            let far = if a == self.local { b } else { a };
            return match self.neighbor_left(graph, far) {
                Ok(()) => Ok(vec![far]),
                Err(RoutingError::UnknownNode(_)) => Ok(Vec::new()),
                Err(e) => Err(e),
            };
        }

        graph.remove_edge(a, b);
        graph.remove_edge(b, a);

        let mut removed = Vec::new();
        for node in [a, b] {
            if graph.contains(node) && graph.neighbors(node).is_empty() {
                graph.remove_node(node);
                removed.push(node);
            }
        }
        Ok(removed)
    }

    /// Reconcile the local node's direct links with the transport's current
    /// neighbor set.
    pub fn sync_neighbors(
        &self,
        graph: &mut CostGraph,
        current: &BTreeSet<NodeId>,
    ) -> Result<TopologyDelta, RoutingError> {
        let known: BTreeSet<NodeId> = graph.live_neighbors(self.local).map(|(n, _)| n).collect();
        let mut delta = TopologyDelta::default();

        for id in current.difference(&known) {
            if self.neighbor_joined(graph, *id)? {
                delta.joined.push(*id);
            }
        }
        for id in known.difference(current) {
            match self.neighbor_left(graph, *id) {
                Ok(()) => delta.left.push(*id),
                Err(RoutingError::UnknownNode(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(delta)
    }
}
