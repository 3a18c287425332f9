use std::collections::BTreeMap;

use meshroute_core::{is_finite, Cost, NodeId, BASE_COST, INFINITE_COST};

use crate::error::RoutingError;

/// Adjacency of a single node: neighbor -> link cost.
pub type Adjacency = BTreeMap<NodeId, Cost>;

static NO_NEIGHBORS: Adjacency = BTreeMap::new();

/// Weighted adjacency model of the mesh, as seen from one node.
///
/// Costs are stored per directed pair. A missing pair means "no edge"; a pair
/// stored at [`INFINITE_COST`] is a torn-down edge whose endpoint records
/// still exist. Self-edges are never stored.
///
/// Every mutation advances [`version`](Self::version), which is what the
/// routing table compares against to detect stale paths.
#[derive(Debug, Clone, Default)]
pub struct CostGraph {
    adjacency: BTreeMap<NodeId, Adjacency>,
    version: u64,
}

impl CostGraph {
    /// Create a new, empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Ensure `id` has a (possibly empty) record. Returns true if it was new.
    pub fn add_node(&mut self, id: NodeId) -> bool {
        if self.adjacency.contains_key(&id) {
            return false;
        }
        self.adjacency.insert(id, Adjacency::new());
        self.bump();
        true
    }

    /// Returns true if `id` has a record.
    pub fn contains(&self, id: NodeId) -> bool {
        self.adjacency.contains_key(&id)
    }

    /// Overwrite the cost of the directed pair `(from, to)`.
    ///
    /// `cost` must be at least 1; [`INFINITE_COST`] marks the edge as torn
    /// down without deleting either endpoint record.
    pub fn set_cost(&mut self, from: NodeId, to: NodeId, cost: Cost) -> Result<(), RoutingError> {
        if from == to {
            return Err(RoutingError::SelfEdge(from));
        }
        if cost == 0 || cost > INFINITE_COST {
            return Err(RoutingError::InvalidCost { from, to, cost });
        }
        self.adjacency.entry(to).or_default();
        self.adjacency.entry(from).or_default().insert(to, cost);
        self.bump();
        Ok(())
    }

    /// Cost of a usable edge `(from, to)`, or `None` if there is none.
    pub fn cost(&self, from: NodeId, to: NodeId) -> Option<Cost> {
        self.stored_cost(from, to).filter(|c| is_finite(*c))
    }

    /// The raw stored value for `(from, to)`, including teardown markers.
    pub fn stored_cost(&self, from: NodeId, to: NodeId) -> Option<Cost> {
        self.adjacency.get(&from).and_then(|adj| adj.get(&to)).copied()
    }

    /// Add `delta` to the cost of `(from, to)` and mirror the result onto
    /// `(to, from)`. A missing edge starts from [`BASE_COST`].
    ///
    /// Returns the new cost, or `None` if the edge is torn down (it is left
    /// untouched). Live costs saturate just below [`INFINITE_COST`].
    pub fn increment_cost(
        &mut self,
        from: NodeId,
        to: NodeId,
        delta: Cost,
    ) -> Result<Option<Cost>, RoutingError> {
        if from == to {
            return Err(RoutingError::SelfEdge(from));
        }
        let current = self.stored_cost(from, to).unwrap_or(BASE_COST);
        if !is_finite(current) {
            return Ok(None);
        }
        let updated = current.saturating_add(delta).min(INFINITE_COST - 1);
        self.adjacency.entry(from).or_default().insert(to, updated);
        self.adjacency.entry(to).or_default().insert(from, updated);
        self.bump();
        Ok(Some(updated))
    }

    /// Delete `id` and every reference to it. Removing an absent node is a
    /// no-op that returns false and leaves the version untouched.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let mut changed = self.adjacency.remove(&id).is_some();
        for adj in self.adjacency.values_mut() {
            changed |= adj.remove(&id).is_some();
        }
        if changed {
            self.bump();
        }
        changed
    }

    /// Delete the directed pair `(from, to)` entirely. Returns true if it existed.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        let removed = self
            .adjacency
            .get_mut(&from)
            .and_then(|adj| adj.remove(&to))
            .is_some();
        if removed {
            self.bump();
        }
        removed
    }

    /// Adjacency record of `id`; empty for an unknown node.
    pub fn neighbors(&self, id: NodeId) -> &Adjacency {
        self.adjacency.get(&id).unwrap_or(&NO_NEIGHBORS)
    }

    /// Usable edges leaving `id`, in ascending neighbor order.
    pub fn live_neighbors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, Cost)> + '_ {
        self.neighbors(id)
            .iter()
            .filter(|(_, c)| is_finite(**c))
            .map(|(n, c)| (*n, *c))
    }

    /// All nodes with a record, ascending.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Number of node records.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of usable directed edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency
            .values()
            .map(|adj| adj.values().filter(|c| is_finite(**c)).count())
            .sum()
    }

    /// Returns true if the graph has no node records.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}
