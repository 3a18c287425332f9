use std::fmt;

use meshroute_core::NodeId;
use serde::{Deserialize, Serialize};

/// A route from source to destination, both inclusive.
///
/// Never empty. A single-node path means source and destination coincide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPath")]
pub struct Path {
    nodes: Vec<NodeId>,
    total_cost: u64,
}

#[derive(Deserialize)]
struct RawPath {
    nodes: Vec<NodeId>,
    total_cost: u64,
}

impl TryFrom<RawPath> for Path {
    type Error = String;

    fn try_from(raw: RawPath) -> Result<Self, Self::Error> {
        Path::new(raw.nodes, raw.total_cost).ok_or_else(|| "path has no nodes".to_string())
    }
}

impl Path {
    /// Create a path. Returns `None` for an empty node list.
    pub fn new(nodes: Vec<NodeId>, total_cost: u64) -> Option<Self> {
        if nodes.is_empty() {
            return None;
        }
        Some(Self { nodes, total_cost })
    }

    /// The trivial path from a node to itself.
    pub fn local(node: NodeId) -> Self {
        Self {
            nodes: vec![node],
            total_cost: 0,
        }
    }

    /// The ordered nodes of this path.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn source(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn destination(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// The node after the source, if the path leaves it at all.
    pub fn next_hop(&self) -> Option<NodeId> {
        self.nodes.get(1).copied()
    }

    /// Number of links crossed.
    pub fn hop_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Returns true if source and destination are the same node.
    pub fn is_local(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Sum of link costs along the path at the time it was computed.
    pub fn total_cost(&self) -> u64 {
        self.total_cost
    }

    /// Returns true if the path passes through `node`.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}
