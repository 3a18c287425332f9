use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Cost of a single directed link. Always at least [`BASE_COST`].
pub type Cost = u32;

/// Marker stored on a link that has been torn down but whose endpoint record
/// still exists. Any stored cost at or above this value is not a usable edge.
///
/// Far above any realistic sum of live link costs; path sums are carried in
/// `u64` so they never wrap into this range.
pub const INFINITE_COST: Cost = 99_999;

/// Cost assigned to a freshly observed link and assumed for a missing one
/// when it is incremented.
pub const BASE_COST: Cost = 1;

/// Mesh-wide node identifier, assigned by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a node identifier from its raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw 32-bit value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl FromStr for NodeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(NodeId)
            .map_err(|_| CoreError::InvalidNodeId(s.to_string()))
    }
}

/// Role a node plays in the mesh. Derived from the configured sink, never
/// negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Terminates every message; nothing is forwarded past it.
    Sink,
    /// Originates its own traffic and forwards traffic of others.
    Relay,
}

impl Role {
    /// Derive the role of `local` given the configured sink, if any.
    pub fn of(local: NodeId, sink: Option<NodeId>) -> Self {
        match sink {
            Some(sink) if sink == local => Role::Sink,
            _ => Role::Relay,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Sink => write!(f, "sink"),
            Role::Relay => write!(f, "relay"),
        }
    }
}

/// Returns true if `cost` denotes a usable link.
pub fn is_finite(cost: Cost) -> bool {
    cost < INFINITE_COST
}
