//! Diagnostic events emitted by the routing engine.
//!
//! Subscribers receive these over a broadcast channel; every event is also
//! logged through `tracing` at the point it is emitted.

use meshroute_core::{Cost, MeshMessage, NodeId};

use crate::error::RoutingError;
use crate::path::Path;

/// High-level events emitted by the routing engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingEvent {
    /// A path to `destination` was resolved.
    RouteFound { destination: NodeId, path: Path },

    /// No path to `destination` is currently known.
    RouteNotFound { destination: NodeId },

    /// A direct neighbor connected.
    NodeJoined { node: NodeId },

    /// A node was removed from the cost graph.
    NodeLeft { node: NodeId },

    /// A link cost changed after use.
    LinkCostChanged { from: NodeId, to: NodeId, cost: Cost },

    /// A message was handed to the next hop.
    Forwarded { message_id: uuid::Uuid, next_hop: NodeId },

    /// A message terminated at this node.
    Delivered(Delivered),

    /// A message was dropped.
    Dropped(Dropped),
}

/// A message delivered to the local application.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivered {
    /// Neighbor the message arrived from; `None` for local origination.
    pub from: Option<NodeId>,
    /// The message, with its full trace.
    pub message: MeshMessage,
}

/// A message dropped by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropped {
    /// Identifier of the message, when it could be decoded.
    pub message_id: Option<uuid::Uuid>,
    pub reason: DropReason,
}

/// Why a message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    RouteNotFound,
    TransportSendFailed,
    NotAdjacent,
    HopLimitExceeded,
    Malformed,
    Other,
}

impl From<&RoutingError> for DropReason {
    fn from(err: &RoutingError) -> Self {
        match err {
            RoutingError::RouteNotFound { .. } => DropReason::RouteNotFound,
            RoutingError::TransportSendFailed { .. } => DropReason::TransportSendFailed,
            RoutingError::NotAdjacent { .. } => DropReason::NotAdjacent,
            RoutingError::HopLimitExceeded { .. } => DropReason::HopLimitExceeded,
            RoutingError::Core(_) => DropReason::Malformed,
            _ => DropReason::Other,
        }
    }
}
