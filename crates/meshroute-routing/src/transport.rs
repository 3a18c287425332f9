//! The seam between the routing engine and the mesh transport.
//!
//! The transport forms the mesh, discovers neighbors and moves bytes between
//! directly connected nodes. The engine only ever asks it for the local id,
//! the current one-hop neighbor set, and best-effort unicast to a neighbor.
//! Transport callbacks reach the engine as [`MeshEvent`] values handed to
//! [`RoutingEngine::handle_event`](crate::RoutingEngine::handle_event).

use std::collections::BTreeSet;

use meshroute_core::NodeId;

/// Errors reported by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No direct connection to the target node.
    #[error("not connected to {0}")]
    NotConnected(NodeId),

    /// The neighbor's inbound queue is closed.
    #[error("channel to {0} closed")]
    ChannelClosed(NodeId),

    /// Any other delivery failure.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A mesh transport able to reach directly connected neighbors.
pub trait Transport {
    /// Identifier of the node this transport runs on.
    fn local_node_id(&self) -> NodeId;

    /// Identifiers of the nodes currently connected by a single hop.
    fn current_neighbors(&self) -> BTreeSet<NodeId>;

    /// Best-effort unicast of `bytes` to the directly connected node `to`.
    fn send_to_node(&mut self, to: NodeId, bytes: &[u8]) -> Result<(), TransportError>;
}

/// Callbacks delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshEvent {
    /// A direct connection to a neighbor was established.
    NeighborConnected(NodeId),

    /// A direct connection to a neighbor was lost.
    NeighborDisconnected(NodeId),

    /// A link between two other nodes came up, as reported by the
    /// transport's mesh-wide topology view.
    LinkUp { a: NodeId, b: NodeId },

    /// A link between two other nodes went down.
    LinkDown { a: NodeId, b: NodeId },

    /// Bytes arrived from a direct neighbor.
    MessageReceived { from: NodeId, data: Vec<u8> },
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn local_node_id(&self) -> NodeId {
        (**self).local_node_id()
    }

    fn current_neighbors(&self) -> BTreeSet<NodeId> {
        (**self).current_neighbors()
    }

    fn send_to_node(&mut self, to: NodeId, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).send_to_node(to, bytes)
    }
}
