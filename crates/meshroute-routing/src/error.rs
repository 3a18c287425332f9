use meshroute_core::{CoreError, Cost, NodeId};

use crate::transport::TransportError;

/// Errors that can occur within the routing layer.
///
/// None of these is fatal: every caller degrades to "drop and log".
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("no route found from {from} to {to}")]
    RouteNotFound { from: NodeId, to: NodeId },

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("send to {node} failed: {source}")]
    TransportSendFailed {
        node: NodeId,
        #[source]
        source: TransportError,
    },

    #[error("next hop {node} is not a direct neighbor")]
    NotAdjacent { node: NodeId },

    #[error("invalid link cost {cost} for {from} -> {to}")]
    InvalidCost { from: NodeId, to: NodeId, cost: Cost },

    #[error("self-edge on node {0} is not allowed")]
    SelfEdge(NodeId),

    #[error("maximum hop count exceeded: {max_hops}")]
    HopLimitExceeded { max_hops: usize },

    #[error("no sink configured")]
    SinkNotConfigured,

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RoutingError {
    /// Returns true for "no route currently known", the expected steady-state
    /// condition during topology churn.
    pub fn is_route_not_found(&self) -> bool {
        matches!(self, RoutingError::RouteNotFound { .. })
    }
}
