use meshroute_core::{Cost, MeshMessage, NodeId, Role};

use crate::error::RoutingError;
use crate::graph::CostGraph;
use crate::path::Path;
use crate::table::RoutingTable;
use crate::transport::Transport;

/// What happened to a message handed to the [`Forwarder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The message terminated here.
    Delivered { path: Path },
    /// The message was handed to `next_hop`. `link_cost` is the cost of
    /// `(local, next_hop)` after the usage increment.
    Forwarded {
        next_hop: NodeId,
        path: Path,
        link_cost: Option<Cost>,
    },
}

/// Next-hop decision and hand-off for messages bound to the sink.
///
/// Every successful hand-off over `(local, next_hop)` makes that link more
/// expensive, so repeated traffic drifts onto alternate links once their
/// total cost undercuts the inflated one.
#[derive(Debug, Clone)]
pub struct Forwarder {
    local: NodeId,
    sink: Option<NodeId>,
    cost_increment: Cost,
    max_hops: usize,
}

impl Forwarder {
    pub fn new(local: NodeId, cost_increment: Cost, max_hops: usize) -> Self {
        Self {
            local,
            sink: None,
            cost_increment,
            max_hops,
        }
    }

    pub fn local(&self) -> NodeId {
        self.local
    }

    pub fn sink(&self) -> Option<NodeId> {
        self.sink
    }

    pub fn set_sink(&mut self, sink: NodeId) {
        self.sink = Some(sink);
    }

    pub fn role(&self) -> Role {
        Role::of(self.local, self.sink)
    }

    /// Start a locally created message on its way to `message.sink`.
    pub fn originate<T: Transport + ?Sized>(
        &self,
        graph: &mut CostGraph,
        table: &mut RoutingTable,
        transport: &mut T,
        message: &MeshMessage,
    ) -> Result<Disposition, RoutingError> {
        self.dispatch(graph, table, transport, message)
    }

    /// Handle a message that arrived from a neighbor. The local node is
    /// appended to the message trace before anything else.
    pub fn receive<T: Transport + ?Sized>(
        &self,
        graph: &mut CostGraph,
        table: &mut RoutingTable,
        transport: &mut T,
        message: &mut MeshMessage,
    ) -> Result<Disposition, RoutingError> {
        message.record_hop(self.local);

        if self.role() == Role::Sink || message.sink == self.local {
            return Ok(Disposition::Delivered {
                path: Path::local(self.local),
            });
        }
        if message.hops_travelled() >= self.max_hops {
            return Err(RoutingError::HopLimitExceeded {
                max_hops: self.max_hops,
            });
        }

        self.dispatch(graph, table, transport, message)
    }

    fn dispatch<T: Transport + ?Sized>(
        &self,
        graph: &mut CostGraph,
        table: &mut RoutingTable,
        transport: &mut T,
        message: &MeshMessage,
    ) -> Result<Disposition, RoutingError> {
        let path = table.resolve(graph, message.sink)?;
        let next_hop = match path.next_hop() {
            None => return Ok(Disposition::Delivered { path }),
            Some(next_hop) => next_hop,
        };

        if !transport.current_neighbors().contains(&next_hop) {
            return Err(RoutingError::NotAdjacent { node: next_hop });
        }

        let bytes = message.encode()?;
        transport
            .send_to_node(next_hop, &bytes)
            .map_err(|source| RoutingError::TransportSendFailed {
                node: next_hop,
                source,
            })?;

        let link_cost = graph.increment_cost(self.local, next_hop, self.cost_increment)?;
        Ok(Disposition::Forwarded {
            next_hop,
            path,
            link_cost,
        })
    }
}
