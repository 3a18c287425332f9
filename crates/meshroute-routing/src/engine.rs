//! The routing engine a node's main loop talks to.
//!
//! Owns the cost graph, topology manager, routing table, forwarder and the
//! transport handle of exactly one node. Transport callbacks are delivered
//! as [`MeshEvent`] values to [`RoutingEngine::handle_event`], which runs
//! each to completion before returning.

use meshroute_core::{MeshMessage, NodeId, Role, RoutingConfig};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::RoutingError;
use crate::events::{Delivered, DropReason, Dropped, RoutingEvent};
use crate::forwarder::{Disposition, Forwarder};
use crate::graph::CostGraph;
use crate::path::Path;
use crate::table::RoutingTable;
use crate::topology::{TopologyDelta, TopologyManager};
use crate::transport::{MeshEvent, Transport};

/// Capacity of the diagnostic event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Running totals kept by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub originated: u64,
    pub forwarded: u64,
    pub delivered: u64,
    pub dropped: u64,
}

/// Cost-adaptive single-sink routing for one mesh node.
pub struct RoutingEngine<T: Transport> {
    config: RoutingConfig,
    transport: T,
    graph: CostGraph,
    topology: TopologyManager,
    table: RoutingTable,
    forwarder: Forwarder,
    events: broadcast::Sender<RoutingEvent>,
    stats: EngineStats,
}

impl<T: Transport> RoutingEngine<T> {
    /// Create an engine for the node `transport` runs on.
    pub fn new(transport: T, config: RoutingConfig) -> Result<Self, RoutingError> {
        config.validate()?;

        let local = transport.local_node_id();
        let mut graph = CostGraph::new();
        graph.add_node(local);

        let mut forwarder = Forwarder::new(local, config.cost_increment, config.max_hops);
        if let Some(sink) = config.sink {
            forwarder.set_sink(sink);
        }
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(node = %local, sink = ?config.sink, "routing engine created");

        Ok(Self {
            topology: TopologyManager::new(local, config.base_cost),
            table: RoutingTable::new(local),
            config,
            transport,
            graph,
            forwarder,
            events,
            stats: EngineStats::default(),
        })
    }

    pub fn local_id(&self) -> NodeId {
        self.forwarder.local()
    }

    pub fn role(&self) -> Role {
        self.forwarder.role()
    }

    pub fn sink(&self) -> Option<NodeId> {
        self.forwarder.sink()
    }

    /// Configure which node plays the sink role. Idempotent.
    pub fn configure_sink(&mut self, sink: NodeId) {
        if self.forwarder.sink() == Some(sink) {
            return;
        }
        self.forwarder.set_sink(sink);
        self.config.sink = Some(sink);
        tracing::info!(node = %self.local_id(), %sink, role = %self.role(), "sink configured");
    }

    /// Subscribe to the diagnostic event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RoutingEvent> {
        self.events.subscribe()
    }

    /// Dispatch a transport callback.
    pub fn handle_event(&mut self, event: MeshEvent) {
        match event {
            MeshEvent::NeighborConnected(id) => self.neighbor_connected(id),
            MeshEvent::NeighborDisconnected(id) => self.neighbor_disconnected(id),
            MeshEvent::LinkUp { a, b } => self.link_up(a, b),
            MeshEvent::LinkDown { a, b } => self.link_down(a, b),
            MeshEvent::MessageReceived { from, data } => {
                // Outcome already logged and published.
                let _ = self.message_received(from, &data);
            }
        }
    }

    /// A direct neighbor connected.
    pub fn neighbor_connected(&mut self, id: NodeId) {
        match self.topology.neighbor_joined(&mut self.graph, id) {
            Ok(true) => {
                tracing::info!(node = %self.local_id(), neighbor = %id, "neighbor joined");
                self.emit(RoutingEvent::NodeJoined { node: id });
            }
            Ok(false) => {
                tracing::debug!(node = %self.local_id(), neighbor = %id, "neighbor already known");
            }
            Err(e) => tracing::warn!(neighbor = %id, error = %e, "failed to apply join"),
        }
    }

    /// A direct neighbor disconnected.
    pub fn neighbor_disconnected(&mut self, id: NodeId) {
        match self.topology.neighbor_left(&mut self.graph, id) {
            Ok(()) => {
                tracing::info!(node = %self.local_id(), neighbor = %id, "neighbor left");
                self.emit(RoutingEvent::NodeLeft { node: id });
            }
            Err(RoutingError::UnknownNode(_)) => {
                tracing::debug!(node = %self.local_id(), neighbor = %id, "departed node was not in the graph");
            }
            Err(e) => tracing::warn!(neighbor = %id, error = %e, "failed to apply leave"),
        }
    }

    /// A link elsewhere in the mesh came up.
    pub fn link_up(&mut self, a: NodeId, b: NodeId) {
        if a == self.local_id() || b == self.local_id() {
            let other = if a == self.local_id() { b } else { a };
            self.neighbor_connected(other);
            return;
        }
        if let Err(e) = self.topology.link_up(&mut self.graph, a, b) {
            tracing::warn!(%a, %b, error = %e, "failed to apply link up");
        }
    }

    /// A link elsewhere in the mesh went down.
    pub fn link_down(&mut self, a: NodeId, b: NodeId) {
        match self.topology.link_down(&mut self.graph, a, b) {
            Ok(removed) => {
                for node in removed {
                    tracing::info!(node = %self.local_id(), removed = %node, "node left");
                    self.emit(RoutingEvent::NodeLeft { node });
                }
            }
            Err(e) => tracing::warn!(%a, %b, error = %e, "failed to apply link down"),
        }
    }

    /// Reconcile direct links with the transport's current neighbor set.
    pub fn sync_neighbors(&mut self) -> Result<TopologyDelta, RoutingError> {
        let current = self.transport.current_neighbors();
        let delta = self.topology.sync_neighbors(&mut self.graph, &current)?;
        for node in &delta.joined {
            self.emit(RoutingEvent::NodeJoined { node: *node });
        }
        for node in &delta.left {
            self.emit(RoutingEvent::NodeLeft { node: *node });
        }
        if !delta.is_empty() {
            tracing::info!(
                node = %self.local_id(),
                joined = delta.joined.len(),
                left = delta.left.len(),
                "neighbors reconciled"
            );
        }
        Ok(delta)
    }

    /// Create a message carrying `payload` and start it toward `sink`.
    ///
    /// Failures are logged, published as [`RoutingEvent::Dropped`] and
    /// returned; nothing is retried.
    pub fn originate(
        &mut self,
        payload: impl Into<bytes::Bytes>,
        sink: NodeId,
    ) -> Result<Disposition, RoutingError> {
        let message = MeshMessage::new(self.local_id(), sink, payload);
        self.originate_message(message)
    }

    /// Start a locally built message toward `message.sink`. Lets the caller
    /// keep the message id.
    pub fn originate_message(&mut self, message: MeshMessage) -> Result<Disposition, RoutingError> {
        self.stats.originated += 1;

        let result = self.forwarder.originate(
            &mut self.graph,
            &mut self.table,
            &mut self.transport,
            &message,
        );
        self.settle(None, message, result)
    }

    /// Originate toward the configured sink.
    pub fn originate_to_sink(
        &mut self,
        payload: impl Into<bytes::Bytes>,
    ) -> Result<Disposition, RoutingError> {
        let sink = self.sink().ok_or(RoutingError::SinkNotConfigured)?;
        self.originate(payload, sink)
    }

    /// Handle bytes that arrived from the neighbor `from`.
    pub fn message_received(
        &mut self,
        from: NodeId,
        data: &[u8],
    ) -> Result<Disposition, RoutingError> {
        if !self.graph.contains(from) {
            tracing::debug!(node = %self.local_id(), %from, "message from node outside the graph");
        }

        let mut message = match MeshMessage::decode(data) {
            Ok(message) => message,
            Err(e) => {
                let err = RoutingError::from(e);
                tracing::warn!(node = %self.local_id(), %from, error = %err, "dropping malformed message");
                self.record_drop(None, &err);
                return Err(err);
            }
        };

        let result = self.forwarder.receive(
            &mut self.graph,
            &mut self.table,
            &mut self.transport,
            &mut message,
        );
        self.settle(Some(from), message, result)
    }

    /// Path from the local node to `destination`, through the cache.
    pub fn resolve(&mut self, destination: NodeId) -> Result<Path, RoutingError> {
        self.table.resolve(&self.graph, destination)
    }

    pub fn graph(&self) -> &CostGraph {
        &self.graph
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Log, publish and count the outcome of a forwarding decision.
    fn settle(
        &mut self,
        from: Option<NodeId>,
        message: MeshMessage,
        result: Result<Disposition, RoutingError>,
    ) -> Result<Disposition, RoutingError> {
        let local = self.local_id();
        match &result {
            Ok(Disposition::Delivered { .. }) => {
                self.stats.delivered += 1;
                tracing::info!(
                    node = %local,
                    message_id = %message.id,
                    origin = %message.origin,
                    path = %message.trace_display(),
                    payload = %message.payload_text(),
                    "message delivered"
                );
                self.emit(RoutingEvent::Delivered(Delivered { from, message }));
            }
            Ok(Disposition::Forwarded {
                next_hop,
                path,
                link_cost,
            }) => {
                self.stats.forwarded += 1;
                tracing::info!(
                    node = %local,
                    message_id = %message.id,
                    next_hop = %next_hop,
                    path = %path,
                    "message forwarded"
                );
                self.emit(RoutingEvent::RouteFound {
                    destination: message.sink,
                    path: path.clone(),
                });
                self.emit(RoutingEvent::Forwarded {
                    message_id: message.id,
                    next_hop: *next_hop,
                });
                if let Some(cost) = link_cost {
                    tracing::debug!(from = %local, to = %next_hop, cost, "link cost changed");
                    self.emit(RoutingEvent::LinkCostChanged {
                        from: local,
                        to: *next_hop,
                        cost: *cost,
                    });
                }
            }
            Err(err) => {
                if err.is_route_not_found() {
                    tracing::warn!(node = %local, sink = %message.sink, message_id = %message.id, "route not found, dropping message");
                    self.emit(RoutingEvent::RouteNotFound {
                        destination: message.sink,
                    });
                } else {
                    tracing::warn!(node = %local, message_id = %message.id, error = %err, "dropping message");
                }
                self.record_drop(Some(message.id), err);
            }
        }
        result
    }

    fn record_drop(&mut self, message_id: Option<uuid::Uuid>, err: &RoutingError) {
        self.stats.dropped += 1;
        self.emit(RoutingEvent::Dropped(Dropped {
            message_id,
            reason: DropReason::from(err),
        }));
    }

    fn emit(&self, event: RoutingEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
