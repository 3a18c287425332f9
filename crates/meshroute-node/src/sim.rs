//! In-process stand-in for the wireless mesh transport.
//!
//! Every node gets a bounded inbox. Sending pushes a `MessageReceived` event
//! into the neighbor's inbox and fails when the link is down or the inbox is
//! full. Link changes are announced to the endpoints as neighbor
//! connect/disconnect and to everyone else as link reports. After a link
//! drops, each endpoint is sent the links of the neighbor it lost, the way
//! the radio mesh library shares its view.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use meshroute_core::NodeId;
use meshroute_routing::{MeshEvent, Transport, TransportError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::state::LinkTable;

/// Capacity of each node's inbound event queue.
pub const INBOX_CAPACITY: usize = 256;

type Inboxes = Arc<HashMap<NodeId, mpsc::Sender<MeshEvent>>>;

/// The simulated radio medium.
pub struct SimulatedMesh {
    links: Arc<LinkTable>,
    inboxes: Inboxes,
}

/// Transport handle for one simulated node.
pub struct SimTransport {
    local: NodeId,
    links: Arc<LinkTable>,
    inboxes: Inboxes,
}

impl SimulatedMesh {
    /// Create a mesh with the given nodes and no links. Returns the transport
    /// and inbox receiver of every node.
    pub fn new(
        nodes: &[NodeId],
    ) -> (Self, Vec<(SimTransport, mpsc::Receiver<MeshEvent>)>) {
        let links = Arc::new(LinkTable::new());
        let mut senders = HashMap::new();
        let mut receivers = Vec::new();

        for node in nodes {
            let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
            if senders.insert(*node, tx).is_none() {
                receivers.push((*node, rx));
            }
        }

        let inboxes: Inboxes = Arc::new(senders);
        let endpoints = receivers
            .into_iter()
            .map(|(node, rx)| {
                let transport = SimTransport {
                    local: node,
                    links: links.clone(),
                    inboxes: inboxes.clone(),
                };
                (transport, rx)
            })
            .collect();

        (Self { links, inboxes }, endpoints)
    }

    /// Bring up the link `a <-> b`. Returns false if it was already up or an
    /// endpoint is not part of the mesh.
    pub fn connect(&self, a: NodeId, b: NodeId) -> bool {
        if !self.inboxes.contains_key(&a) || !self.inboxes.contains_key(&b) {
            tracing::warn!(%a, %b, "link references a node outside the mesh");
            return false;
        }
        if !self.links.add(a, b) {
            return false;
        }
        tracing::info!(%a, %b, "link up");
        self.notify(a, MeshEvent::NeighborConnected(b));
        self.notify(b, MeshEvent::NeighborConnected(a));
        self.broadcast_except(&[a, b], MeshEvent::LinkUp { a, b });
        true
    }

    /// Take down the link `a <-> b`.
    pub fn disconnect(&self, a: NodeId, b: NodeId) -> bool {
        if !self.links.remove(a, b) {
            return false;
        }
        tracing::info!(%a, %b, "link down");
        self.notify(a, MeshEvent::NeighborDisconnected(b));
        self.notify(b, MeshEvent::NeighborDisconnected(a));
        self.broadcast_except(&[a, b], MeshEvent::LinkDown { a, b });
        self.reannounce(a, b);
        true
    }

    /// Take down every link of `node`.
    pub fn node_down(&self, node: NodeId) -> usize {
        let removed = self.links.remove_node(node);
        for (a, b) in &removed {
            self.notify(*a, MeshEvent::NeighborDisconnected(*b));
            self.notify(*b, MeshEvent::NeighborDisconnected(*a));
            self.broadcast_except(&[*a, *b], MeshEvent::LinkDown { a: *a, b: *b });
        }
        // Every disconnect is queued before any re-announcement, so a later
        // neighbor removal cannot erase links restored for an earlier one.
        for (a, b) in &removed {
            self.reannounce(*a, *b);
        }
        if !removed.is_empty() {
            tracing::info!(%node, links = removed.len(), "node down");
        }
        removed.len()
    }

    /// Snapshot of all live links.
    pub fn links(&self) -> Vec<(NodeId, NodeId)> {
        self.links.all()
    }

    /// After `a <-> b` dropped, each endpoint removed the other wholesale.
    /// Send `a` the live links of `b` and `b` the live links of `a`.
    fn reannounce(&self, a: NodeId, b: NodeId) {
        for (x, y) in self.links.all() {
            if x == b || y == b {
                self.notify(a, MeshEvent::LinkUp { a: x, b: y });
            }
            if x == a || y == a {
                self.notify(b, MeshEvent::LinkUp { a: x, b: y });
            }
        }
    }

    fn broadcast_except(&self, skip: &[NodeId], event: MeshEvent) {
        for node in self.inboxes.keys() {
            if !skip.contains(node) {
                self.notify(*node, event.clone());
            }
        }
    }

    fn notify(&self, node: NodeId, event: MeshEvent) {
        if let Some(tx) = self.inboxes.get(&node) {
            if let Err(e) = tx.try_send(event) {
                tracing::warn!(%node, error = %e, "dropping topology notification");
            }
        }
    }
}

impl Transport for SimTransport {
    fn local_node_id(&self) -> NodeId {
        self.local
    }

    fn current_neighbors(&self) -> BTreeSet<NodeId> {
        self.links.neighbors_of(self.local)
    }

    fn send_to_node(&mut self, to: NodeId, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.links.contains(self.local, to) {
            return Err(TransportError::NotConnected(to));
        }
        let inbox = self
            .inboxes
            .get(&to)
            .ok_or(TransportError::NotConnected(to))?;

        inbox
            .try_send(MeshEvent::MessageReceived {
                from: self.local,
                data: bytes.to_vec(),
            })
            .map_err(|e| match e {
                TrySendError::Full(_) => TransportError::Delivery(format!("inbox of {} full", to)),
                TrySendError::Closed(_) => TransportError::ChannelClosed(to),
            })
    }
}
