//! A single simulated mesh node.
//!
//! Each node runs its own event loop: transport callbacks from the inbox,
//! driver commands, and a periodic origination tick on every non-sink node.
//! The routing engine is owned by the loop and never shared.

use anyhow::Result;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use meshroute_core::{MeshMessage, NodeId, Role, RoutingConfig};
use meshroute_routing::{Disposition, MeshEvent, RoutingEngine, RoutingError};

use crate::commands::{NodeCommand, NodeReport, OriginateResponse};
use crate::sim::SimTransport;

/// Capacity of the driver command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// One node of the simulated mesh.
pub struct MeshNode {
    engine: RoutingEngine<SimTransport>,
    inbox: mpsc::Receiver<MeshEvent>,
    command_rx: mpsc::Receiver<NodeCommand>,
    origination_period: Duration,
}

/// Driver-side handle to a running node.
#[derive(Clone)]
pub struct NodeHandle {
    node: NodeId,
    command_tx: mpsc::Sender<NodeCommand>,
}

impl MeshNode {
    /// Create a node around its transport and inbox.
    pub fn new(
        transport: SimTransport,
        inbox: mpsc::Receiver<MeshEvent>,
        config: RoutingConfig,
    ) -> Result<(Self, NodeHandle)> {
        let origination_period = Duration::from_secs(config.origination_interval_secs);
        let engine = RoutingEngine::new(transport, config)?;
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let handle = NodeHandle {
            node: engine.local_id(),
            command_tx,
        };
        let node = Self {
            engine,
            inbox,
            command_rx,
            origination_period,
        };
        Ok((node, handle))
    }

    pub fn id(&self) -> NodeId {
        self.engine.local_id()
    }

    /// Run the node's event loop until shutdown, returning its final report.
    pub async fn run(mut self) -> NodeReport {
        let local = self.id();
        let originates = self.engine.role() == Role::Relay && self.engine.sink().is_some();

        if let Err(e) = self.engine.sync_neighbors() {
            tracing::warn!(node = %local, error = %e, "initial neighbor sync failed");
        }

        let mut tick = interval_at(
            Instant::now() + self.origination_period,
            self.origination_period,
        );
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(node = %local, role = %self.engine.role(), "entering node event loop");

        loop {
            tokio::select! {
                event = self.inbox.recv() => {
                    match event {
                        Some(ev) => self.engine.handle_event(ev),
                        None => {
                            tracing::info!(node = %local, "inbox closed");
                            break;
                        }
                    }
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(NodeCommand::Shutdown) | None => break,
                        Some(c) => self.handle_command(c),
                    }
                }
                _ = tick.tick(), if originates => {
                    let payload = self.engine.config().payload_for(local);
                    // Outcome already logged and published by the engine.
                    let _ = self.engine.originate_to_sink(payload);
                }
            }
        }

        tracing::info!(node = %local, "node event loop exited");
        self.report()
    }

    fn handle_command(&mut self, cmd: NodeCommand) {
        match cmd {
            NodeCommand::Originate { payload, reply } => {
                let _ = reply.send(self.originate(payload));
            }
            NodeCommand::Report { reply } => {
                let _ = reply.send(self.report());
            }
            NodeCommand::Shutdown => {}
        }
    }

    fn originate(&mut self, payload: String) -> Result<OriginateResponse, String> {
        let sink = self
            .engine
            .sink()
            .ok_or_else(|| RoutingError::SinkNotConfigured.to_string())?;
        let message = MeshMessage::new(self.id(), sink, payload);
        let message_id = message.id.to_string();

        let (next_hop, path) = match self.engine.originate_message(message) {
            Ok(Disposition::Delivered { path }) => (None, path),
            Ok(Disposition::Forwarded { next_hop, path, .. }) => (Some(next_hop), path),
            Err(e) => return Err(e.to_string()),
        };
        Ok(OriginateResponse {
            message_id,
            next_hop,
            path: path.to_string(),
        })
    }

    fn report(&self) -> NodeReport {
        let graph = self.engine.graph();
        NodeReport::new(
            self.id(),
            self.engine.role(),
            self.engine.stats(),
            graph.version(),
            graph.node_count(),
            graph.edge_count(),
            self.engine.table().stats(),
        )
    }
}

impl NodeHandle {
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// Ask the node to originate a message toward its sink.
    pub async fn originate(&self, payload: impl Into<String>) -> Result<OriginateResponse> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(NodeCommand::Originate {
                payload: payload.into(),
                reply,
            })
            .await
            .map_err(|_| anyhow::anyhow!("node {} is not running", self.node))?;
        rx.await?.map_err(|e| anyhow::anyhow!(e))
    }

    /// Fetch the node's current counters.
    pub async fn report(&self) -> Result<NodeReport> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(NodeCommand::Report { reply })
            .await
            .map_err(|_| anyhow::anyhow!("node {} is not running", self.node))?;
        Ok(rx.await?)
    }

    /// Ask the node to leave its event loop.
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(NodeCommand::Shutdown).await;
    }
}
