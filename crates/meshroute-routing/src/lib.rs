//! Meshroute Routing: cost-adaptive single-sink routing for ad-hoc meshes.
//!
//! This crate provides:
//! - [`CostGraph`]: the weighted adjacency model, with a version counter bumped on every mutation.
//! - [`PathFinder`]: Dijkstra with early exit and deterministic tie-breaking.
//! - [`TopologyManager`]: applies neighbor join/leave and remote link reports to the graph.
//! - [`RoutingTable`]: per-destination path cache, invalidated lazily by graph version.
//! - [`Forwarder`]: next-hop decision, hand-off, and the usage-driven cost increment.
//! - [`RoutingEngine`]: owns all of the above for one node and publishes [`RoutingEvent`]s.

pub mod engine;
pub mod error;
pub mod events;
pub mod forwarder;
pub mod graph;
pub mod path;
pub mod pathfinder;
pub mod table;
pub mod topology;
pub mod transport;

// Re-exports for convenience.
pub use engine::{EngineStats, RoutingEngine, EVENT_CHANNEL_CAPACITY};
pub use error::RoutingError;
pub use events::{Delivered, DropReason, Dropped, RoutingEvent};
pub use forwarder::{Disposition, Forwarder};
pub use graph::{Adjacency, CostGraph};
pub use path::Path;
pub use pathfinder::PathFinder;
pub use table::{CacheStats, RouteEntry, RoutingTable};
pub use topology::{TopologyDelta, TopologyManager};
pub use transport::{MeshEvent, Transport, TransportError};
