pub mod config;
pub mod error;
pub mod message;
pub mod types;

pub use config::RoutingConfig;
pub use error::CoreError;
pub use message::{MeshMessage, ENVELOPE_VERSION};
pub use types::{is_finite, Cost, NodeId, Role, BASE_COST, INFINITE_COST};
