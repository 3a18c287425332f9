use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Cost, NodeId, BASE_COST, INFINITE_COST};

/// Routing parameters shared by the engine and the node binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Identifier of the node playing the sink role. `None` until configured.
    #[serde(default)]
    pub sink: Option<NodeId>,
    /// Cost given to a newly observed link.
    #[serde(default = "default_base_cost")]
    pub base_cost: Cost,
    /// Amount added to a link's cost every time a message is handed over it.
    #[serde(default = "default_cost_increment")]
    pub cost_increment: Cost,
    /// Messages whose hop trace reaches this length are dropped.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// Period of the origination task, in seconds.
    #[serde(default = "default_origination_interval_secs")]
    pub origination_interval_secs: u64,
    /// Payload template for periodic messages; `{id}` expands to the local node id.
    #[serde(default = "default_payload")]
    pub payload: String,
}

fn default_base_cost() -> Cost {
    BASE_COST
}
fn default_cost_increment() -> Cost {
    1
}
fn default_max_hops() -> usize {
    16
}
fn default_origination_interval_secs() -> u64 {
    5
}
fn default_payload() -> String {
    "Hello from node {id}".into()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            sink: None,
            base_cost: default_base_cost(),
            cost_increment: default_cost_increment(),
            max_hops: default_max_hops(),
            origination_interval_secs: default_origination_interval_secs(),
            payload: default_payload(),
        }
    }
}

impl RoutingConfig {
    /// Reject values the engine cannot honour.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.base_cost == 0 || self.base_cost >= INFINITE_COST {
            return Err(CoreError::InvalidConfig(format!(
                "base_cost must be in [1, {}), got {}",
                INFINITE_COST, self.base_cost
            )));
        }
        if self.cost_increment == 0 {
            return Err(CoreError::InvalidConfig(
                "cost_increment must be greater than zero".into(),
            ));
        }
        if self.max_hops == 0 {
            return Err(CoreError::InvalidConfig(
                "max_hops must be greater than zero".into(),
            ));
        }
        if self.origination_interval_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "origination_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Render the periodic payload for `local`.
    pub fn payload_for(&self, local: NodeId) -> String {
        self.payload.replace("{id}", &local.to_string())
    }
}
