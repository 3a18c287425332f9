//! Node configuration loading and management.

use meshroute_core::{NodeId, RoutingConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration for a simulated mesh run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Routing parameters shared by every node.
    #[serde(default = "default_routing")]
    pub routing: RoutingConfig,

    /// Mesh layout and event script.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Nodes taking part in the mesh.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<NodeId>,
    /// Links up at start.
    #[serde(default = "default_links")]
    pub links: Vec<[NodeId; 2]>,
    /// How long the run lasts, in seconds.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Topology changes applied during the run.
    #[serde(default = "default_script")]
    pub script: Vec<ScriptedEvent>,
}

/// A topology change or injected message at a fixed offset into the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptedEvent {
    LinkDown { at_secs: u64, a: NodeId, b: NodeId },
    LinkUp { at_secs: u64, a: NodeId, b: NodeId },
    NodeDown { at_secs: u64, node: NodeId },
    Originate { at_secs: u64, node: NodeId },
}

impl ScriptedEvent {
    pub fn at_secs(&self) -> u64 {
        match self {
            ScriptedEvent::LinkDown { at_secs, .. }
            | ScriptedEvent::LinkUp { at_secs, .. }
            | ScriptedEvent::NodeDown { at_secs, .. }
            | ScriptedEvent::Originate { at_secs, .. } => *at_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_routing() -> RoutingConfig {
    RoutingConfig {
        sink: Some(NodeId(4)),
        ..RoutingConfig::default()
    }
}
fn default_nodes() -> Vec<NodeId> {
    [1, 2, 3, 4].into_iter().map(NodeId).collect()
}
fn default_links() -> Vec<[NodeId; 2]> {
    [(1, 2), (2, 4), (1, 3), (3, 4)]
        .into_iter()
        .map(|(a, b)| [NodeId(a), NodeId(b)])
        .collect()
}
fn default_duration_secs() -> u64 {
    30
}
fn default_script() -> Vec<ScriptedEvent> {
    vec![ScriptedEvent::LinkDown {
        at_secs: 12,
        a: NodeId(3),
        b: NodeId(4),
    }]
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            routing: default_routing(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            links: default_links(),
            duration_secs: default_duration_secs(),
            script: default_script(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl MeshConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: MeshConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check the run description for inconsistencies.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.routing.validate()?;

        let nodes = &self.simulation.nodes;
        if nodes.is_empty() {
            anyhow::bail!("simulation needs at least one node");
        }
        let known = |id: &NodeId| nodes.contains(id);

        if let Some(sink) = self.routing.sink {
            if !known(&sink) {
                anyhow::bail!("sink {} is not one of the simulated nodes", sink);
            }
        }
        for [a, b] in &self.simulation.links {
            if a == b {
                anyhow::bail!("link {} <-> {} is a self-link", a, b);
            }
            if !known(a) || !known(b) {
                anyhow::bail!("link {} <-> {} references an unknown node", a, b);
            }
        }
        for event in &self.simulation.script {
            let ok = match event {
                ScriptedEvent::LinkDown { a, b, .. } | ScriptedEvent::LinkUp { a, b, .. } => {
                    known(a) && known(b)
                }
                ScriptedEvent::NodeDown { node, .. } | ScriptedEvent::Originate { node, .. } => {
                    known(node)
                }
            };
            if !ok {
                anyhow::bail!("scripted event {:?} references an unknown node", event);
            }
        }
        Ok(())
    }

    /// Scripted events ordered by time; ties keep file order.
    pub fn timeline(&self) -> Vec<ScriptedEvent> {
        let mut events = self.simulation.script.clone();
        events.sort_by_key(ScriptedEvent::at_secs);
        events
    }
}
