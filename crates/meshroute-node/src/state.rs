//! Link table shared by every simulated transport.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use meshroute_core::NodeId;

/// An undirected link, stored with the lower id first.
pub type Link = (NodeId, NodeId);

fn normalize(a: NodeId, b: NodeId) -> Link {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The set of live links in the simulated mesh.
#[derive(Debug, Default)]
pub struct LinkTable {
    links: RwLock<BTreeSet<Link>>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a link. Returns false for self-links and links already present.
    pub fn add(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        self.write().insert(normalize(a, b))
    }

    /// Remove a link. Returns true if it was present.
    pub fn remove(&self, a: NodeId, b: NodeId) -> bool {
        self.write().remove(&normalize(a, b))
    }

    pub fn contains(&self, a: NodeId, b: NodeId) -> bool {
        self.read().contains(&normalize(a, b))
    }

    /// Nodes directly linked to `node`.
    pub fn neighbors_of(&self, node: NodeId) -> BTreeSet<NodeId> {
        self.read()
            .iter()
            .filter_map(|&(a, b)| {
                if a == node {
                    Some(b)
                } else if b == node {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Remove every link touching `node`, returning them.
    pub fn remove_node(&self, node: NodeId) -> Vec<Link> {
        let mut links = self.write();
        let touching: Vec<Link> = links
            .iter()
            .filter(|(a, b)| *a == node || *b == node)
            .copied()
            .collect();
        for link in &touching {
            links.remove(link);
        }
        touching
    }

    /// Snapshot of all live links.
    pub fn all(&self) -> Vec<Link> {
        self.read().iter().copied().collect()
    }

    // A poisoned lock still holds a consistent set: every writer does a
    // single insert or remove.
    fn read(&self) -> RwLockReadGuard<'_, BTreeSet<Link>> {
        self.links.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeSet<Link>> {
        self.links.write().unwrap_or_else(|e| e.into_inner())
    }
}
