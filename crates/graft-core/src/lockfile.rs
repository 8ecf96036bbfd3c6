use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use graft_util::errors::GraftError;

use crate::provider::GraphLock;
use crate::reference::PackageRef;
use crate::requirement::{Requirement, Requirements};

/// A lock file pinning every node of a resolved graph (`graft.lock`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GraphLockFile {
    /// Id of the root node.
    #[serde(default)]
    pub root: usize,
    /// Node id → locked node. Keys are the decimal ids.
    #[serde(default)]
    pub nodes: BTreeMap<String, LockedNode>,
}

/// One pinned node with the ids of the nodes it requires.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LockedNode {
    /// Absent for a root without reference.
    #[serde(default, rename = "ref")]
    pub reference: Option<PackageRef>,
    #[serde(default)]
    pub requires: Vec<usize>,
    #[serde(default)]
    pub build_requires: Vec<usize>,
    #[serde(default)]
    pub python_requires: Vec<PackageRef>,
}

impl GraphLockFile {
    /// Load and parse a lock file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GraftError::Lockfile {
            message: format!("Failed to read lockfile: {e}"),
        })?;
        toml::from_str(&content).map_err(|e| {
            GraftError::Lockfile {
                message: format!("Failed to parse lockfile: {e}"),
            }
            .into()
        })
    }

    /// Serialize the lock file to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn write(&self, path: &Path) -> miette::Result<()> {
        let text = self.to_string_pretty().map_err(|e| GraftError::Lockfile {
            message: format!("Failed to serialize lockfile: {e}"),
        })?;
        std::fs::write(path, text).map_err(|e| {
            GraftError::Lockfile {
                message: format!("Failed to write {}: {e}", path.display()),
            }
            .into()
        })
    }

    pub fn node(&self, id: usize) -> Option<&LockedNode> {
        self.nodes.get(&id.to_string())
    }

    pub fn insert(&mut self, id: usize, node: LockedNode) {
        self.nodes.insert(id.to_string(), node);
    }

    fn max_id(&self) -> Option<usize> {
        self.nodes.keys().filter_map(|k| k.parse::<usize>().ok()).max()
    }

    fn locked(&self, id: usize) -> Result<&LockedNode, GraftError> {
        self.node(id).ok_or_else(|| GraftError::Lockfile {
            message: format!("node {id} is not in the lockfile"),
        })
    }
}

impl GraphLock for GraphLockFile {
    fn root_id(&self) -> usize {
        self.root
    }

    fn initial_counter(&self) -> Option<usize> {
        self.max_id().map(|id| id + 1)
    }

    fn lock_node(
        &self,
        node_id: usize,
        requirements: &mut Requirements,
        build_requires: bool,
    ) -> miette::Result<()> {
        let locked = self.locked(node_id)?;
        let ids = if build_requires {
            &locked.build_requires
        } else {
            &locked.requires
        };

        let mut pinned = Requirements::new();
        for &id in ids {
            let reference = self
                .locked(id)?
                .reference
                .clone()
                .ok_or_else(|| GraftError::Lockfile {
                    message: format!("locked node {id} has no reference"),
                })?;
            let mut req = requirements
                .get(&reference.name)
                .cloned()
                .unwrap_or_else(|| {
                    let mut req = Requirement::new(reference.clone());
                    req.build_require = build_requires;
                    req
                });
            req.lock(reference, id);
            pinned.insert(req);
        }
        tracing::trace!("node {node_id} locked to {pinned}");
        *requirements = pinned;
        Ok(())
    }

    fn python_requires(&self, locked_id: usize) -> Option<Vec<PackageRef>> {
        self.node(locked_id).map(|n| n.python_requires.clone())
    }
}
