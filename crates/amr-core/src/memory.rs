//! In-memory collaborators.
//!
//! `MemoryScene` keeps attached nodes in a map, `MemoryLoader` answers asset
//! requests either immediately or by queueing them for the caller to
//! complete. `MemoryHost` bundles both with a diagnostics recorder. Used by
//! the simulator and throughout the tests.

use std::collections::{BTreeMap, VecDeque};

use crate::error::{LoadError, SceneError};
use crate::host::{
    AssetHandle, AssetLoader, AssetRef, DiagnosticsSink, LoadStatus, LoadTicket, NodeHandle,
    SceneGraph,
};
use crate::overlay::SceneNode;
use crate::pose::Pose;
use crate::registry::Counters;

/// A node as the scene graph holds it.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachedNode {
    pub anchor: Pose,
    pub node: SceneNode,
}

#[derive(Debug, Default)]
pub struct MemoryScene {
    pub nodes: BTreeMap<NodeHandle, AttachedNode>,
    pub attach_calls: usize,
    pub detach_calls: usize,
    /// Refuse every attach.
    pub reject: bool,
    next_node: u64,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// World-space position of an attached node's origin.
    pub fn world_position(&self, node: NodeHandle) -> Option<crate::pose::Vec3> {
        self.nodes
            .get(&node)
            .map(|n| n.anchor.transform_point(n.node.local_position))
    }
}

impl SceneGraph for MemoryScene {
    fn attach(&mut self, anchor: &Pose, node: &SceneNode) -> Result<NodeHandle, SceneError> {
        self.attach_calls += 1;
        if self.reject {
            return Err(SceneError::Rejected("scene is read-only".to_string()));
        }
        let handle = NodeHandle(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            handle,
            AttachedNode {
                anchor: *anchor,
                node: *node,
            },
        );
        tracing::debug!("scene: attached node {} ({:?})", handle.0, node.shape);
        Ok(handle)
    }

    fn detach(&mut self, node: NodeHandle) -> Result<(), SceneError> {
        self.detach_calls += 1;
        match self.nodes.remove(&node) {
            Some(_) => {
                tracing::debug!("scene: detached node {}", node.0);
                Ok(())
            }
            None => Err(SceneError::UnknownNode(node)),
        }
    }
}

/// How `MemoryLoader` answers requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Every asset is resident; requests return `Ready`.
    #[default]
    Immediate,
    /// Requests return `Pending` and queue up for the caller to complete.
    Deferred,
}

#[derive(Debug, Default)]
pub struct MemoryLoader {
    pub mode: LoadMode,
    /// Refuse every request with `LoadError::Unavailable`.
    pub unavailable: bool,
    /// Every accepted request, in order.
    pub requests: Vec<(LoadTicket, AssetRef)>,
    pending: VecDeque<(LoadTicket, AssetRef)>,
    next_asset: u64,
}

impl MemoryLoader {
    pub fn new(mode: LoadMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Take every queued (deferred) request.
    pub fn take_pending(&mut self) -> Vec<(LoadTicket, AssetRef)> {
        self.pending.drain(..).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Mint a handle for a completion the caller is about to deliver.
    pub fn mint(&mut self) -> AssetHandle {
        let handle = AssetHandle(self.next_asset);
        self.next_asset += 1;
        handle
    }
}

impl AssetLoader for MemoryLoader {
    fn request(&mut self, ticket: LoadTicket, asset: &AssetRef) -> Result<LoadStatus, LoadError> {
        if self.unavailable {
            return Err(LoadError::Unavailable("memory loader disabled".to_string()));
        }
        self.requests.push((ticket, asset.clone()));
        match self.mode {
            LoadMode::Immediate => Ok(LoadStatus::Ready(self.mint())),
            LoadMode::Deferred => {
                self.pending.push_back((ticket, asset.clone()));
                Ok(LoadStatus::Pending)
            }
        }
    }
}

/// Scene, loader and a diagnostics recorder in one [`crate::Host`].
#[derive(Debug, Default)]
pub struct MemoryHost {
    pub scene: MemoryScene,
    pub loader: MemoryLoader,
    pub published: Vec<Counters>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: LoadMode) -> Self {
        Self {
            loader: MemoryLoader::new(mode),
            ..Self::default()
        }
    }

    pub fn last_published(&self) -> Option<Counters> {
        self.published.last().copied()
    }
}

impl SceneGraph for MemoryHost {
    fn attach(&mut self, anchor: &Pose, node: &SceneNode) -> Result<NodeHandle, SceneError> {
        self.scene.attach(anchor, node)
    }

    fn detach(&mut self, node: NodeHandle) -> Result<(), SceneError> {
        self.scene.detach(node)
    }
}

impl AssetLoader for MemoryHost {
    fn request(&mut self, ticket: LoadTicket, asset: &AssetRef) -> Result<LoadStatus, LoadError> {
        self.loader.request(ticket, asset)
    }
}

impl DiagnosticsSink for MemoryHost {
    fn publish(&mut self, counters: Counters) {
        self.published.push(counters);
    }
}
