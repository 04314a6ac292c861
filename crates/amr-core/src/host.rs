//! Collaborators the registry drives: scene graph, asset loader and
//! diagnostics sink.
//!
//! None of these are implemented here beyond the in-memory doubles in
//! [`crate::memory`]. The registry receives them per call as a single
//! [`Host`], so the same registry can run against a real engine, a replay
//! harness or a test recorder.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, SceneError};
use crate::overlay::SceneNode;
use crate::pose::Pose;
use crate::registry::Counters;

/// Correlates an asset request with its eventual completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadTicket(pub u64);

/// Loader-issued handle to a renderable (texture or model).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(pub u64);

/// Scene-graph-issued handle to an attached node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(pub u64);

/// What an overlay needs loaded before it can be shown.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum AssetRef {
    Texture(String),
    Model(String),
}

impl AssetRef {
    pub fn name(&self) -> &str {
        match self {
            AssetRef::Texture(name) | AssetRef::Model(name) => name,
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::Texture(name) => write!(f, "texture:{name}"),
            AssetRef::Model(name) => write!(f, "model:{name}"),
        }
    }
}

/// Immediate answer to an asset request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// Will complete later through `MarkerRegistry::complete_load`.
    Pending,
    /// Already resident; no completion follows.
    Ready(AssetHandle),
}

pub trait SceneGraph {
    /// Attach `node` as a child of a new anchor at `anchor`.
    fn attach(&mut self, anchor: &Pose, node: &SceneNode) -> Result<NodeHandle, SceneError>;

    /// Remove a previously attached node together with its anchor.
    fn detach(&mut self, node: NodeHandle) -> Result<(), SceneError>;
}

pub trait AssetLoader {
    /// Start loading `asset`. Must not block.
    fn request(&mut self, ticket: LoadTicket, asset: &AssetRef) -> Result<LoadStatus, LoadError>;
}

pub trait DiagnosticsSink {
    fn publish(&mut self, counters: Counters);
}

/// Everything the registry talks to, bundled.
pub trait Host: SceneGraph + AssetLoader + DiagnosticsSink {}

impl<T: SceneGraph + AssetLoader + DiagnosticsSink + ?Sized> Host for T {}
