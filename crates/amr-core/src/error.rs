use std::fmt;

use crate::host::NodeHandle;

/// Failure to produce a renderable asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// The asset source has no entry under this name.
    NotFound(String),
    /// Reading the asset failed.
    Io(String),
    /// The asset was read but could not be turned into a renderable.
    Decode(String),
    /// The loader itself cannot accept work (no asset source, shut down).
    Unavailable(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound(name) => write!(f, "asset not found: {name}"),
            LoadError::Io(msg) => write!(f, "asset I/O error: {msg}"),
            LoadError::Decode(msg) => write!(f, "asset decode error: {msg}"),
            LoadError::Unavailable(msg) => write!(f, "asset loader unavailable: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Failure reported by the scene graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneError {
    Rejected(String),
    UnknownNode(NodeHandle),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::Rejected(msg) => write!(f, "scene graph rejected node: {msg}"),
            SceneError::UnknownNode(node) => write!(f, "unknown scene node {}", node.0),
        }
    }
}

impl std::error::Error for SceneError {}
