//! Augmented marker registry.
//!
//! Keeps track of which reference images ("markers") an external tracker is
//! currently following and which overlay is attached to each. The tracker
//! reports per-frame state changes; the registry turns them into asset
//! requests, scene-graph attaches and detaches, and diagnostic counters.
//!
//! Zero I/O. Scene graph, asset loading and diagnostics are collaborators
//! passed in as a [`Host`].

pub mod catalog;
pub mod constants;
pub mod error;
pub mod host;
pub mod marker;
pub mod memory;
pub mod overlay;
pub mod pose;
pub mod registry;

pub use catalog::{OverlayCatalog, OverlayFactory};
pub use constants::{DEFAULT_EXTENT, EPSILON, FLAT_NODE_SCALE};
pub use error::{LoadError, SceneError};
pub use host::{
    AssetHandle, AssetLoader, AssetRef, DiagnosticsSink, Host, LoadStatus, LoadTicket, NodeHandle,
    SceneGraph,
};
pub use marker::{CameraState, Frame, Marker, MarkerId, TrackingState};
pub use memory::{LoadMode, MemoryHost, MemoryLoader, MemoryScene};
pub use overlay::{
    AssetSlot, AttachStep, DynamicRecipe, FlatRecipe, LocalOffset, NodeShape, Overlay,
    OverlayRecipe, SceneNode,
};
pub use pose::{Pose, Quaternion, Vec3};
pub use registry::{
    Counters, EntrySnapshot, MarkerRegistry, NotifyPolicy, RegistryEntry, RegistryOptions,
    RegistrySnapshot,
};
