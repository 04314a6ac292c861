//! Overlays: the visual content bound to a tracked marker.
//!
//! A recipe describes what to build for a label; instantiating it against a
//! concrete marker resolves extent-relative offsets and yields an
//! [`Overlay`]. Both variants wait on an asset (texture or model) and gate
//! their own attach on it, so the registry can ask to attach at any time.

use serde::{Deserialize, Serialize};

use crate::constants::FLAT_NODE_SCALE;
use crate::host::{AssetHandle, AssetRef, NodeHandle};
use crate::marker::Marker;
use crate::pose::{Pose, Vec3};

/// Where the overlay node sits relative to its anchor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalOffset {
    Fixed(Vec3),
    /// `factor × marker.extent_z` along +Z.
    ExtentZ(f64),
}

impl Default for LocalOffset {
    fn default() -> Self {
        LocalOffset::Fixed(Vec3::zero())
    }
}

impl LocalOffset {
    pub fn resolve(&self, marker: &Marker) -> Vec3 {
        match *self {
            LocalOffset::Fixed(v) => v,
            LocalOffset::ExtentZ(factor) => Vec3::new(0.0, 0.0, factor * marker.extent_z),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatRecipe {
    pub texture: String,
    pub size_x: f64,
    pub size_z: f64,
    #[serde(default)]
    pub offset: LocalOffset,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicRecipe {
    pub model: String,
}

/// How to build the overlay for one label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OverlayRecipe {
    Flat(FlatRecipe),
    Dynamic(DynamicRecipe),
}

impl OverlayRecipe {
    pub fn flat(texture: &str, size_x: f64, size_z: f64) -> Self {
        OverlayRecipe::Flat(FlatRecipe {
            texture: texture.to_string(),
            size_x,
            size_z,
            offset: LocalOffset::default(),
        })
    }

    pub fn dynamic(model: &str) -> Self {
        OverlayRecipe::Dynamic(DynamicRecipe {
            model: model.to_string(),
        })
    }

    /// Set the local offset. No effect on dynamic recipes.
    pub fn with_offset(mut self, offset: LocalOffset) -> Self {
        if let OverlayRecipe::Flat(flat) = &mut self {
            flat.offset = offset;
        }
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OverlayRecipe::Flat(_) => "flat",
            OverlayRecipe::Dynamic(_) => "dynamic",
        }
    }

    pub fn asset(&self) -> AssetRef {
        match self {
            OverlayRecipe::Flat(flat) => AssetRef::Texture(flat.texture.clone()),
            OverlayRecipe::Dynamic(dynamic) => AssetRef::Model(dynamic.model.clone()),
        }
    }

    /// Build a fresh, unbound overlay for `marker`.
    pub fn instantiate(&self, marker: &Marker) -> Overlay {
        match self {
            OverlayRecipe::Flat(flat) => Overlay::Flat(FlatOverlay {
                texture: flat.texture.clone(),
                size_x: flat.size_x,
                size_z: flat.size_z,
                local_position: flat.offset.resolve(marker),
                binding: Binding::default(),
            }),
            OverlayRecipe::Dynamic(dynamic) => Overlay::Dynamic(DynamicOverlay {
                model: dynamic.model.clone(),
                binding: Binding::default(),
            }),
        }
    }
}

/// Readiness of the asset backing an overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssetSlot {
    #[default]
    Pending,
    Ready(AssetHandle),
    Failed,
}

/// Geometry of a node handed to the scene graph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum NodeShape {
    /// Flat box of `size_x × 0 × size_z` centred on the node.
    Quad { size_x: f64, size_z: f64 },
    Model,
}

/// A renderable child node, positioned relative to its anchor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub asset: AssetHandle,
    pub shape: NodeShape,
    pub local_position: Vec3,
    pub local_scale: Vec3,
}

/// Outcome of asking an overlay to attach.
#[derive(Clone, Debug, PartialEq)]
pub enum AttachStep {
    /// Asset is ready: hand this node to the scene graph under `anchor`.
    Attach { anchor: Pose, node: SceneNode },
    /// Asset not ready yet (or no anchor bound); try again on completion.
    Deferred,
    AlreadyAttached,
    /// Asset failed to load; this overlay will never attach.
    Failed,
}

/// Anchor, asset and scene state shared by both variants.
#[derive(Clone, Debug, Default)]
struct Binding {
    slot: AssetSlot,
    anchor: Option<Pose>,
    node: Option<NodeHandle>,
}

#[derive(Clone, Debug)]
pub struct FlatOverlay {
    pub texture: String,
    pub size_x: f64,
    pub size_z: f64,
    pub local_position: Vec3,
    binding: Binding,
}

#[derive(Clone, Debug)]
pub struct DynamicOverlay {
    pub model: String,
    binding: Binding,
}

#[derive(Clone, Debug)]
pub enum Overlay {
    Flat(FlatOverlay),
    Dynamic(DynamicOverlay),
}

impl Overlay {
    fn binding(&self) -> &Binding {
        match self {
            Overlay::Flat(flat) => &flat.binding,
            Overlay::Dynamic(dynamic) => &dynamic.binding,
        }
    }

    fn binding_mut(&mut self) -> &mut Binding {
        match self {
            Overlay::Flat(flat) => &mut flat.binding,
            Overlay::Dynamic(dynamic) => &mut dynamic.binding,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Overlay::Flat(_) => "flat",
            Overlay::Dynamic(_) => "dynamic",
        }
    }

    pub fn asset(&self) -> AssetRef {
        match self {
            Overlay::Flat(flat) => AssetRef::Texture(flat.texture.clone()),
            Overlay::Dynamic(dynamic) => AssetRef::Model(dynamic.model.clone()),
        }
    }

    pub fn slot(&self) -> AssetSlot {
        self.binding().slot
    }

    pub fn is_attached(&self) -> bool {
        self.binding().node.is_some()
    }

    pub fn anchor(&self) -> Option<Pose> {
        self.binding().anchor
    }

    pub fn node(&self) -> Option<NodeHandle> {
        self.binding().node
    }

    /// Record the loaded asset. A slot that already failed stays failed.
    pub fn resolve(&mut self, asset: AssetHandle) {
        let binding = self.binding_mut();
        if binding.slot == AssetSlot::Pending {
            binding.slot = AssetSlot::Ready(asset);
        }
    }

    pub fn fail(&mut self) {
        self.binding_mut().slot = AssetSlot::Failed;
    }

    /// Bind the anchor to `anchor` and attach if the asset allows it.
    ///
    /// The first bound anchor wins; later calls only re-check readiness.
    pub fn attach(&mut self, anchor: Pose) -> AttachStep {
        let binding = self.binding_mut();
        if binding.anchor.is_none() {
            binding.anchor = Some(anchor);
        }
        self.retry()
    }

    /// Re-check readiness against the already bound anchor.
    pub fn retry(&self) -> AttachStep {
        let binding = self.binding();
        if binding.node.is_some() {
            return AttachStep::AlreadyAttached;
        }
        let asset = match binding.slot {
            AssetSlot::Pending => return AttachStep::Deferred,
            AssetSlot::Failed => return AttachStep::Failed,
            AssetSlot::Ready(asset) => asset,
        };
        let Some(anchor) = binding.anchor else {
            return AttachStep::Deferred;
        };
        AttachStep::Attach {
            anchor,
            node: self.scene_node(asset),
        }
    }

    pub fn mark_attached(&mut self, node: NodeHandle) {
        self.binding_mut().node = Some(node);
    }

    /// Forget the scene node, returning it so the caller can detach it.
    pub fn take_node(&mut self) -> Option<NodeHandle> {
        self.binding_mut().node.take()
    }

    fn scene_node(&self, asset: AssetHandle) -> SceneNode {
        match self {
            Overlay::Flat(flat) => SceneNode {
                asset,
                shape: NodeShape::Quad {
                    size_x: flat.size_x,
                    size_z: flat.size_z,
                },
                local_position: flat.local_position,
                local_scale: Vec3::splat(FLAT_NODE_SCALE),
            },
            Overlay::Dynamic(_) => SceneNode {
                asset,
                shape: NodeShape::Model,
                local_position: Vec3::zero(),
                local_scale: Vec3::splat(1.0),
            },
        }
    }
}
