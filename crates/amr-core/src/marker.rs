use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_EXTENT;
use crate::pose::Pose;

/// Stable identity of one physical reference image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tracking state reported by the tracker for a single marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    /// Detected but not yet stably tracked.
    Paused,
    /// Tracked with a usable pose.
    Tracking,
    /// Left the camera's effective tracking region.
    Stopped,
}

/// Camera tracking state. Frames are only meaningful while `Tracking`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraState {
    #[default]
    Tracking,
    Paused,
    Stopped,
}

/// A trackable reference image as seen in one frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    /// Name the image was registered under; selects the overlay.
    pub label: String,
    pub state: TrackingState,
    /// Physical width of the reference image (metres).
    pub extent_x: f64,
    /// Physical depth of the reference image (metres).
    pub extent_z: f64,
    /// Centre pose, present while `Tracking`.
    pub center_pose: Option<Pose>,
}

impl Marker {
    pub fn new(id: MarkerId, label: &str, state: TrackingState) -> Self {
        Self {
            id,
            label: label.to_string(),
            state,
            extent_x: DEFAULT_EXTENT,
            extent_z: DEFAULT_EXTENT,
            center_pose: None,
        }
    }

    pub fn paused(id: u64, label: &str) -> Self {
        Self::new(MarkerId(id), label, TrackingState::Paused)
    }

    pub fn tracking(id: u64, label: &str, pose: Pose) -> Self {
        Self::new(MarkerId(id), label, TrackingState::Tracking).with_pose(pose)
    }

    pub fn stopped(id: u64, label: &str) -> Self {
        Self::new(MarkerId(id), label, TrackingState::Stopped)
    }

    pub fn with_extent(mut self, extent_x: f64, extent_z: f64) -> Self {
        self.extent_x = extent_x;
        self.extent_z = extent_z;
        self
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.center_pose = Some(pose);
        self
    }

    /// Anchor pose for an overlay. Falls back to identity when the tracker
    /// reported `Tracking` without a pose.
    pub fn anchor_pose(&self) -> Pose {
        self.center_pose.unwrap_or_default()
    }
}

/// One tracker frame: camera state plus the markers whose state changed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub camera: CameraState,
    #[serde(default)]
    pub updated: Vec<Marker>,
}

impl Frame {
    pub fn tracking(updated: Vec<Marker>) -> Self {
        Self {
            camera: CameraState::Tracking,
            updated,
        }
    }

    /// Whether marker updates in this frame should be processed at all.
    pub fn is_usable(&self) -> bool {
        self.camera == CameraState::Tracking
    }
}
