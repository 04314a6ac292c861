//! Scripted tracker sessions.
//!
//! A scenario is a TOML list of frames, each carrying the markers whose
//! state changed in that frame:
//!
//! ```toml
//! [[frame]]
//! [[frame.marker]]
//! id = 6
//! label = "abs_6"
//! state = "tracking"
//! position = [0.0, 0.0, -1.0]
//! ```

use std::path::Path;

use amr_core::{
    CameraState, DEFAULT_EXTENT, Frame, Marker, MarkerId, Pose, Quaternion, TrackingState, Vec3,
};
use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(rename = "frame", default)]
    pub frames: Vec<ScenarioFrame>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioFrame {
    pub camera: CameraState,
    /// Wait for every outstanding asset load before this frame.
    pub settle: bool,
    #[serde(rename = "marker")]
    pub markers: Vec<ScenarioMarker>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioMarker {
    pub id: u64,
    pub label: String,
    pub state: TrackingState,
    /// `[extent_x, extent_z]` in metres.
    pub extent: Option<[f64; 2]>,
    pub position: Option<[f64; 3]>,
    /// `[w, x, y, z]`; identity when omitted.
    pub rotation: Option<[f64; 4]>,
}

impl ScenarioMarker {
    fn to_marker(&self) -> Marker {
        let [extent_x, extent_z] = self.extent.unwrap_or([DEFAULT_EXTENT, DEFAULT_EXTENT]);
        let mut marker = Marker::new(MarkerId(self.id), &self.label, self.state)
            .with_extent(extent_x, extent_z);
        if self.state == TrackingState::Tracking || self.position.is_some() {
            let translation = self.position.map(Vec3::from).unwrap_or_default();
            let rotation = self
                .rotation
                .map(Quaternion::from_array)
                .unwrap_or_else(Quaternion::identity);
            marker = marker.with_pose(Pose::new(translation, rotation));
        }
        marker
    }
}

impl ScenarioFrame {
    pub fn to_frame(&self) -> Frame {
        Frame {
            camera: self.camera,
            updated: self.markers.iter().map(ScenarioMarker::to_marker).collect(),
        }
    }
}

impl Scenario {
    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content).context("invalid scenario")?;
        for (i, frame) in scenario.frames.iter().enumerate() {
            for marker in &frame.markers {
                if let Some([x, z]) = marker.extent
                    && !(x > 0.0 && z > 0.0)
                {
                    bail!("frame {i}: marker {} has non-positive extent", marker.id);
                }
            }
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }
}
