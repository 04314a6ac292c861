//! Random tracker sessions against an in-memory host.

use amr_core::{
    LoadError, LoadMode, Marker, MarkerRegistry, MemoryHost, OverlayCatalog, Pose,
    TrackingState, Vec3,
};
use anyhow::{Result, bail};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Label with no overlay, so the skip path gets exercised too.
const UNMAPPED_LABEL: &str = "abs_1";

/// Chance per frame that a marker changes state.
const TRANSITION_P: f64 = 0.3;

/// Chance per frame that a queued asset load finishes.
const COMPLETE_P: f64 = 0.5;

/// Share of finished loads that fail.
const FAILURE_P: f64 = 0.1;

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub frames: usize,
    pub markers: usize,
    pub seed: u64,
    pub tracking: usize,
    pub detected: u64,
    pub attached: usize,
    pub failed_loads: usize,
    pub late_completions: usize,
}

struct SimMarker {
    id: u64,
    label: String,
    /// Last state reported to the registry; `None` until first seen.
    state: Option<TrackingState>,
}

impl SimMarker {
    fn next_state(&self, rng: &mut impl Rng) -> TrackingState {
        use TrackingState::*;
        match self.state {
            None | Some(Stopped) => {
                if rng.random_bool(0.5) {
                    Paused
                } else {
                    Tracking
                }
            }
            Some(Paused) => {
                if rng.random_bool(0.7) {
                    Tracking
                } else {
                    Stopped
                }
            }
            Some(Tracking) => {
                if rng.random_bool(0.6) {
                    Paused
                } else {
                    Stopped
                }
            }
        }
    }
}

fn random_pose(rng: &mut impl Rng) -> Pose {
    Pose::from_translation(Vec3::new(
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-2.0..-0.5),
    ))
}

/// Run `frames` random frames over `markers` markers, checking after each
/// frame that the tracking counter matches the live entries and that the
/// scene holds exactly the attached overlays.
pub fn run(
    catalog: OverlayCatalog,
    frames: usize,
    markers: usize,
    seed: u64,
) -> Result<SimulationReport> {
    let mut labels: Vec<String> = catalog.iter().map(|(label, _)| label.to_string()).collect();
    labels.push(UNMAPPED_LABEL.to_string());

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut registry = MarkerRegistry::new(catalog);
    let mut host = MemoryHost::with_mode(LoadMode::Deferred);
    let mut sim: Vec<SimMarker> = (0..markers)
        .map(|i| SimMarker {
            id: i as u64,
            label: labels[i % labels.len()].clone(),
            state: None,
        })
        .collect();

    let mut queued = Vec::new();
    let mut failed_loads = 0;
    let mut late_completions = 0;

    for frame in 0..frames {
        queued.extend(host.loader.take_pending());
        let mut still_queued = Vec::new();
        for (ticket, asset) in queued.drain(..) {
            if !rng.random_bool(COMPLETE_P) {
                still_queued.push((ticket, asset));
                continue;
            }
            let result = if rng.random_bool(FAILURE_P) {
                failed_loads += 1;
                Err(LoadError::Decode(format!("simulated failure for {asset}")))
            } else {
                Ok(host.loader.mint())
            };
            if !registry.complete_load(ticket, result, &mut host) {
                late_completions += 1;
            }
        }
        queued = still_queued;

        let mut updated = Vec::new();
        for m in sim.iter_mut() {
            if !rng.random_bool(TRANSITION_P) {
                continue;
            }
            let state = m.next_state(&mut rng);
            m.state = Some(state);
            updated.push(match state {
                TrackingState::Paused => Marker::paused(m.id, &m.label),
                TrackingState::Tracking => Marker::tracking(m.id, &m.label, random_pose(&mut rng)),
                TrackingState::Stopped => Marker::stopped(m.id, &m.label),
            });
        }
        registry.process_frame(&updated, &mut host);

        let counters = registry.counters();
        if counters.tracking != registry.len() {
            bail!(
                "frame {frame}: tracking counter {} but {} live entries",
                counters.tracking,
                registry.len()
            );
        }
        let attached = registry.entries().filter(|e| e.overlay.is_attached()).count();
        if host.scene.nodes.len() != attached {
            bail!(
                "frame {frame}: {} scene nodes but {attached} attached overlays",
                host.scene.nodes.len()
            );
        }
        if let Some(entry) = registry.entries().find(|e| registry.has_failed(e.marker)) {
            bail!("frame {frame}: marker {} is both live and failed", entry.marker);
        }
    }

    let counters = registry.counters();
    tracing::info!(
        "simulated {frames} frames: {} tracking, {} detected",
        counters.tracking,
        counters.detected
    );
    Ok(SimulationReport {
        frames,
        markers,
        seed,
        tracking: counters.tracking,
        detected: counters.detected,
        attached: host.scene.nodes.len(),
        failed_loads,
        late_completions,
    })
}
