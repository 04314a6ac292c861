use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::catalog::OverlayFactory;
use crate::error::LoadError;
use crate::host::{AssetHandle, Host, LoadStatus, LoadTicket, NodeHandle};
use crate::marker::{Frame, Marker, MarkerId, TrackingState};
use crate::overlay::{AttachStep, Overlay};

/// Diagnostic counters published after each processed marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Paused observations seen so far. Never decreases.
    pub detected: u64,
    /// Live registry entries.
    pub tracking: usize,
}

/// When to publish counters to the diagnostics sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyPolicy {
    /// After every processed marker, whatever branch ran.
    #[default]
    EveryMarker,
    /// Only when the counters differ from the last published value.
    OnChange,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryOptions {
    #[serde(default)]
    pub notify: NotifyPolicy,
}

/// Live association between a tracked marker and its overlay.
#[derive(Debug)]
pub struct RegistryEntry {
    pub marker: MarkerId,
    pub label: String,
    pub overlay: Overlay,
    /// Outstanding asset request, if the overlay is still waiting.
    ticket: Option<LoadTicket>,
}

/// Serializable view of one entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub marker: MarkerId,
    pub label: String,
    pub kind: String,
    pub asset: String,
    pub attached: bool,
    pub pending: bool,
}

/// Serializable view of the whole registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub counters: Counters,
    pub entries: Vec<EntrySnapshot>,
    pub failed: Vec<MarkerId>,
}

/// Tracks which markers currently carry an overlay.
///
/// Driven once per frame with the markers whose tracking state changed.
/// Paused markers bump the detection counter, the first Tracking update for
/// a marker builds and attaches its overlay, and Stopped removes it. Asset
/// completions come back through [`MarkerRegistry::complete_load`] on the
/// same thread that calls [`MarkerRegistry::process_frame`].
///
/// Invariants:
/// - at most one entry per marker id;
/// - `counters().tracking == len()`;
/// - an overlay is created at most once per tracking episode (the span
///   between two Stopped transitions).
pub struct MarkerRegistry {
    factory: Box<dyn OverlayFactory>,
    options: RegistryOptions,
    entries: HashMap<MarkerId, RegistryEntry>,
    in_flight: HashMap<LoadTicket, MarkerId>,
    /// Markers whose overlay failed this episode; cleared on Stopped.
    failed: HashSet<MarkerId>,
    counters: Counters,
    last_published: Option<Counters>,
    next_ticket: u64,
}

impl MarkerRegistry {
    pub fn new(factory: impl OverlayFactory + 'static) -> Self {
        Self::with_options(factory, RegistryOptions::default())
    }

    pub fn with_options(factory: impl OverlayFactory + 'static, options: RegistryOptions) -> Self {
        Self {
            factory: Box::new(factory),
            options,
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            failed: HashSet::new(),
            counters: Counters::default(),
            last_published: None,
            next_ticket: 0,
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, marker: MarkerId) -> bool {
        self.entries.contains_key(&marker)
    }

    pub fn entry(&self, marker: MarkerId) -> Option<&RegistryEntry> {
        self.entries.get(&marker)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// Asset requests still awaiting a completion.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether `marker` gave up on its overlay for the current episode.
    pub fn has_failed(&self, marker: MarkerId) -> bool {
        self.failed.contains(&marker)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut entries: Vec<EntrySnapshot> = self
            .entries
            .values()
            .map(|e| EntrySnapshot {
                marker: e.marker,
                label: e.label.clone(),
                kind: e.overlay.kind().to_string(),
                asset: e.overlay.asset().to_string(),
                attached: e.overlay.is_attached(),
                pending: e.ticket.is_some(),
            })
            .collect();
        entries.sort_by_key(|e| e.marker);

        let mut failed: Vec<MarkerId> = self.failed.iter().copied().collect();
        failed.sort();

        RegistrySnapshot {
            counters: self.counters,
            entries,
            failed,
        }
    }

    // -----------------------------------------------------------------------
    // Frame processing
    // -----------------------------------------------------------------------

    /// Process a tracker frame, ignoring it unless the camera is tracking.
    /// Returns whether the frame was processed.
    pub fn process_camera_frame(&mut self, frame: &Frame, host: &mut impl Host) -> bool {
        if !frame.is_usable() {
            tracing::debug!("camera {:?}, skipping frame", frame.camera);
            return false;
        }
        self.process_frame(&frame.updated, host);
        true
    }

    /// Apply one frame's batch of state-changed markers, in order.
    pub fn process_frame(&mut self, updated: &[Marker], host: &mut impl Host) {
        for marker in updated {
            match marker.state {
                TrackingState::Paused => self.on_paused(marker),
                TrackingState::Tracking => self.on_tracking(marker, host),
                TrackingState::Stopped => self.on_stopped(marker, host),
            }
            self.notify(host);
        }
    }

    fn on_paused(&mut self, marker: &Marker) {
        self.counters.detected += 1;
        tracing::debug!("marker {} ({}) detected", marker.id, marker.label);
    }

    fn on_tracking(&mut self, marker: &Marker, host: &mut impl Host) {
        if self.entries.contains_key(&marker.id) {
            return;
        }
        if self.failed.contains(&marker.id) {
            tracing::debug!(
                "marker {} ({}) failed earlier this episode, not retrying",
                marker.id,
                marker.label
            );
            return;
        }
        let Some(recipe) = self.factory.recipe(&marker.label) else {
            tracing::debug!(
                "no overlay for label '{}', skipping marker {}",
                marker.label,
                marker.id
            );
            return;
        };

        let mut overlay = recipe.instantiate(marker);
        let asset = overlay.asset();
        let ticket = self.issue_ticket();
        let pending = match host.request(ticket, &asset) {
            Ok(LoadStatus::Ready(handle)) => {
                overlay.resolve(handle);
                false
            }
            Ok(LoadStatus::Pending) => true,
            Err(e) => {
                tracing::warn!("cannot request {asset} for marker {}: {e}", marker.id);
                return;
            }
        };

        if let AttachStep::Attach { anchor, node } = overlay.attach(marker.anchor_pose()) {
            match host.attach(&anchor, &node) {
                Ok(handle) => overlay.mark_attached(handle),
                Err(e) => {
                    tracing::warn!("scene graph refused overlay for marker {}: {e}", marker.id);
                    self.failed.insert(marker.id);
                    return;
                }
            }
        }

        if pending {
            self.in_flight.insert(ticket, marker.id);
        }
        tracing::info!(
            "registered {} overlay for marker {} ({}){}",
            overlay.kind(),
            marker.id,
            marker.label,
            if pending { ", waiting for asset" } else { "" }
        );
        self.entries.insert(
            marker.id,
            RegistryEntry {
                marker: marker.id,
                label: marker.label.clone(),
                overlay,
                ticket: pending.then_some(ticket),
            },
        );
        self.counters.tracking += 1;
    }

    fn on_stopped(&mut self, marker: &Marker, host: &mut impl Host) {
        self.failed.remove(&marker.id);
        if self.remove_entry(marker.id, host) {
            tracing::info!("marker {} ({}) out of scope, overlay removed", marker.id, marker.label);
        }
    }

    // -----------------------------------------------------------------------
    // Asset completions and eviction
    // -----------------------------------------------------------------------

    /// Deliver the result of an asset request issued with `ticket`.
    ///
    /// Completions for markers that were stopped or evicted in the meantime
    /// are dropped. Returns whether the completion was applied.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<AssetHandle, LoadError>,
        host: &mut impl Host,
    ) -> bool {
        let Some(marker) = self.in_flight.remove(&ticket) else {
            tracing::debug!(
                "dropping completion for ticket {}: marker no longer registered",
                ticket.0
            );
            return false;
        };
        let Some(entry) = self.entries.get_mut(&marker) else {
            return false;
        };
        entry.ticket = None;

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("failed to load {} for marker {marker}: {e}", entry.overlay.asset());
                entry.overlay.fail();
                self.abandon(marker, host);
                return true;
            }
        };

        entry.overlay.resolve(handle);
        if let AttachStep::Attach { anchor, node } = entry.overlay.retry() {
            match host.attach(&anchor, &node) {
                Ok(node) => {
                    entry.overlay.mark_attached(node);
                    tracing::info!(
                        "{} ready, attached overlay for marker {marker}",
                        entry.overlay.asset()
                    );
                }
                Err(e) => {
                    tracing::warn!("scene graph refused overlay for marker {marker}: {e}");
                    self.abandon(marker, host);
                }
            }
        }
        true
    }

    /// Remove `marker`'s entry on behalf of an outside owner.
    /// Returns whether an entry existed.
    pub fn evict(&mut self, marker: MarkerId, host: &mut impl Host) -> bool {
        let removed = self.remove_entry(marker, host);
        if removed {
            tracing::info!("evicted overlay for marker {marker}");
            self.notify(host);
        }
        removed
    }

    /// Detach everything and forget all entries. The detection counter is
    /// kept; it describes the session, not the live set.
    pub fn clear(&mut self, host: &mut impl Host) {
        let mut markers: Vec<MarkerId> = self.entries.keys().copied().collect();
        markers.sort();
        for marker in markers {
            self.remove_entry(marker, host);
        }
        self.in_flight.clear();
        self.failed.clear();
        self.notify(host);
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn issue_ticket(&mut self) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    /// Drop the entry and keep the marker out until its next Stopped.
    fn abandon(&mut self, marker: MarkerId, host: &mut impl Host) {
        self.remove_entry(marker, host);
        self.failed.insert(marker);
        self.notify(host);
    }

    fn remove_entry(&mut self, marker: MarkerId, host: &mut impl Host) -> bool {
        let Some(mut entry) = self.entries.remove(&marker) else {
            return false;
        };
        if let Some(ticket) = entry.ticket.take() {
            self.in_flight.remove(&ticket);
        }
        if let Some(node) = entry.overlay.take_node() {
            detach(node, marker, host);
        }
        self.counters.tracking -= 1;
        true
    }

    fn notify(&mut self, host: &mut impl Host) {
        if self.options.notify == NotifyPolicy::OnChange
            && self.last_published == Some(self.counters)
        {
            return;
        }
        host.publish(self.counters);
        self.last_published = Some(self.counters);
    }
}

fn detach(node: NodeHandle, marker: MarkerId, host: &mut impl Host) {
    if let Err(e) = host.detach(node) {
        tracing::warn!("failed to detach overlay node {} for marker {marker}: {e}", node.0);
    }
}
