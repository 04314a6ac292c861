//! Property tests: registry invariants hold for arbitrary interleavings of
//! tracker updates, asset completions and evictions.

use std::collections::HashSet;

use amr_core::{
    LoadError, LoadMode, Marker, MarkerId, MarkerRegistry, MemoryHost, OverlayCatalog, Pose,
    TrackingState,
};
use proptest::prelude::*;

const LABELS: [&str; 4] = ["abs_3", "abs_6", "abs_7", "abs_9"];

#[derive(Clone, Debug)]
enum Step {
    Update { id: u64, label: usize, state: TrackingState },
    Complete { fail: bool },
    Evict { id: u64 },
}

fn state() -> impl Strategy<Value = TrackingState> {
    prop_oneof![
        Just(TrackingState::Paused),
        Just(TrackingState::Tracking),
        Just(TrackingState::Stopped),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => (0u64..6, 0usize..LABELS.len(), state())
            .prop_map(|(id, label, state)| Step::Update { id, label, state }),
        2 => any::<bool>().prop_map(|fail| Step::Complete { fail }),
        1 => (0u64..6).prop_map(|id| Step::Evict { id }),
    ]
}

fn check(reg: &MarkerRegistry, host: &MemoryHost) {
    let counters = reg.counters();
    assert_eq!(counters.tracking, reg.len());

    let ids: HashSet<MarkerId> = reg.entries().map(|e| e.marker).collect();
    assert_eq!(ids.len(), reg.len());

    let attached = reg.entries().filter(|e| e.overlay.is_attached()).count();
    assert_eq!(host.scene.nodes.len(), attached);

    for entry in reg.entries() {
        assert!(!reg.has_failed(entry.marker));
    }
}

proptest! {
    #[test]
    fn counters_match_live_entries(
        steps in prop::collection::vec(step(), 1..80),
        deferred in any::<bool>(),
    ) {
        let mode = if deferred { LoadMode::Deferred } else { LoadMode::Immediate };
        let mut reg = MarkerRegistry::new(OverlayCatalog::builtin());
        let mut host = MemoryHost::with_mode(mode);
        let mut paused = 0u64;

        for step in steps {
            match step {
                Step::Update { id, label, state } => {
                    let mut marker = Marker::new(MarkerId(id), LABELS[label], state);
                    if state == TrackingState::Tracking {
                        marker = marker.with_pose(Pose::identity());
                    }
                    if state == TrackingState::Paused {
                        paused += 1;
                    }
                    let published = host.published.len();
                    reg.process_frame(&[marker], &mut host);
                    prop_assert_eq!(host.published.len(), published + 1);
                }
                Step::Complete { fail } => {
                    let pending = host.loader.take_pending();
                    for (ticket, asset) in pending {
                        let result = if fail {
                            Err(LoadError::Decode(asset.to_string()))
                        } else {
                            Ok(host.loader.mint())
                        };
                        reg.complete_load(ticket, result, &mut host);
                    }
                }
                Step::Evict { id } => {
                    reg.evict(MarkerId(id), &mut host);
                }
            }
            check(&reg, &host);
            prop_assert_eq!(reg.counters().detected, paused);
        }

        reg.clear(&mut host);
        prop_assert!(host.scene.nodes.is_empty());
        prop_assert_eq!(reg.counters().tracking, 0);
    }

    #[test]
    fn tracking_again_never_creates_second_overlay(repeats in 1usize..10) {
        let mut reg = MarkerRegistry::new(OverlayCatalog::builtin());
        let mut host = MemoryHost::new();
        for _ in 0..repeats {
            reg.process_frame(&[Marker::tracking(1, "abs_6", Pose::identity())], &mut host);
        }
        prop_assert_eq!(reg.len(), 1);
        prop_assert_eq!(host.loader.requests.len(), 1);
        prop_assert_eq!(host.scene.attach_calls, 1);
    }
}
