use amr_core::{LoadMode, Marker, MarkerRegistry, MemoryHost, OverlayCatalog, Pose, TrackingState};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

const LABELS: [&str; 6] = ["abs_3", "abs_5", "abs_6", "abs_7", "abs_8", "abs_1"];

/// One frame touching `n` markers, cycling through every state.
fn frame(n: u64, cycle: u64) -> Vec<Marker> {
    (0..n)
        .map(|id| {
            let state = match (id + cycle) % 3 {
                0 => TrackingState::Paused,
                1 => TrackingState::Tracking,
                _ => TrackingState::Stopped,
            };
            let label = LABELS[(id as usize) % LABELS.len()];
            Marker::new(amr_core::MarkerId(id), label, state).with_pose(Pose::identity())
        })
        .collect()
}

fn bench_process_frame(c: &mut Criterion) {
    let frames: Vec<Vec<Marker>> = (0..3).map(|cycle| frame(64, cycle)).collect();

    c.bench_function("process_frame_64_markers_x3", |b| {
        b.iter_batched(
            || {
                (
                    MarkerRegistry::new(OverlayCatalog::builtin()),
                    MemoryHost::with_mode(LoadMode::Immediate),
                )
            },
            |(mut reg, mut host)| {
                for f in &frames {
                    reg.process_frame(black_box(f), &mut host);
                }
                reg.counters()
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_process_frame);
criterion_main!(benches);
