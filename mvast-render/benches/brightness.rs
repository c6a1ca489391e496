use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use mvast_core::FrameBuffer;
use mvast_render::{adjust_brightness, StimulusAssets};

fn noise_frame(width: u32, height: u32) -> FrameBuffer {
    let mut rng = StdRng::seed_from_u64(7);
    let data = (0..width * height * 4).map(|_| rng.random::<u8>()).collect();
    FrameBuffer::from_rgba(width, height, data).expect("frame")
}

/// Cost of deriving one brightness variant at common display sizes.
pub fn bench_adjust(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjust_brightness");
    group
        .sample_size(20)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(1));

    for (w, h) in [(1280u32, 720u32), (1920, 1080)] {
        let frame = noise_frame(w, h);
        group.bench_with_input(BenchmarkId::new("factor_0.4", format!("{w}x{h}")), &frame, |b, f| {
            b.iter(|| black_box(adjust_brightness(f, black_box(0.4))));
        });
    }
    group.finish();
}

/// A cached pair lookup is what every trial after the first flip pays.
pub fn bench_cached_pair(c: &mut Criterion) {
    let mut assets = StimulusAssets::from_frames(
        "a.png",
        noise_frame(1920, 1080),
        "b.png",
        noise_frame(1920, 1080),
    )
    .expect("assets");
    assets.pair(0.6);
    c.bench_function("cached_pair_1080p", |b| {
        b.iter(|| black_box(assets.pair(black_box(0.6))));
    });
}

criterion_group!(benches, bench_adjust, bench_cached_pair);
criterion_main!(benches);
