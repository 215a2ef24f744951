// benches/benchmarks.rs -- Per-stage and full-stream benchmarks.
//
//   cargo bench
//
// All inputs are synthetic depth scenes at the sensor resolutions.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use depthbridge::colorize::{colorize_depth_frame, DepthPalette};
use depthbridge::convert::depth_to_intensity;
use depthbridge::features::GoodFeaturesDetector;
use depthbridge::frame::{copy_color_frame, copy_depth_frame, SensorFrame};
use depthbridge::image::{Image, Rgba};
use depthbridge::klt::KltTracker;
use depthbridge::pyramid::Pyramid;
use depthbridge::resolution::Resolution;
use depthbridge::tracking::{DepthTracker, DepthTrackerState};

// ============================================================
// Helpers
// ============================================================

/// Depth ramp with a few near boxes, shifted by (dx, dy).
fn make_depth_scene(w: usize, h: usize, dx: usize, dy: usize) -> Image<u16> {
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            img.set(x, y, (2500 + (x * 1000 / w) + (y * 300 / h)) as u16);
        }
    }
    for rect in 0..6 {
        let rx = (w / 10 + rect * w / 7 + dx) % w;
        let ry = (h / 10 + (rect % 3) * h / 4 + dy) % h;
        let mm = 900 + rect as u16 * 150;
        for y in ry..(ry + h / 8).min(h) {
            for x in rx..(rx + w / 8).min(w) {
                img.set(x, y, mm);
            }
        }
    }
    img
}

// ============================================================
// Per-stage benchmarks
// ============================================================

fn bench_frame_copy(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_copy");
    for res in [Resolution::R320x240, Resolution::R640x480, Resolution::R1280x960] {
        let (w, h) = res.size();
        let color = vec![0x5Au8; w * h * 4];
        let depth = vec![0x0Fu8; w * h * 2];
        let mut color_dst: Image<Rgba> = Image::new(w, h);
        let mut depth_dst: Image<u16> = Image::new(w, h);

        group.bench_with_input(BenchmarkId::new("color", format!("{w}x{h}")), &res, |b, &res| {
            let frame = SensorFrame::new(&color, w * 4, res);
            b.iter(|| copy_color_frame(&frame, &mut color_dst))
        });
        group.bench_with_input(BenchmarkId::new("depth", format!("{w}x{h}")), &res, |b, &res| {
            let frame = SensorFrame::new(&depth, w * 2, res);
            b.iter(|| copy_depth_frame(&frame, &mut depth_dst))
        });
    }
    group.finish();
}

fn bench_colorize(c: &mut Criterion) {
    let palette = DepthPalette::default();
    let depth = make_depth_scene(640, 480, 0, 0);
    c.bench_function("colorize_640x480", |b| {
        b.iter(|| colorize_depth_frame(&depth, &palette))
    });
    c.bench_function("intensity_640x480", |b| {
        b.iter(|| depth_to_intensity(&depth, &palette))
    });
}

fn bench_features(c: &mut Criterion) {
    let palette = DepthPalette::default();
    let gray = depth_to_intensity(&make_depth_scene(320, 240, 0, 0), &palette);
    let det = GoodFeaturesDetector::new(20, 0.01, 10.0);
    c.bench_function("good_features_320x240", |b| b.iter(|| det.detect(&gray)));
}

fn bench_klt(c: &mut Criterion) {
    let palette = DepthPalette::default();
    let g1 = depth_to_intensity(&make_depth_scene(320, 240, 0, 0), &palette);
    let g2 = depth_to_intensity(&make_depth_scene(320, 240, 2, 1), &palette);
    let p1 = Pyramid::build(&g1, 3, 1.0);
    let p2 = Pyramid::build(&g2, 3, 1.0);
    let features = GoodFeaturesDetector::new(20, 0.01, 10.0)
        .detect(&g1)
        .unwrap_or_default();
    let tracker = KltTracker::new(7, 30, 0.01, 3);
    c.bench_function("klt_320x240_20_features", |b| {
        b.iter(|| tracker.track(&p1, &p2, &features))
    });
}

// ============================================================
// Full stream
// ============================================================

fn bench_temporal_tracking(c: &mut Criterion) {
    let frames: Vec<_> = (0..8).map(|i| make_depth_scene(320, 240, i, i / 2)).collect();
    let tracker = DepthTracker::default();
    c.bench_function("temporal_tracking_320x240_8_frames", |b| {
        b.iter(|| {
            let mut state = DepthTrackerState::new();
            for depth in &frames {
                let _ = tracker.colorize_with_temporal_tracking(depth, &mut state);
            }
        })
    });
}

criterion_group!(
    benches,
    bench_frame_copy,
    bench_colorize,
    bench_features,
    bench_klt,
    bench_temporal_tracking
);
criterion_main!(benches);
