use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pprof::criterion::{Output, PProfProfiler};
use std::time::Duration;

use cogex_core::{ImageRef, RenderMode};
use cogex_render::{ImageStore, Mount, blit_over, renderer_for};
use tiny_skia::{Color, Pixmap};

fn solid(w: u32, h: u32, color: Color) -> Pixmap {
    let mut pm = Pixmap::new(w, h).unwrap();
    pm.fill(color);
    pm
}

/// Frame draws for both render modes at common stimulus sizes.
pub fn bench_draw_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_frame");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(2));

    for size in [128u32, 512, 1024] {
        let mut store = ImageStore::new();
        let img = ImageRef::new(format!("bench/{size}.png"));
        store.insert(&img, solid(size, size, Color::WHITE));

        for mode in [RenderMode::Canvas, RenderMode::Markup] {
            let id = BenchmarkId::new(format!("{mode:?}"), size);
            group.bench_with_input(id, &img, |b, img| {
                let mut renderer = renderer_for(mode);
                let mut mount = Mount::new(1280, 720);
                b.iter(|| renderer.draw_frame(&mut mount, &store, black_box(img)));
            });
        }
    }
    group.finish();
}

/// Opaque copy versus translucent blend onto a 720p buffer.
pub fn bench_blit(c: &mut Criterion) {
    let mut group = c.benchmark_group("blit_over");
    let opaque = solid(400, 400, Color::WHITE);
    let translucent = solid(400, 400, Color::from_rgba8(255, 0, 0, 128));

    group.bench_function("opaque", |b| {
        let mut dst = solid(1280, 720, Color::BLACK);
        b.iter(|| blit_over(&mut dst, black_box(&opaque), 440, 160));
    });
    group.bench_function("translucent", |b| {
        let mut dst = solid(1280, 720, Color::BLACK);
        b.iter(|| blit_over(&mut dst, black_box(&translucent), 440, 160));
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
        .confidence_level(0.95)
        .noise_threshold(0.02)
        .significance_level(0.05);
    targets = bench_draw_frame, bench_blit
}

criterion_main!(benches);
