// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the bildwerk-pipeline crate. Benchmarks the
// adaptive size-target search on a synthetic gradient image, the realistic
// hot path for requests that set a byte budget.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgba, RgbaImage};

use bildwerk_core::SearchTuning;
use bildwerk_pipeline::encode::{Jpeg, encode_to_target};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Benchmark the JPEG size-target search on a 512x384 gradient.
///
/// The gradient compresses well, so the search typically converges within a
/// few quality-stepping attempts without touching the scale factor -- the
/// common case for photographic inputs with a reachable target.
fn bench_jpeg_size_search(c: &mut Criterion) {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(512, 384, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    }));

    c.bench_function("jpeg_size_search (512x384, 20 KiB target)", |b| {
        b.iter(|| {
            let result = encode_to_target(
                black_box(&image),
                &Jpeg,
                None,
                Some(20_000),
                &SearchTuning::default(),
            );
            black_box(result.unwrap());
        });
    });
}

criterion_group!(benches, bench_jpeg_size_search);
criterion_main!(benches);
