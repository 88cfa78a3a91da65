use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glyph_sheet_core::prelude::*;
use image::{Rgba, RgbaImage};
use rand::{Rng, SeedableRng};

/// White sheet with `rows * cols` random ink blocks, some with a detached dot.
fn generate_sheet(rows: u32, cols: u32, seed: u64) -> PixelGrid {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let cell = 40;
    let mut img = RgbaImage::from_pixel(cols * cell, rows * cell, Rgba([255, 255, 255, 255]));
    for r in 0..rows {
        for c in 0..cols {
            let w = rng.gen_range(6..=24);
            let h = rng.gen_range(10..=28);
            let x0 = c * cell + rng.gen_range(2..=(cell - w - 2));
            let y0 = r * cell + 8;
            for y in y0..(y0 + h).min(r * cell + cell - 1) {
                for x in x0..x0 + w {
                    img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
                }
            }
            if rng.gen_bool(0.3) {
                for y in r * cell + 2..r * cell + 5 {
                    for x in x0..x0 + 3 {
                        img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
                    }
                }
            }
        }
    }
    PixelGrid::new(img)
}

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_glyphs");
    let cfg = DetectConfig::default();

    for (rows, cols) in [(4u32, 10u32), (8, 16), (12, 24)] {
        let grid = generate_sheet(rows, cols, 7);
        group.throughput(Throughput::Elements((rows * cols) as u64));
        group.bench_with_input(
            BenchmarkId::new("merge", rows * cols),
            &grid,
            |b, grid| b.iter(|| black_box(detect_glyphs(grid, &cfg))),
        );
        let no_merge = DetectConfig::builder().merge(false).build();
        group.bench_with_input(
            BenchmarkId::new("no_merge", rows * cols),
            &grid,
            |b, grid| b.iter(|| black_box(detect_glyphs(grid, &no_merge))),
        );
    }
    group.finish();
}

fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_glyphs");
    let cfg = PackConfig::default();

    for (rows, cols) in [(4u32, 10u32), (12, 24)] {
        let grid = generate_sheet(rows, cols, 11);
        let glyphs = match detect_glyphs(&grid, &DetectConfig::default()) {
            Ok(g) => g,
            Err(_) => continue,
        };
        group.throughput(Throughput::Elements(glyphs.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("pixels", glyphs.len()),
            &glyphs,
            |b, glyphs| b.iter(|| black_box(pack_glyphs(&grid, glyphs, &cfg))),
        );
        group.bench_with_input(
            BenchmarkId::new("layout", glyphs.len()),
            &glyphs,
            |b, glyphs| b.iter(|| black_box(pack_layout(glyphs, &cfg))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_detect, bench_pack);
criterion_main!(benches);
