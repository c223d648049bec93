//! Wedge deduplication benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use marrow_format::records::Wedge;
use marrow_pipeline::dedup_wedges;

/// Fan-triangulated grid: every interior corner appears several times
fn grid_wedges(side: usize) -> Vec<Wedge> {
    let mut wedges = Vec::new();
    for row in 0..side {
        for col in 0..side {
            for (du, dv) in [(0, 0), (1, 0), (0, 1), (1, 0), (1, 1), (0, 1)] {
                let x = col + du;
                let y = row + dv;
                wedges.push(Wedge {
                    point_index: (y * (side + 1) + x) as u16,
                    u: x as f32 / side as f32,
                    v: y as f32 / side as f32,
                    material_index: 0,
                });
            }
        }
    }
    wedges
}

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("wedge_dedup");
    for side in [16usize, 48, 96] {
        let wedges = grid_wedges(side);
        group.bench_with_input(
            BenchmarkId::from_parameter(wedges.len()),
            &wedges,
            |b, wedges| b.iter(|| dedup_wedges(black_box(wedges))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_dedup);
criterion_main!(benches);
