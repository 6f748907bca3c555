// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Solve Benchmark
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use surf_core::SurfaceEngine;
use surf_types::config::{Convergence, Region, RegionPolicy, SurfaceConfig};

/// Deterministic scattered test field: a couple of smooth bumps sampled
/// at pseudo-random locations (simple LCG, no external RNG).
fn sample_points(n: usize) -> Vec<[f64; 3]> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let mut next = || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..n)
        .map(|_| {
            let x = 64.0 * next();
            let y = 64.0 * next();
            let z = (x / 9.0).sin() * (y / 7.0).cos() * 10.0 + 0.05 * x - 0.02 * y;
            [x, y, z]
        })
        .collect()
}

fn bench_solve(c: &mut Criterion) {
    let points = sample_points(500);
    let mut cfg = SurfaceConfig::new(Region::new(0.0, 64.0, 0.0, 64.0), 1.0, 1.0);
    cfg.region_policy = RegionPolicy::Exact;
    cfg.solver.convergence = Convergence::Value(1e-3);

    c.bench_function("solve_64x64_500pts", |b| {
        b.iter_batched(
            || {
                let mut engine = SurfaceEngine::new(cfg.clone()).unwrap();
                engine.add_points(points.iter().copied());
                engine
            },
            |engine| engine.solve().unwrap(),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_solve);
criterion_main!(benches);
