// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Property-Based Tests for surf-core
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
use proptest::prelude::*;
use surf_core::data::{
    compare_points, recompute_indices, DataPoint, PointKind, StrideGeometry, OUTSIDE,
};
use surf_core::SurfaceEngine;
use surf_types::config::{Convergence, LimitSpec, Region, RegionPolicy, SurfaceConfig};

fn geometry(nx: usize, ny: usize, inc: f64) -> StrideGeometry {
    StrideGeometry {
        nx,
        ny,
        x_inc: inc,
        y_inc: inc,
        r_x_inc: 1.0 / inc,
        r_y_inc: 1.0 / inc,
        region: Region::new(0.0, (nx - 1) as f64 * inc, 0.0, (ny - 1) as f64 * inc),
    }
}

fn small_config() -> SurfaceConfig {
    let mut cfg = SurfaceConfig::new(Region::new(0.0, 6.0, 0.0, 6.0), 1.0, 1.0);
    cfg.region_policy = RegionPolicy::Exact;
    cfg.solver.convergence = Convergence::Value(1e-3);
    cfg.solver.max_iterations = 200;
    cfg
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// After re-indexing and sorting, bin indices are non-decreasing,
    /// breaklines precede data within a bin, and intra-bin node distance
    /// is non-decreasing.
    #[test]
    fn sorted_points_satisfy_bin_order(
        coords in proptest::collection::vec((0.0f32..10.0, 0.0f32..10.0, any::<bool>()), 1..120),
    ) {
        let g = geometry(11, 11, 1.0);
        let mut data: Vec<DataPoint> = coords
            .iter()
            .map(|&(x, y, breakline)| DataPoint {
                x,
                y,
                z: 0.0,
                kind: if breakline { PointKind::Breakline } else { PointKind::Data },
                index: 0,
            })
            .collect();
        recompute_indices(&mut data, &g);

        for pair in data.windows(2) {
            prop_assert_ne!(pair[0].index, OUTSIDE);
            prop_assert!(pair[0].index <= pair[1].index);
            if pair[0].index == pair[1].index {
                // Comparator order within a bin: breakline first, then
                // nearer to the node.
                prop_assert_ne!(
                    (pair[0].kind, pair[1].kind),
                    (PointKind::Data, PointKind::Breakline)
                );
                prop_assert!(compare_points(&pair[0], &pair[1], &g) != std::cmp::Ordering::Greater);
            }
        }
    }

    /// Whatever the data, the solved grid is finite and has the declared
    /// dimensions.
    #[test]
    fn solve_produces_finite_grid(
        points in proptest::collection::vec((0.0f64..6.0, 0.0f64..6.0, -5.0f64..5.0), 3..25),
    ) {
        let mut engine = SurfaceEngine::new(small_config()).unwrap();
        for &(x, y, z) in &points {
            engine.add_point(x, y, z);
        }
        let (grid, report) = engine.solve().unwrap();
        prop_assert_eq!(grid.values.dim(), (7, 7));
        for &v in grid.values.iter() {
            prop_assert!(v.is_finite());
        }
        prop_assert!(report.plane_only || !report.sweeps.is_empty());
    }

    /// Constant envelopes are honored at every node of the output.
    #[test]
    fn envelopes_clamp_every_node(
        points in proptest::collection::vec((0.0f64..6.0, 0.0f64..6.0, -5.0f64..5.0), 3..20),
        lo in -2.0f64..-0.5,
        hi in 0.5f64..2.0,
    ) {
        let mut cfg = small_config();
        cfg.limits.low = Some(LimitSpec::Constant(lo));
        cfg.limits.high = Some(LimitSpec::Constant(hi));
        let mut engine = SurfaceEngine::new(cfg).unwrap();
        for &(x, y, z) in &points {
            engine.add_point(x, y, z);
        }
        let (grid, _) = engine.solve().unwrap();
        for &v in grid.values.iter() {
            prop_assert!(v >= lo as f32 - 1e-6, "node {} below lower envelope {}", v, lo);
            prop_assert!(v <= hi as f32 + 1e-6, "node {} above upper envelope {}", v, hi);
        }
    }

    /// A datum sitting exactly on a node pins it: the output reproduces
    /// the datum there.
    #[test]
    fn node_datum_is_reproduced(
        col in 1usize..6,
        row in 1usize..6,
        z in -20.0f64..20.0,
    ) {
        let mut engine = SurfaceEngine::new(small_config()).unwrap();
        engine.add_point(col as f64, row as f64, z);
        // A second datum so the plane fit stays out of the way
        engine.add_point(0.0, 0.0, 0.0);
        let (grid, _) = engine.solve().unwrap();
        let out = grid.values[[6 - row, col]] as f64;
        prop_assert!(
            (out - z).abs() < 1e-3 * z.abs().max(1.0),
            "pinned node moved: expected {}, got {}",
            z,
            out
        );
    }

    /// The mean of the residual between solve and re-solve of identical
    /// input is zero: solving is deterministic.
    #[test]
    fn solve_is_deterministic(
        points in proptest::collection::vec((0.0f64..6.0, 0.0f64..6.0, -5.0f64..5.0), 3..15),
    ) {
        let run = |pts: &[(f64, f64, f64)]| {
            let mut engine = SurfaceEngine::new(small_config()).unwrap();
            for &(x, y, z) in pts {
                engine.add_point(x, y, z);
            }
            engine.solve().unwrap().0
        };
        let a = run(&points);
        let b = run(&points);
        for (&va, &vb) in a.values.iter().zip(b.values.iter()) {
            prop_assert_eq!(va, vb);
        }
    }
}
