// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Property-Based Tests for surf-math
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
use proptest::prelude::*;
use surf_math::briggs::briggs_coefficients;
use surf_math::factor::{gcd_euclid, prime_factors};
use surf_math::plane::PlaneFit;
use surf_math::stencil::StencilCoefficients;
use surf_math::suggest::estimate_work;

fn is_prime(n: usize) -> bool {
    n >= 2 && (2..).take_while(|p| p * p <= n).all(|p| n % p != 0)
}

proptest! {
    /// The gcd divides both arguments and scales linearly.
    #[test]
    fn gcd_divides_and_scales(a in 1usize..500, b in 1usize..500, k in 1usize..20) {
        let g = gcd_euclid(a, b);
        prop_assert_eq!(a % g, 0);
        prop_assert_eq!(b % g, 0);
        prop_assert_eq!(gcd_euclid(k * a, k * b), k * g);
    }

    /// Factors are prime, ascending, and multiply back to n.
    #[test]
    fn prime_factors_sound(n in 2usize..5000) {
        let factors = prime_factors(n);
        prop_assert_eq!(factors.iter().product::<usize>(), n);
        prop_assert!(factors.iter().all(|&f| is_prime(f)));
        prop_assert!(factors.windows(2).all(|w| w[0] <= w[1]));
    }

    /// A plane sampled on a lattice is recovered exactly.
    #[test]
    fn plane_fit_recovers_plane(
        icept in -50.0f64..50.0,
        sx in -5.0f64..5.0,
        sy in -5.0f64..5.0,
        n_cols in 3usize..12,
        n_rows in 3usize..12,
    ) {
        let pts = (0..n_rows).flat_map(|r| (0..n_cols).map(move |c| {
            (c as f64, r as f64, icept + sx * c as f64 + sy * r as f64)
        }));
        let plane = PlaneFit::fit(pts);
        prop_assert!((plane.intercept - icept).abs() < 1e-6);
        prop_assert!((plane.slope_x - sx).abs() < 1e-7);
        prop_assert!((plane.slope_y - sy).abs() < 1e-7);
    }

    /// The unconstrained stencil preserves constant fields for any
    /// tension and aspect.
    #[test]
    fn stencil_partition_of_unity(t in 0.0f64..1.0, alpha in 0.3f64..3.0) {
        let c = StencilCoefficients::new(t, alpha);
        let sum: f64 = c.unconstrained.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-10, "sum = {}", sum);
    }

    /// Briggs weight identities: b0 + b3 = 4 xx yy / delta and
    /// b1 + b2 = 4 / (1 + xx + yy).
    #[test]
    fn briggs_weight_identities(
        xx in 0.01f64..0.95,
        yy in 0.01f64..0.95,
        z in -10.0f32..10.0,
    ) {
        let b = briggs_coefficients(xx, yy, z, 4.0, 4.0);
        let delta = (xx + yy) * (1.0 + xx + yy);
        prop_assert!((b[0] as f64 + b[3] as f64 - 4.0 * xx * yy / delta).abs() < 1e-5);
        prop_assert!((b[1] as f64 + b[2] as f64 - 4.0 / (1.0 + xx + yy)).abs() < 1e-5);
        prop_assert!(b[5].is_finite() && b[5] > 0.0);
    }

    /// Work estimates are positive and grow with grid size for a fixed
    /// schedule shape (pure powers of two).
    #[test]
    fn estimate_work_monotone_in_size(k in 4u32..9) {
        let small = estimate_work(1 << k, 1 << k);
        let large = estimate_work(1 << (k + 1), 1 << (k + 1));
        prop_assert!(small > 0.0);
        prop_assert!(large > small);
    }
}
