// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Briggs Coefficients
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Taylor-series coefficients expressing an off-node data constraint as a
//! correction over the four in-grid neighbors of the node's quadrant,
//! after I. C. Briggs (1974).

/// Coefficients for one off-node constraint at normalized quadrant-1
/// offset (xx, yy), both >= 0, with constraint value z.
///
/// b[0..4] weight the four neighbor nodes; b[4] is the data term already
/// multiplied by the constraint value; b[5] is the inverted normalization
/// (ready to multiply), built from the constrained-node constants of the
/// stencil.
pub fn briggs_coefficients(
    xx: f64,
    yy: f64,
    z: f32,
    a0_const_1: f64,
    a0_const_2: f64,
) -> [f32; 6] {
    let xx_plus_yy = xx + yy;
    let xx_plus_yy_plus_one = 1.0 + xx_plus_yy;
    let inv_xx_plus_yy_plus_one = 1.0 / xx_plus_yy_plus_one;
    let xx2 = xx * xx;
    let yy2 = yy * yy;
    let inv_delta = inv_xx_plus_yy_plus_one / xx_plus_yy;

    let mut b = [0.0f32; 6];
    b[0] = ((xx2 + 2.0 * xx * yy + xx - yy2 - yy) * inv_delta) as f32;
    b[1] = (2.0 * (yy - xx + 1.0) * inv_xx_plus_yy_plus_one) as f32;
    b[2] = (2.0 * (xx - yy + 1.0) * inv_xx_plus_yy_plus_one) as f32;
    b[3] = ((-xx2 + 2.0 * xx * yy - xx + yy2 + yy) * inv_delta) as f32;
    let b_4 = 4.0 * inv_delta;
    // Normalization needs the plain sum of the five weights; the data
    // term is folded into b[4] only afterwards.
    b[5] = b[0] + b[1] + b[2] + b[3] + b_4 as f32;
    b[4] = (b_4 * z as f64) as f32;
    b[5] = (1.0 / (a0_const_1 + a0_const_2 * b[5] as f64)) as f32;
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    // Constants for tension 0, aspect 1.
    const C1: f64 = 4.0;
    const C2: f64 = 4.0;

    #[test]
    fn test_symmetric_offset() {
        // On the diagonal xx == yy the two cross weights b[1], b[2] match
        // and b[0] = -b[3] + 2*(xx + yy)*inv_delta symmetry reduces to
        // b[0] == -b[3] shifted; check the closed forms directly.
        let b = briggs_coefficients(0.25, 0.25, 1.0, C1, C2);
        assert!((b[1] - b[2]).abs() < 1e-7);
        // delta = 0.5 * 1.5 = 0.75; b0 = (0.0625*4 - ... ) hand-computed:
        // b0 = (0.0625 + 0.125 + 0.25 - 0.0625 - 0.25)/0.75 = 0.125/0.75
        assert!((b[0] as f64 - 0.125 / 0.75).abs() < 1e-6);
        assert!((b[1] as f64 - 2.0 / 1.5).abs() < 1e-6);
        // raw b4 = 4/0.75; premultiplied by z = 1
        assert!((b[4] as f64 - 4.0 / 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_b4_scales_with_z() {
        let b1 = briggs_coefficients(0.3, 0.4, 1.0, C1, C2);
        let b2 = briggs_coefficients(0.3, 0.4, -2.5, C1, C2);
        assert!((b2[4] + 2.5 * b1[4]).abs() < 1e-4);
        // Node weights and normalization are independent of z.
        for k in [0, 1, 2, 3, 5] {
            assert_eq!(b1[k], b2[k], "b[{k}] should not depend on z");
        }
    }

    #[test]
    fn test_normalization_is_inverted() {
        let (xx, yy) = (0.4, 0.15);
        let b = briggs_coefficients(xx, yy, 1.0, C1, C2);
        let delta = (xx + yy) * (1.0 + xx + yy);
        let raw_sum = b[0] as f64 + b[1] as f64 + b[2] as f64 + b[3] as f64 + 4.0 / delta;
        let expected = 1.0 / (C1 + C2 * raw_sum);
        assert!((b[5] as f64 - expected).abs() < 1e-7);
    }

    #[test]
    fn test_constraint_on_axis() {
        // A constraint due east (yy = 0): the update must lean on the
        // b[2] direction weight harder than on b[1].
        let b = briggs_coefficients(0.5, 0.0, 1.0, C1, C2);
        assert!(b[2] > b[1]);
        for v in b {
            assert!(v.is_finite());
        }
    }
}
