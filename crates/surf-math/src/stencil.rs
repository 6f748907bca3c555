// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Stencil Coefficients
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! The 12-node finite-difference stencil of the splines-in-tension
//! gridding equations: compass positions, padded-index offsets, the
//! quadrant tables for off-node constraints, and the two coefficient
//! sets (constrained and unconstrained nodes).

/// Compass positions of the 12 stencil neighbors, used to index the
/// offset and coefficient arrays.
pub mod position {
    pub const N2: usize = 0;
    pub const NW: usize = 1;
    pub const N1: usize = 2;
    pub const NE: usize = 3;
    pub const W2: usize = 4;
    pub const W1: usize = 5;
    pub const E1: usize = 6;
    pub const E2: usize = 7;
    pub const SW: usize = 8;
    pub const S1: usize = 9;
    pub const SE: usize = 10;
    pub const S2: usize = 11;
}

use position::*;

/// For each quadrant 1-4, the four stencil nodes entering the Briggs
/// correction (points A-D of the constrained-node expansion). Row 0 is
/// unused so the node status byte indexes the table directly.
pub const QUADRANT_NODES: [[usize; 4]; 5] = [
    [0, 0, 0, 0],
    [NW, W1, S1, SE],
    [SW, S1, E1, NE],
    [SE, E1, N1, NW],
    [NE, N1, W1, SW],
];

/// Linear-index shifts of the 12 neighbors in a padded buffer whose rows
/// are `mx` cells wide. Must be recomputed whenever the active row width
/// changes.
pub fn node_offsets(mx: usize) -> [isize; 12] {
    let mx = mx as isize;
    let mut offset = [0isize; 12];
    offset[N2] = -2 * mx;
    offset[NW] = -mx - 1;
    offset[N1] = -mx;
    offset[NE] = -mx + 1;
    offset[W2] = -2;
    offset[W1] = -1;
    offset[E1] = 1;
    offset[E2] = 2;
    offset[SW] = mx - 1;
    offset[S1] = mx;
    offset[SE] = mx + 1;
    offset[S2] = 2 * mx;
    offset
}

/// Finite-difference coefficients for one (tension, aspect) setting.
///
/// `unconstrained` is normalized by a0 and applied as-is; `constrained`
/// holds the partial sums of the off-node-constraint equation, whose
/// normalization happens only after the Briggs terms are added in.
/// The `eps_*` constants feed the second-ring boundary conditions.
#[derive(Debug, Clone)]
pub struct StencilCoefficients {
    pub constrained: [f64; 12],
    pub unconstrained: [f64; 12],
    pub a0_const_1: f64,
    pub a0_const_2: f64,
    /// alpha^2, the x-normal second-ring weight.
    pub eps_p2: f64,
    /// 1 / alpha^2, the y-normal second-ring weight.
    pub eps_m2: f64,
    pub two_plus_ep2: f64,
    pub two_plus_em2: f64,
}

impl StencilCoefficients {
    pub fn new(interior_tension: f64, alpha: f64) -> Self {
        let loose = 1.0 - interior_tension;
        let alpha2 = alpha * alpha;
        let alpha4 = alpha2 * alpha2;
        let one_plus_e2 = 1.0 + alpha2;

        let a0 = 1.0
            / (6.0 * alpha4 * loose + 10.0 * alpha2 * loose + 8.0 * loose
                - 2.0 * one_plus_e2
                + 4.0 * interior_tension * one_plus_e2);

        let mut con = [0.0f64; 12];
        let mut unc = [0.0f64; 12];

        con[W2] = -loose;
        con[E2] = -loose;
        con[N2] = -loose * alpha4;
        con[S2] = -loose * alpha4;
        unc[W2] = -loose * a0;
        unc[E2] = -loose * a0;
        unc[N2] = -loose * alpha4 * a0;
        unc[S2] = -loose * alpha4 * a0;

        con[W1] = 2.0 * loose * one_plus_e2;
        con[E1] = con[W1];
        unc[W1] = (2.0 * con[W1] + interior_tension) * a0;
        unc[E1] = unc[W1];
        con[N1] = con[W1] * alpha2;
        con[S1] = con[N1];
        unc[N1] = unc[W1] * alpha2;
        unc[S1] = unc[N1];

        con[NW] = -2.0 * loose * alpha2;
        con[NE] = con[NW];
        con[SW] = con[NW];
        con[SE] = con[NW];
        unc[NW] = con[NW] * a0;
        unc[NE] = unc[NW];
        unc[SW] = unc[NW];
        unc[SE] = unc[NW];

        StencilCoefficients {
            constrained: con,
            unconstrained: unc,
            a0_const_1: 2.0 * loose * (1.0 + alpha4),
            a0_const_2: 2.0 - interior_tension + 2.0 * loose * alpha2,
            eps_p2: alpha2,
            eps_m2: 1.0 / alpha2,
            two_plus_ep2: 2.0 + 2.0 * alpha2,
            two_plus_em2: 2.0 + 2.0 / alpha2,
        }
    }
}
