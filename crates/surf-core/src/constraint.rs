// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Nearest-Constraint Classification
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Per-bin classification of the nearest data constraint: a point within
//! 5% of the cell size pins its node outright; anything farther becomes a
//! quadrant status byte plus a Briggs coefficient entry consumed in bin
//! order during relaxation.

use surf_math::briggs::briggs_coefficients;

use crate::data::{node_index, OUTSIDE};
use crate::engine::SurfaceEngine;
use crate::limits::{HI, LO};

/// Node carries no data constraint; use the unconstrained coefficients.
pub(crate) const UNCONSTRAINED: u8 = 0;
// Status bytes 1-4 are the quadrant of the nearest off-node constraint.
/// Node was pinned to a value; never updated during relaxation.
pub(crate) const CONSTRAINED: u8 = 5;

/// A datum within this fraction of the cell size pins its node.
pub(crate) const CLOSENESS_FACTOR: f64 = 0.05;

impl SurfaceEngine {
    /// Walk the sorted data and classify the first (nearest) point of
    /// every occupied bin. Rebuilds the Briggs table in bin order.
    pub(crate) fn find_nearest_constraints(&mut self) {
        log::debug!(
            "Determine nearest point and set Briggs coefficients [stride = {}]",
            self.current_stride
        );

        let mx = self.current_mx;
        for row in 0..self.current_ny {
            let node = node_index(row, 0, mx);
            for col in 0..self.current_nx {
                self.status[node + col] = UNCONSTRAINED;
            }
        }
        self.briggs.clear();

        let g = self.geometry;
        let stride = self.current_stride;
        let a0_const_1 = self.coefficients.a0_const_1;
        let a0_const_2 = self.coefficients.a0_const_2;
        let mut last_index = OUTSIDE;

        for k in 0..self.data.len() {
            let point = self.data[k];
            if point.index == last_index {
                continue;
            }
            last_index = point.index;

            let row = g.index_to_row(point.index);
            let col = g.index_to_col(point.index);
            let node = node_index(row, col, mx);
            let x0 = g.node_x(col as i64);
            let y0 = g.node_y(row as i64);
            // Offsets in fractions of the current cell size, dy positive
            // northward.
            let dx = (point.x as f64 - x0) * g.r_x_inc;
            let dy = (point.y as f64 - y0) * g.r_y_inc;

            if dx.abs() < CLOSENESS_FACTOR && dy.abs() < CLOSENESS_FACTOR {
                self.status[node] = CONSTRAINED;
                // The constraint moves from (dx, dy) onto the node, so
                // adjust for the planar trend over that shift (scaled by
                // the stride to get final-grid fractions) and clip to the
                // envelopes if present.
                let mut z_at_node =
                    point.z as f64 + self.r_z_rms * stride as f64 * self.plane.trend(dx, dy);
                if self.constrained {
                    let row_final = stride * row;
                    let col_final = stride * col;
                    let lo = self.bounds[LO]
                        .as_ref()
                        .map(|b| b[[row_final, col_final]])
                        .filter(|b| !b.is_nan());
                    let hi = self.bounds[HI]
                        .as_ref()
                        .map(|b| b[[row_final, col_final]])
                        .filter(|b| !b.is_nan());
                    if let Some(b) = lo.filter(|&b| z_at_node < b as f64) {
                        z_at_node = b as f64;
                    } else if let Some(b) = hi.filter(|&b| z_at_node > b as f64) {
                        z_at_node = b as f64;
                    }
                }
                self.u[node] = z_at_node as f32;
            } else {
                // Reflect quadrants 2-4 onto quadrant 1: (xx, yy) >= 0.
                let (xx, yy, quadrant) = if dy >= 0.0 {
                    if dx >= 0.0 {
                        (dx, dy, 1u8)
                    } else {
                        (dy, -dx, 2u8)
                    }
                } else if dx >= 0.0 {
                    (-dy, dx, 4u8)
                } else {
                    (-dx, -dy, 3u8)
                };
                self.status[node] = quadrant;
                self.briggs
                    .push(briggs_coefficients(xx, yy, point.z, a0_const_1, a0_const_2));
            }
        }
    }
}
