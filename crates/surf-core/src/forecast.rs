// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Grid Expansion
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Moving to a finer stride: relocate the previous nodes into the denser
//! lattice, bilinearly fill the in-between nodes, and mark the old nodes
//! as trusted fixed points for the polishing pass. Also the optional
//! Gaussian moving-average seeding of the coarsest grid.

use crate::constraint::{CONSTRAINED, UNCONSTRAINED};
use crate::data::node_index;
use crate::engine::SurfaceEngine;

impl SurfaceEngine {
    /// Expand the active grid from the previous stride to the current one
    /// and fill the new nodes by bilinear interpolation.
    pub(crate) fn fill_in_forecast(&mut self) {
        let expand = self.previous_stride / self.current_stride;
        log::debug!(
            "Expand grid by factor {expand} going from stride {} to {}",
            self.previous_stride,
            self.current_stride
        );

        let current_mx = self.current_mx;
        let previous_mx = self.previous_mx;
        let (previous_nx, previous_ny) = (self.previous_nx, self.previous_ny);
        let (node_nw, node_ne) = (self.node_nw_corner, self.node_ne_corner);

        // Relocate previous nodes last-to-first; the destination index is
        // always past the source, so no value is clobbered early.
        for previous_row in (0..previous_ny).rev() {
            let row = previous_row * expand;
            for previous_col in (0..previous_nx).rev() {
                let col = previous_col * expand;
                let current_node = node_index(row, col, current_mx);
                let previous_node = node_index(previous_row, previous_col, previous_mx);
                self.u[current_node] = self.u[previous_node];
            }
        }

        let r_prev_stride = 1.0 / self.previous_stride as f64;
        for i in 0..expand {
            self.fraction[i] = i as f64 * r_prev_stride;
        }

        let u = &mut self.u;
        let status = &mut self.status;
        let fraction = &self.fraction;

        // Bin squares between previous nodes, from the first northwest
        // square to the last southeast one; each row's baseline is the
        // southern edge of its square.
        for previous_row in 1..previous_ny {
            let row = previous_row * expand;
            for previous_col in 0..previous_nx - 1 {
                let col = previous_col * expand;
                let index_00 = node_index(row, col, current_mx);
                let index_01 = index_00 - expand * current_mx;
                let index_10 = index_00 + expand;
                let index_11 = index_01 + expand;

                // z = (c + sy dy) + dx (sx + sxy dy)
                let c = u[index_00] as f64;
                let sx = u[index_10] as f64 - c;
                let sy = u[index_01] as f64 - c;
                let sxy = u[index_11] as f64 - u[index_10] as f64 - sy;

                for j in 0..expand {
                    let c_plus_sy_dy = c + sy * fraction[j];
                    let sx_plus_sxy_dy = sx + sxy * fraction[j];
                    let first = usize::from(j == 0);
                    let mut index_new = index_00 - j * current_mx + first;
                    for i in first..expand {
                        u[index_new] = (c_plus_sy_dy + fraction[i] * sx_plus_sxy_dy) as f32;
                        status[index_new] = UNCONSTRAINED;
                        index_new += 1;
                    }
                }
                status[index_00] = CONSTRAINED;
            }
        }

        // East edge: 1-D linear fill between previous east-edge nodes.
        let mut index_00 = node_ne;
        for _previous_row in 1..previous_ny {
            let index_01 = index_00;
            index_00 += expand * current_mx;
            let sy = u[index_01] as f64 - u[index_00] as f64;
            let mut index_new = index_00 - current_mx;
            for j in 1..expand {
                u[index_new] = (u[index_00] as f64 + fraction[j] * sy) as f32;
                status[index_new] = UNCONSTRAINED;
                index_new -= current_mx;
            }
            status[index_00] = CONSTRAINED;
        }

        // North edge.
        let mut index_10 = node_nw;
        for _previous_col in 0..previous_nx - 1 {
            let index_00 = index_10;
            index_10 = index_00 + expand;
            let sx = u[index_10] as f64 - u[index_00] as f64;
            let mut index_new = index_00 + 1;
            for i in 1..expand {
                u[index_new] = (u[index_00] as f64 + fraction[i] * sx) as f32;
                status[index_new] = UNCONSTRAINED;
                index_new += 1;
            }
            status[index_00] = CONSTRAINED;
        }

        status[node_ne] = CONSTRAINED;
    }

    /// Seed the coarsest grid with a Gaussian moving average of the data
    /// within the search radius; empty neighborhoods fall back to the
    /// mean of the (detrended, normalized) data.
    pub(crate) fn initialize_grid(&mut self) {
        let g = self.geometry;
        let radius = self.config.solver.search_radius;
        log::info!(
            "Initialize grid using moving average scheme [stride = {}]",
            self.current_stride
        );

        let del_col = (radius / g.x_inc).ceil() as i64;
        let del_row = (radius / g.y_inc).ceil() as i64;
        let rfact = -4.5 / (radius * radius);
        let radius2 = radius * radius;
        let mean_z = self.z_mean;

        for row in 0..self.current_ny as i64 {
            let y0 = g.node_y(row);
            for col in 0..self.current_nx as i64 {
                let x0 = g.node_x(col);
                let col_min = (col - del_col).max(0) as usize;
                let col_max = (col + del_col).min(g.nx as i64 - 1) as usize;
                let row_min = (row - del_row).max(0) as usize;
                let row_max = (row + del_row).min(g.ny as i64 - 1) as usize;
                let index_1 = g.bin_index(row_min, col_min);
                let index_2 = g.bin_index(row_max, col_max) + 1;

                let mut sum_w = 0.0f64;
                let mut sum_zw = 0.0f64;
                let mut k = 0usize;
                while k < self.data.len() && self.data[k].index < index_1 {
                    k += 1;
                }
                'window: for kj in row_min..=row_max {
                    for ki in col_min..=col_max {
                        if k >= self.data.len() || self.data[k].index >= index_2 {
                            break 'window;
                        }
                        let k_index = g.bin_index(kj, ki);
                        while k < self.data.len() && self.data[k].index < k_index {
                            k += 1;
                        }
                        while k < self.data.len() && self.data[k].index == k_index {
                            let p = self.data[k];
                            let r2 = (p.x as f64 - x0) * (p.x as f64 - x0)
                                + (p.y as f64 - y0) * (p.y as f64 - y0);
                            if r2 <= radius2 {
                                let weight = (rfact * r2).exp();
                                sum_w += weight;
                                sum_zw += weight * p.z as f64;
                            }
                            k += 1;
                        }
                    }
                }

                let node = node_index(row as usize, col as usize, self.current_mx);
                if sum_w == 0.0 {
                    log::warn!(
                        "No data inside search radius at {} {} [node set to data mean]",
                        x0,
                        y0
                    );
                    self.u[node] = mean_z as f32;
                } else {
                    self.u[node] = (sum_zw / sum_w) as f32;
                }
            }
        }
    }
}
