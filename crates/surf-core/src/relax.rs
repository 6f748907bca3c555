// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Relaxation
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Boundary conditions on the two ghost rings and the Gauss-Seidel
//! over-relaxation sweep, plus the end-of-solve misfit statistics.

use surf_math::stencil::{position::*, QUADRANT_NODES};
use surf_types::state::{MisfitReport, SweepMode, SweepRecord};

use crate::constraint::{CONSTRAINED, UNCONSTRAINED};
use crate::data::node_index;
use crate::engine::SurfaceEngine;
use crate::limits::{HI, LO};

#[inline]
fn off(node: usize, delta: isize) -> usize {
    (node as isize + delta) as usize
}

impl SurfaceEngine {
    /// Fill the ghost rows and columns: first normal derivative along the
    /// edges (or periodic copies), zero cross-derivative at the corners,
    /// and zero normal derivative of curvature on the outer ring.
    pub(crate) fn apply_boundary_conditions(&mut self) {
        let d = self.offsets;
        let mx = self.current_mx;
        let nx = self.current_nx;
        let ny = self.current_ny;
        let (n_sw, n_nw, n_ne, n_se) = (
            self.node_sw_corner,
            self.node_nw_corner,
            self.node_ne_corner,
            self.node_se_corner,
        );
        let periodic = self.periodic;
        let bt = self.config.solver.tension.boundary;
        let alpha = self.alpha;

        let x_0_const = 4.0 * (1.0 - bt) / (2.0 - bt);
        let x_1_const = (3.0 * bt - 2.0) / (2.0 - bt);
        let y_denom = 2.0 * alpha * (1.0 - bt) + bt;
        let y_0_const = 4.0 * alpha * (1.0 - bt) / y_denom;
        let y_1_const = (bt - 2.0 * alpha * (1.0 - bt)) / y_denom;
        let eps_p2 = self.coefficients.eps_p2;
        let eps_m2 = self.coefficients.eps_m2;
        let two_plus_ep2 = self.coefficients.two_plus_ep2;
        let two_plus_em2 = self.coefficients.two_plus_em2;

        let u = &mut self.u;

        // (1 - T_b) d2u/dn2 + T_b du/dn = 0 along south and north edges
        for col in 0..nx {
            let n_s = n_sw + col;
            let n_n = n_nw + col;
            u[off(n_s, d[S1])] =
                (y_0_const * u[n_s] as f64 + y_1_const * u[off(n_s, d[N1])] as f64) as f32;
            u[off(n_n, d[N1])] =
                (y_0_const * u[n_n] as f64 + y_1_const * u[off(n_n, d[S1])] as f64) as f32;
        }

        if periodic {
            for row in 0..ny {
                let n_w = n_nw + row * mx;
                let n_e = n_ne + row * mx;
                u[off(n_w, d[W1])] = u[off(n_e, d[W1])];
                u[off(n_e, d[E1])] = u[off(n_w, d[E1])];
                let mean = 0.5 * (u[n_e] + u[n_w]);
                u[n_e] = mean;
                u[n_w] = mean;
            }
        } else {
            for row in 0..ny {
                let n_w = n_nw + row * mx;
                let n_e = n_ne + row * mx;
                u[off(n_w, d[W1])] =
                    (x_1_const * u[off(n_w, d[E1])] as f64 + x_0_const * u[n_w] as f64) as f32;
                u[off(n_e, d[E1])] =
                    (x_1_const * u[off(n_e, d[W1])] as f64 + x_0_const * u[n_e] as f64) as f32;
            }
        }

        // d2u/dxdy = 0 at the four corners
        u[off(n_sw, d[SW])] = u[off(n_sw, d[SE])] + u[off(n_sw, d[NW])] - u[off(n_sw, d[NE])];
        u[off(n_nw, d[NW])] = u[off(n_nw, d[NE])] + u[off(n_nw, d[SW])] - u[off(n_nw, d[SE])];
        u[off(n_se, d[SE])] = u[off(n_se, d[SW])] + u[off(n_se, d[NE])] - u[off(n_se, d[NW])];
        u[off(n_ne, d[NE])] = u[off(n_ne, d[NW])] + u[off(n_ne, d[SE])] - u[off(n_ne, d[SW])];

        // dC/dn = 0 on the second ring, south and north
        for col in 0..nx {
            let n_s = n_sw + col;
            let n_n = n_nw + col;
            u[off(n_s, d[S2])] = (u[off(n_s, d[N2])] as f64
                + eps_m2
                    * (u[off(n_s, d[NW])] as f64 + u[off(n_s, d[NE])] as f64
                        - u[off(n_s, d[SW])] as f64
                        - u[off(n_s, d[SE])] as f64)
                + two_plus_em2 * (u[off(n_s, d[S1])] as f64 - u[off(n_s, d[N1])] as f64))
                as f32;
            u[off(n_n, d[N2])] = (u[off(n_n, d[S2])] as f64
                + eps_m2
                    * (u[off(n_n, d[SW])] as f64 + u[off(n_n, d[SE])] as f64
                        - u[off(n_n, d[NW])] as f64
                        - u[off(n_n, d[NE])] as f64)
                + two_plus_em2 * (u[off(n_n, d[N1])] as f64 - u[off(n_n, d[S1])] as f64))
                as f32;
        }

        // dC/dn = 0 on the second ring, west and east
        for row in 0..ny {
            let n_w = n_nw + row * mx;
            let n_e = n_ne + row * mx;
            if periodic {
                u[off(n_w, d[W2])] = u[off(n_e, d[W2])];
                u[off(n_e, d[E2])] = u[off(n_w, d[E2])];
            } else {
                u[off(n_w, d[W2])] = (u[off(n_w, d[E2])] as f64
                    + eps_p2
                        * (u[off(n_w, d[NE])] as f64 + u[off(n_w, d[SE])] as f64
                            - u[off(n_w, d[NW])] as f64
                            - u[off(n_w, d[SW])] as f64)
                    + two_plus_ep2 * (u[off(n_w, d[W1])] as f64 - u[off(n_w, d[E1])] as f64))
                    as f32;
                u[off(n_e, d[E2])] = (u[off(n_e, d[W2])] as f64
                    + eps_p2
                        * (u[off(n_e, d[NW])] as f64 + u[off(n_e, d[SW])] as f64
                            - u[off(n_e, d[NE])] as f64
                            - u[off(n_e, d[SE])] as f64)
                    + two_plus_ep2 * (u[off(n_e, d[E1])] as f64 - u[off(n_e, d[W1])] as f64))
                    as f32;
            }
        }
    }

    /// Gauss-Seidel sweeps with over-relaxation until the max change (in
    /// data z units) drops below the per-stride threshold or the stride's
    /// iteration cap is reached.
    pub(crate) fn iterate(&mut self, mode: SweepMode) -> u64 {
        let cap = (self.config.solver.max_iterations * self.current_stride) as u64;
        let current_limit = self.converge_limit / self.current_stride as f64;
        let relax_new = self.config.solver.relaxation;
        let relax_old = 1.0 - relax_new;

        log::debug!(
            "Starting iterations, mode = {}, max iterations = {} [stride = {}]",
            mode.letter(),
            cap,
            self.current_stride
        );
        self.log_sweep_header(mode, current_limit);

        let mut iteration_count = 0u64;
        let mut max_z_change;
        loop {
            self.apply_boundary_conditions();

            let d = self.offsets;
            let con = self.coefficients.constrained;
            let unc = self.coefficients.unconstrained;
            let a0_const_2 = self.coefficients.a0_const_2;
            let stride = self.current_stride;
            let (nx, ny, mx) = (self.current_nx, self.current_ny, self.current_mx);
            let n_nw = self.node_nw_corner;
            let clip = self.constrained;

            let mut briggs_cursor = 0usize;
            let mut max_u_change = -1.0f64;
            {
                let u = &mut self.u;
                let status = &self.status;
                let briggs = &self.briggs;
                let bounds = &self.bounds;

                for row in 0..ny {
                    let mut node = n_nw + row * mx;
                    for col in 0..nx {
                        if status[node] == CONSTRAINED {
                            node += 1;
                            continue;
                        }

                        let set: &[f64; 12] =
                            if status[node] == UNCONSTRAINED { &unc } else { &con };
                        let mut u_00 = 0.0f64;
                        for k in 0..12 {
                            u_00 += u[off(node, d[k])] as f64 * set[k];
                        }
                        if status[node] != UNCONSTRAINED {
                            // Off-node constraint in one of the quadrants
                            let b = &briggs[briggs_cursor];
                            let quadrant = status[node] as usize;
                            let mut sum_bk_uk = 0.0f64;
                            for k in 0..4 {
                                sum_bk_uk += b[k] as f64
                                    * u[off(node, d[QUADRANT_NODES[quadrant][k]])] as f64;
                            }
                            u_00 = (u_00 + a0_const_2 * (sum_bk_uk + b[4] as f64)) * b[5] as f64;
                            briggs_cursor += 1;
                        }

                        let mut u_new = u[node] as f64 * relax_old + u_00 * relax_new;
                        if clip {
                            let row_final = stride * row;
                            let col_final = stride * col;
                            let lo = bounds[LO]
                                .as_ref()
                                .map(|b| b[[row_final, col_final]])
                                .filter(|b| !b.is_nan());
                            let hi = bounds[HI]
                                .as_ref()
                                .map(|b| b[[row_final, col_final]])
                                .filter(|b| !b.is_nan());
                            if let Some(b) = lo.filter(|&b| u_new < b as f64) {
                                u_new = b as f64;
                            } else if let Some(b) = hi.filter(|&b| u_new > b as f64) {
                                u_new = b as f64;
                            }
                        }

                        let u_change = (u_new - u[node] as f64).abs();
                        u[node] = u_new as f32;
                        if u_change > max_u_change {
                            max_u_change = u_change;
                        }
                        node += 1;
                    }
                }
            }

            iteration_count += 1;
            self.total_iterations += 1;
            max_z_change = max_u_change * self.z_rms;
            self.record_sweep(SweepRecord {
                stride: self.current_stride,
                mode,
                iteration: iteration_count,
                max_change: max_z_change,
                limit: current_limit,
                total_iterations: self.total_iterations,
            });

            if max_z_change <= current_limit || iteration_count >= cap {
                break;
            }
        }

        if max_z_change > current_limit {
            self.converged = false;
            log::warn!(
                "Stride {} ({}) stopped at the iteration cap with max change {} > limit {}",
                self.current_stride,
                mode.letter(),
                max_z_change,
                current_limit
            );
        }
        log::info!(
            "{}\t{}\t{}\t{:e}\t{:e}\t{}",
            self.current_stride,
            mode.letter(),
            iteration_count,
            max_z_change,
            current_limit,
            self.total_iterations
        );
        iteration_count
    }

    /// Misfit of the converged surface at the data constraints via a
    /// 3rd-order Taylor expansion around each point's nearest node, plus
    /// the summed squared Laplacian. Only valid at stride 1.
    pub(crate) fn check_errors(&mut self) -> MisfitReport {
        log::info!("Compute rms misfit and curvature.");
        self.apply_boundary_conditions();

        let h = self.header;
        let d = self.offsets;
        let mx = self.mx();
        let r_x_inc = 1.0 / h.x_inc;
        let r_y_inc = 1.0 / h.y_inc;

        let mut mean_error = 0.0f64;
        let mut mean_squared_error = 0.0f64;
        let u = &self.u;

        for point in &self.data {
            let row = (point.index / h.n_columns as u64) as usize;
            let col = (point.index % h.n_columns as u64) as usize;
            let node = node_index(row, col, mx);
            if self.status[node] == CONSTRAINED {
                continue;
            }
            let x0 = h.col_to_x(col);
            let y0 = h.row_to_y(row);
            let dx = (point.x as f64 - x0) * r_x_inc;
            let dy = (point.y as f64 - y0) * r_y_inc;

            let v = |k: usize| u[off(node, d[k])] as f64;
            let u_node = u[node] as f64;
            let du_dx = 0.5 * (v(E1) - v(W1));
            let du_dy = 0.5 * (v(N1) - v(S1));
            let d2u_dx2 = v(E1) + v(W1) - 2.0 * u_node;
            let d2u_dy2 = v(N1) + v(S1) - 2.0 * u_node;
            let d2u_dxdy = 0.25 * (v(NE) - v(NW) - v(SE) + v(SW));
            let d3u_dx3 = 0.5 * (v(E2) - 2.0 * v(E1) + 2.0 * v(W1) - v(W2));
            let d3u_dy3 = 0.5 * (v(N2) - 2.0 * v(N1) + 2.0 * v(S1) - v(S2));
            let d3u_dx2dy = 0.5 * ((v(NE) + v(NW) - 2.0 * v(N1)) - (v(SE) + v(SW) - 2.0 * v(S1)));
            let d3u_dxdy2 = 0.5 * ((v(NE) + v(SE) - 2.0 * v(E1)) - (v(NW) + v(SW) - 2.0 * v(W1)));

            let z_est = u_node
                + dx * (du_dx + dx * (0.5 * d2u_dx2 + dx * (d3u_dx3 / 6.0)))
                + dy * (du_dy + dy * (0.5 * d2u_dy2 + dy * (d3u_dy3 / 6.0)))
                + dx * dy * d2u_dxdy
                + 0.5 * dx * d3u_dx2dy
                + 0.5 * dy * d3u_dxdy2;

            let z_err = z_est - point.z as f64;
            mean_error += z_err;
            mean_squared_error += z_err * z_err;
        }
        let n = self.data.len() as f64;
        // Report in data z units.
        mean_error = mean_error / n * self.z_rms;
        let rms_error = (mean_squared_error / n).sqrt() * self.z_rms;

        let mut curvature = 0.0f64;
        for row in 0..h.n_rows {
            for col in 0..h.n_columns {
                let node = node_index(row, col, mx);
                let c = u[off(node, d[E1])] as f64 + u[off(node, d[W1])] as f64
                    + u[off(node, d[N1])] as f64
                    + u[off(node, d[S1])] as f64
                    - 4.0 * u[node] as f64;
                curvature += c * c;
            }
        }
        curvature *= self.z_rms * self.z_rms;

        let report = MisfitReport {
            n_points: self.data.len() as u64,
            n_nodes: (h.n_rows * h.n_columns) as u64,
            mean_error,
            rms_error,
            curvature,
        };
        log::info!(
            "Fit info: {} data points, {} nodes, mean error {}, rms error {}, curvature {}",
            report.n_points,
            report.n_nodes,
            report.mean_error,
            report.rms_error,
            report.curvature
        );
        report
    }
}
