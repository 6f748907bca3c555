// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Breaklines
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Soft breaklines: polylines densified to at least one sample per grid
//! cell crossed, then reduced to the single sample nearest each bin's
//! node (orthogonal feet onto segments included). The survivors enter
//! the data array as priority constraints.

use crate::data::StrideGeometry;

const SEGMENT_EPS: f64 = 1e-8;

/// A polyline supplied by the caller; `fixed_z` overrides any z column.
#[derive(Debug, Clone)]
pub struct Breakline {
    pub vertices: Vec<[f64; 3]>,
    pub fixed_z: Option<f64>,
}

/// Upsample the polyline so every cell it crosses holds at least one
/// sample. Vertex z may be NaN; such samples still count toward the
/// spacing but are dropped when appended to the data.
pub(crate) fn densify(line: &Breakline, geometry: &StrideGeometry) -> Vec<[f64; 3]> {
    let vertices = &line.vertices;
    let mut dense = Vec::with_capacity(vertices.len());
    if vertices.is_empty() {
        return dense;
    }
    let z_of = |v: &[f64; 3]| line.fixed_z.unwrap_or(v[2]);

    for pair in vertices.windows(2) {
        let dx = pair[1][0] - pair[0][0];
        let dy = pair[1][1] - pair[0][1];
        let dz = z_of(&pair[1]) - z_of(&pair[0]);
        let n_int =
            ((dx.hypot(dy) * geometry.r_x_inc.max(geometry.r_y_inc)).round() as usize) + 1;
        let step_x = dx / n_int as f64;
        let step_y = dy / n_int as f64;
        let step_z = dz / n_int as f64;
        for n in 0..n_int {
            dense.push([
                pair[0][0] + n as f64 * step_x,
                pair[0][1] + n as f64 * step_y,
                match line.fixed_z {
                    Some(z) => z,
                    None => pair[0][2] + n as f64 * step_z,
                },
            ]);
        }
    }
    let last = vertices[vertices.len() - 1];
    dense.push([last[0], last[1], z_of(&last)]);
    dense
}

/// Foot of the perpendicular from the bin node (x0, y0) onto the segment
/// p0-p1, accepted only when it lies within the segment and within half a
/// cell of the node. Returns the foot with interpolated z and its
/// distance to the node.
fn closest_point_on_segment(
    p0: [f64; 3],
    p1: [f64; 3],
    x0: f64,
    y0: f64,
    half_dx: f64,
    half_dy: f64,
) -> Option<([f64; 3], f64)> {
    let dx = p1[0] - p0[0];
    let dy = p1[1] - p0[1];
    if dx.abs() < SEGMENT_EPS {
        // Vertical segment
        if (p1[1] <= y0 && p0[1] > y0) || (p0[1] <= y0 && p1[1] > y0) {
            let xx = p1[0];
            let yy = y0;
            let zz = p0[2] + (p1[2] - p0[2]) * (yy - p0[1]) / dy;
            return Some(([xx, yy, zz], (xx - x0).abs()));
        }
        None
    } else if dy.abs() < SEGMENT_EPS {
        // Horizontal segment
        if (p1[0] <= x0 && p0[0] > x0) || (p0[0] <= x0 && p1[0] > x0) {
            let xx = x0;
            let yy = p1[1];
            let zz = p0[2] + (p1[2] - p0[2]) * (xx - p0[0]) / dx;
            return Some(([xx, yy, zz], (yy - y0).abs()));
        }
        None
    } else {
        let a = dy / dx;
        let xx = (y0 - p0[1] + a * p0[0] + x0 / a) / (a + 1.0 / a);
        let yy = a * (xx - p1[0]) + p1[1];
        let within_segment = (p1[0] <= xx && p0[0] > xx) || (p0[0] <= xx && p1[0] > xx);
        if within_segment && (xx - x0).abs() < half_dx && (yy - y0).abs() < half_dy {
            let zz = p0[2] + (p1[2] - p0[2]) * (xx - p0[0]) / dx;
            return Some(([xx, yy, zz], (xx - x0).hypot(yy - y0)));
        }
        None
    }
}

/// Walk the densified line and keep exactly one sample per bin entered:
/// the one closest to the bin's node, considering both the samples
/// themselves and perpendicular feet onto the segments.
pub(crate) fn nearest_per_bin(dense: &[[f64; 3]], geometry: &StrideGeometry) -> Vec<[f64; 3]> {
    let mut reduced = Vec::new();
    if dense.is_empty() {
        return reduced;
    }
    let half_dx = 0.5 * geometry.x_inc;
    let half_dy = 0.5 * geometry.y_inc;
    // Bin identity must also distinguish out-of-grid bins, so use the raw
    // (row, col) pair rather than a clamped index.
    let bin_of = |p: &[f64; 3]| (geometry.y_to_row(p[1]), geometry.x_to_col(p[0]));

    let (mut row_this, mut col_this) = bin_of(&dense[0]);
    let mut x0_this = geometry.node_x(col_this);
    let mut y0_this = geometry.node_y(row_this);
    let mut r_min = (dense[0][0] - x0_this).hypot(dense[0][1] - y0_this);
    let mut candidate = dense[0];

    for k in 1..dense.len() {
        let (row_prev, col_prev) = (row_this, col_this);
        let (x0_prev, y0_prev) = (x0_this, y0_this);
        let (row_k, col_k) = bin_of(&dense[k]);
        row_this = row_k;
        col_this = col_k;
        x0_this = geometry.node_x(col_this);
        y0_this = geometry.node_y(row_this);
        let r_this = (dense[k][0] - x0_this).hypot(dense[k][1] - y0_this);
        let same_bin = (row_this, col_this) == (row_prev, col_prev);

        if same_bin && r_this < r_min {
            candidate = dense[k];
            r_min = r_this;
        }
        if let Some((foot, r)) =
            closest_point_on_segment(dense[k - 1], dense[k], x0_prev, y0_prev, half_dx, half_dy)
        {
            if r < r_min {
                candidate = foot;
                r_min = r;
            }
        }
        if !same_bin {
            reduced.push(candidate);
            candidate = dense[k];
            r_min = r_this;
            if let Some((foot, r)) = closest_point_on_segment(
                dense[k - 1],
                dense[k],
                x0_this,
                y0_this,
                half_dx,
                half_dy,
            ) {
                if r < r_min {
                    candidate = foot;
                    r_min = r;
                }
            }
        }
    }
    reduced.push(candidate);
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use surf_types::config::Region;

    fn geometry() -> StrideGeometry {
        StrideGeometry {
            nx: 11,
            ny: 11,
            x_inc: 1.0,
            y_inc: 1.0,
            r_x_inc: 1.0,
            r_y_inc: 1.0,
            region: Region::new(0.0, 10.0, 0.0, 10.0),
        }
    }

    #[test]
    fn test_densify_fills_crossed_cells() {
        let g = geometry();
        let line = Breakline { vertices: vec![[3.0, 5.0, 10.0], [7.0, 5.0, 10.0]], fixed_z: None };
        let dense = densify(&line, &g);
        // 4-unit span: 5 samples along the segment plus the final vertex
        assert_eq!(dense.len(), 6);
        assert!((dense[0][0] - 3.0).abs() < 1e-12);
        assert!((dense[5][0] - 7.0).abs() < 1e-12);
        assert!((dense[1][0] - 3.8).abs() < 1e-12);
        assert!(dense.iter().all(|p| (p[2] - 10.0).abs() < 1e-12));
    }

    #[test]
    fn test_densify_fixed_z_overrides() {
        let g = geometry();
        let line = Breakline {
            vertices: vec![[0.0, 0.0, f64::NAN], [2.0, 0.0, f64::NAN]],
            fixed_z: Some(4.5),
        };
        let dense = densify(&line, &g);
        assert!(dense.iter().all(|p| (p[2] - 4.5).abs() < 1e-12));
    }

    #[test]
    fn test_densify_interpolates_z() {
        let g = geometry();
        let line = Breakline { vertices: vec![[0.0, 0.0, 0.0], [4.0, 0.0, 8.0]], fixed_z: None };
        let dense = densify(&line, &g);
        for p in &dense {
            assert!((p[2] - 2.0 * p[0]).abs() < 1e-12, "z should ramp: {p:?}");
        }
    }

    #[test]
    fn test_nearest_per_bin_one_sample_per_cell() {
        let g = geometry();
        let line = Breakline { vertices: vec![[3.0, 5.0, 10.0], [7.0, 5.0, 10.0]], fixed_z: None };
        let reduced = nearest_per_bin(&densify(&line, &g), &g);
        assert_eq!(reduced.len(), 5);
        let mut cols: Vec<i64> = reduced.iter().map(|p| g.x_to_col(p[0])).collect();
        cols.dedup();
        assert_eq!(cols, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_orthogonal_foot_beats_samples() {
        let g = geometry();
        // Diagonal through the cell of node (5,5), passing close by it
        let line = Breakline {
            vertices: vec![[4.6, 4.4, 0.0], [5.4, 5.6, 0.0]],
            fixed_z: Some(1.0),
        };
        let dense = densify(&line, &g);
        let reduced = nearest_per_bin(&dense, &g);
        let near_node: Vec<_> = reduced
            .iter()
            .filter(|p| g.x_to_col(p[0]) == 5 && g.y_to_row(p[1]) == 5)
            .collect();
        assert_eq!(near_node.len(), 1);
        let p = near_node[0];
        let d = (p[0] - 5.0).hypot(p[1] - 5.0);
        // The foot of the perpendicular is closer than any dense sample
        let best_sample = dense
            .iter()
            .filter(|q| g.x_to_col(q[0]) == 5 && g.y_to_row(q[1]) == 5)
            .map(|q| (q[0] - 5.0).hypot(q[1] - 5.0))
            .fold(f64::INFINITY, f64::min);
        assert!(d <= best_sample + 1e-12);
    }

    #[test]
    fn test_vertical_segment_foot() {
        let foot = closest_point_on_segment([2.0, 1.0, 0.0], [2.0, 3.0, 4.0], 1.6, 2.0, 0.5, 0.5);
        let (p, r) = foot.expect("segment straddles the node's row");
        assert!((p[0] - 2.0).abs() < 1e-12);
        assert!((p[1] - 2.0).abs() < 1e-12);
        assert!((p[2] - 2.0).abs() < 1e-12, "z interpolated at midpoint");
        assert!((r - 0.4).abs() < 1e-12);
    }
}
