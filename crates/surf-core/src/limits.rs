// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Envelope Limits
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Lower/upper envelope grids that clip every node update. Sources are a
//! constant, the data min/max, or an external full-resolution grid; NaN
//! cells disable clipping locally. Because the solver works on detrended,
//! rms-normalized residuals, even a constant bound must live on a grid
//! once the plane is removed.

use ndarray::Array2;
use surf_math::plane::PlaneFit;
use surf_types::error::{SurfaceError, SurfaceResult};
use surf_types::state::SurfaceGrid;

pub const LO: usize = 0;
pub const HI: usize = 1;

/// Resolved bound source held by the engine.
#[derive(Debug, Clone)]
pub enum LimitSource {
    Value(f64),
    /// Min of the data for the lower bound, max for the upper.
    Data,
    Grid(SurfaceGrid),
}

/// Build the interior-resolution bound array (n_rows x n_columns, row 0
/// north). `data_value` is the resolved data min/max; `extra` holds the
/// cells added per side (west, east, south, north) when the region was
/// enlarged for a better factorization, in which case the external grid
/// matches the original request and is embedded inside a NaN border.
pub(crate) fn materialize(
    source: &LimitSource,
    which: &'static str,
    n_rows: usize,
    n_columns: usize,
    data_value: f64,
    extra: [usize; 4],
) -> SurfaceResult<Array2<f32>> {
    match source {
        LimitSource::Value(v) => Ok(Array2::from_elem((n_rows, n_columns), *v as f32)),
        LimitSource::Data => Ok(Array2::from_elem((n_rows, n_columns), data_value as f32)),
        LimitSource::Grid(grid) => {
            let want_rows = n_rows - extra[2] - extra[3];
            let want_columns = n_columns - extra[0] - extra[1];
            let (got_rows, got_columns) = grid.values.dim();
            if got_rows != want_rows || got_columns != want_columns {
                return Err(SurfaceError::LimitShapeMismatch {
                    which,
                    got_columns,
                    got_rows,
                    want_columns,
                    want_rows,
                });
            }
            let mut bound = Array2::from_elem((n_rows, n_columns), f32::NAN);
            for row in 0..got_rows {
                for col in 0..got_columns {
                    bound[[row + extra[3], col + extra[0]]] = grid.values[[row, col]];
                }
            }
            Ok(bound)
        }
    }
}

/// Remove the best-fit plane from a bound grid and normalize by the data
/// rms, skipping NaN (unclamped) cells.
pub(crate) fn detrend_normalize(bound: &mut Array2<f32>, plane: &PlaneFit, r_z_rms: f64) {
    let n_rows = bound.nrows();
    let n_columns = bound.ncols();
    for row in 0..n_rows {
        let y_up = (n_rows - row - 1) as f64;
        for col in 0..n_columns {
            let v = bound[[row, col]];
            if v.is_nan() {
                continue;
            }
            bound[[row, col]] = ((v as f64 - plane.evaluate(col as f64, y_up)) * r_z_rms) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surf_types::config::Region;
    use surf_types::state::GridHeader;

    #[test]
    fn test_constant_limit_fills_grid() {
        let b = materialize(&LimitSource::Value(3.0), "lower", 4, 5, 0.0, [0; 4]).unwrap();
        assert_eq!(b.dim(), (4, 5));
        assert!(b.iter().all(|&v| v == 3.0));
    }

    #[test]
    fn test_data_limit_uses_resolved_value() {
        let b = materialize(&LimitSource::Data, "upper", 3, 3, -7.5, [0; 4]).unwrap();
        assert!(b.iter().all(|&v| v == -7.5));
    }

    #[test]
    fn test_grid_limit_shape_mismatch() {
        let header = GridHeader::from_region(Region::new(0.0, 3.0, 0.0, 2.0), 1.0, 1.0);
        let grid = SurfaceGrid { header, values: Array2::zeros((3, 4)) };
        let err = materialize(&LimitSource::Grid(grid), "lower", 5, 5, 0.0, [0; 4]);
        assert!(matches!(err, Err(SurfaceError::LimitShapeMismatch { .. })));
    }

    #[test]
    fn test_grid_limit_enlarged_region_gets_nan_border() {
        let header = GridHeader::from_region(Region::new(0.0, 2.0, 0.0, 2.0), 1.0, 1.0);
        let grid = SurfaceGrid { header, values: Array2::from_elem((3, 3), 1.5) };
        // One extra column west, one extra row north
        let b = materialize(&LimitSource::Grid(grid), "lower", 4, 4, 0.0, [1, 0, 0, 1]).unwrap();
        assert!(b[[0, 0]].is_nan());
        assert!(b[[0, 3]].is_nan());
        assert!(b[[1, 0]].is_nan());
        assert_eq!(b[[1, 1]], 1.5);
        assert_eq!(b[[3, 3]], 1.5);
    }

    #[test]
    fn test_detrend_normalize_skips_nan() {
        let mut b = Array2::from_elem((3, 3), 10.0f32);
        b[[0, 0]] = f32::NAN;
        let plane = PlaneFit { intercept: 1.0, slope_x: 1.0, slope_y: 2.0 };
        detrend_normalize(&mut b, &plane, 0.5);
        assert!(b[[0, 0]].is_nan());
        // row 2 is the south edge: y_up = 0; value = (10 - (1 + col)) * 0.5
        assert!((b[[2, 0]] - 4.5).abs() < 1e-6);
        assert!((b[[2, 2]] - 3.5).abs() < 1e-6);
        // row 0 (north): y_up = 2; value = (10 - (1 + col + 4)) * 0.5
        assert!((b[[0, 2]] - 1.5).abs() < 1e-6);
    }
}
