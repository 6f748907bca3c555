// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Planar Trend
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Least-squares plane fit z = icept + sx * col + sy * row_up in
//! fractional grid coordinates (column from west, row measured up from
//! south). The trend is removed from the data before relaxation and
//! restored on the final grid.

/// Coefficients of the best-fitting plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaneFit {
    pub intercept: f64,
    pub slope_x: f64,
    pub slope_y: f64,
}

impl PlaneFit {
    /// Fit from (fractional column, fractional row-from-south, z)
    /// triples by solving the 3x3 normal equations. A singular system
    /// (all points colinear in (x, y)) yields the zero plane.
    pub fn fit(points: impl Iterator<Item = (f64, f64, f64)>) -> Self {
        let (mut n, mut sx, mut sy, mut sz) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        let (mut sxx, mut sxy, mut sxz, mut syy, mut syz) = (0.0f64, 0.0, 0.0, 0.0, 0.0);

        for (xx, y_up, zz) in points {
            n += 1.0;
            sx += xx;
            sy += y_up;
            sz += zz;
            sxx += xx * xx;
            sxy += xx * y_up;
            sxz += xx * zz;
            syy += y_up * y_up;
            syz += y_up * zz;
        }

        let d = n * sxx * syy + 2.0 * sx * sy * sxy
            - n * sxy * sxy
            - sx * sx * syy
            - sy * sy * sxx;
        if d == 0.0 {
            return PlaneFit::default();
        }

        let a = sz * sxx * syy + sx * sxy * syz + sy * sxy * sxz
            - sz * sxy * sxy
            - sx * sxz * syy
            - sy * syz * sxx;
        let b = n * sxz * syy + sz * sy * sxy + sy * sx * syz
            - n * sxy * syz
            - sz * sx * syy
            - sy * sy * sxz;
        let c = n * sxx * syz + sx * sy * sxz + sz * sx * sxy
            - n * sxy * sxz
            - sx * sx * syz
            - sz * sy * sxx;

        PlaneFit {
            intercept: a / d,
            slope_x: b / d,
            slope_y: c / d,
        }
    }

    /// Plane value at (col, row_up), intercept included.
    pub fn evaluate(&self, xx: f64, y_up: f64) -> f64 {
        self.intercept + self.trend(xx, y_up)
    }

    /// Change of the plane from the origin to (col, row_up).
    pub fn trend(&self, xx: f64, y_up: f64) -> f64 {
        self.slope_x * xx + self.slope_y * y_up
    }
}
