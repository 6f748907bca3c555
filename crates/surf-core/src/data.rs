// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Data Constraints
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Data points, per-stride bin geometry, and the (index, kind, distance)
//! ordering that gives the engine fast per-bin access to its nearest
//! constraint.

use std::cmp::Ordering;

use surf_types::config::Region;

/// Bin index of points that fall outside the active grid.
pub const OUTSIDE: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Data,
    /// Breakline samples override data points sharing their bin.
    Breakline,
}

/// One constraint, detrended and rms-normalized during the solve.
#[derive(Debug, Clone, Copy)]
pub struct DataPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub kind: PointKind,
    /// Bin index row * nx + col at the current stride, or [`OUTSIDE`].
    pub index: u64,
}

/// Bin geometry at one stride: everything the sort comparator and the
/// binning maps need. Rebuilt whenever the stride changes.
#[derive(Debug, Clone, Copy)]
pub struct StrideGeometry {
    pub nx: usize,
    pub ny: usize,
    pub x_inc: f64,
    pub y_inc: f64,
    pub r_x_inc: f64,
    pub r_y_inc: f64,
    pub region: Region,
}

impl StrideGeometry {
    /// Fractional column of x, from the west edge.
    pub fn x_to_fcol(&self, x: f64) -> f64 {
        (x - self.region.west) * self.r_x_inc
    }

    pub fn x_to_col(&self, x: f64) -> i64 {
        (self.x_to_fcol(x) + 0.5).floor() as i64
    }

    /// Fractional row of y, measured northward from the south edge.
    pub fn y_to_frow(&self, y: f64) -> f64 {
        (y - self.region.south) * self.r_y_inc
    }

    pub fn y_to_row(&self, y: f64) -> i64 {
        self.ny as i64 - 1 - ((self.y_to_frow(y) + 0.5).floor() as i64)
    }

    /// Node x; the last column lands exactly on the east edge. Accepts
    /// out-of-range columns so breakline bins can be identified beyond
    /// the grid.
    pub fn node_x(&self, col: i64) -> f64 {
        if col == self.nx as i64 - 1 {
            self.region.east
        } else {
            self.region.west + col as f64 * self.x_inc
        }
    }

    /// Node y; the last row lands exactly on the south edge.
    pub fn node_y(&self, row: i64) -> f64 {
        if row == self.ny as i64 - 1 {
            self.region.south
        } else {
            self.region.north - row as f64 * self.y_inc
        }
    }

    pub fn bin_index(&self, row: usize, col: usize) -> u64 {
        (row * self.nx + col) as u64
    }

    pub fn index_to_row(&self, index: u64) -> usize {
        (index / self.nx as u64) as usize
    }

    pub fn index_to_col(&self, index: u64) -> usize {
        (index % self.nx as u64) as usize
    }

    /// Squared distance from a point to the node of the given bin.
    fn distance2_to_node(&self, index: u64, x: f64, y: f64) -> f64 {
        let x0 = self.node_x(self.index_to_col(index) as i64);
        let y0 = self.node_y(self.index_to_row(index) as i64);
        (x - x0) * (x - x0) + (y - y0) * (y - y0)
    }
}

/// Padded linear node index for (row, col) in a buffer of row width mx,
/// accounting for the 2-deep ghost margin.
pub(crate) fn node_index(row: usize, col: usize, mx: usize) -> usize {
    (row + 2) * mx + col + 2
}

/// Ordering for per-bin constraint lookup: bin index ascending with
/// OUTSIDE last, breaklines before data within a bin, then squared
/// distance to the bin node ascending.
pub fn compare_points(a: &DataPoint, b: &DataPoint, geometry: &StrideGeometry) -> Ordering {
    match a.index.cmp(&b.index) {
        Ordering::Equal => {}
        unequal => return unequal,
    }
    if a.index == OUTSIDE {
        return Ordering::Equal;
    }
    match (a.kind, b.kind) {
        (PointKind::Breakline, PointKind::Data) => return Ordering::Less,
        (PointKind::Data, PointKind::Breakline) => return Ordering::Greater,
        _ => {}
    }
    let dist_a = geometry.distance2_to_node(a.index, a.x as f64, a.y as f64);
    let dist_b = geometry.distance2_to_node(b.index, b.x as f64, b.y as f64);
    dist_a.total_cmp(&dist_b)
}

pub fn sort_points(data: &mut [DataPoint], geometry: &StrideGeometry) {
    data.sort_unstable_by(|a, b| compare_points(a, b, geometry));
}

/// Recompute bin indices for a new stride, re-sort, and drop points that
/// fell outside the active sub-grid. Returns the number dropped.
pub fn recompute_indices(data: &mut Vec<DataPoint>, geometry: &StrideGeometry) -> usize {
    let mut skipped = 0usize;
    for point in data.iter_mut() {
        let col = geometry.x_to_col(point.x as f64);
        let row = geometry.y_to_row(point.y as f64);
        if col < 0 || col >= geometry.nx as i64 || row < 0 || row >= geometry.ny as i64 {
            point.index = OUTSIDE;
            skipped += 1;
        } else {
            point.index = geometry.bin_index(row as usize, col as usize);
        }
    }
    sort_points(data, geometry);
    data.truncate(data.len() - skipped);
    skipped
}

/// At the final stride, only the point nearest its node survives in each
/// bin; the rest can never act as constraints. Drops them with a warning
/// apiece. Assumes indices are current for stride 1.
pub fn discard_unusables(data: &mut Vec<DataPoint>, geometry: &StrideGeometry) -> usize {
    sort_points(data, geometry);

    let mut n_outside = 0usize;
    let mut last_index = OUTSIDE;
    let mut last_kept = 0usize;
    for k in 0..data.len() {
        if data[k].index == last_index {
            log::warn!(
                "Skipping unusable point ({} {} {}); ({} {} {}) is closer to node {}",
                data[k].x,
                data[k].y,
                data[k].z,
                data[last_kept].x,
                data[last_kept].y,
                data[last_kept].z,
                last_index
            );
            data[k].index = OUTSIDE;
            n_outside += 1;
        } else {
            last_index = data[k].index;
            last_kept = k;
        }
    }

    if n_outside > 0 {
        sort_points(data, geometry);
        data.truncate(data.len() - n_outside);
        log::warn!(
            "{n_outside} unusable points were supplied; these will be ignored. \
             Consider pre-processing the data with a block-mean or -median filter."
        );
    }
    n_outside
}
