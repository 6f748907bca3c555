// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Gridding Engine
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! The gridding engine: one context value owns the data constraints, the
//! padded solution buffer, the node status bytes, the Briggs table and
//! the envelope grids, and threads them through the multigrid stride
//! progression until the finest grid converges.

use std::io::Write;

use ndarray::Array2;

use surf_math::factor::{gcd_euclid, prime_factors};
use surf_math::plane::PlaneFit;
use surf_math::stencil::{node_offsets, StencilCoefficients};
use surf_math::suggest::suggest_dimensions;
use surf_types::config::{Convergence, LimitSpec, RegionPolicy, Registration, SurfaceConfig};
use surf_types::error::{SurfaceError, SurfaceResult};
use surf_types::state::{
    GridHeader, MisfitReport, SolveReport, SurfaceGrid, SweepMode, SweepRecord,
};

use crate::breakline::{densify, nearest_per_bin, Breakline};
use crate::constraint::UNCONSTRAINED;
use crate::data::{self, node_index, DataPoint, PointKind, StrideGeometry};
use crate::limits::{self, LimitSource, HI, LO};

/// How far below the cell size the detrended data rms may fall before the
/// data are declared to lie exactly on a plane.
const PLANE_RMS_LIMIT: f64 = 1.0e-8;

/// Minimum estimated speedup before the engine adopts an enlarged region.
const ADOPT_SUGGESTION_FACTOR: f64 = 1.1;

pub struct SurfaceEngine {
    pub(crate) config: SurfaceConfig,
    /// Internal node-registered header; region possibly shifted by half
    /// an increment (pixel registration) and enlarged (optimization).
    /// The output shrinks back to the configured region.
    pub(crate) header: GridHeader,
    pub(crate) pixel: bool,
    pub(crate) adjusted: bool,
    /// Cells added per side (west, east, south, north) by optimization.
    pub(crate) extra: [usize; 4],
    pub(crate) periodic: bool,
    pub(crate) alpha: f64,

    raw_points: Vec<[f64; 3]>,
    pending_breaklines: Vec<Breakline>,
    limit_sources: [Option<LimitSource>; 2],
    sweep_sink: Option<Box<dyn Write>>,

    pub(crate) data: Vec<DataPoint>,
    pub(crate) z_mean: f64,
    pub(crate) data_min: f64,
    pub(crate) data_max: f64,

    pub(crate) plane: PlaneFit,
    pub(crate) z_rms: f64,
    pub(crate) r_z_rms: f64,
    pub(crate) converge_limit: f64,

    pub(crate) factors: Vec<usize>,
    pub(crate) current_stride: usize,
    pub(crate) previous_stride: usize,
    pub(crate) current_nx: usize,
    pub(crate) current_ny: usize,
    pub(crate) current_mx: usize,
    pub(crate) previous_nx: usize,
    pub(crate) previous_ny: usize,
    pub(crate) previous_mx: usize,
    pub(crate) geometry: StrideGeometry,
    pub(crate) offsets: [isize; 12],
    pub(crate) node_nw_corner: usize,
    pub(crate) node_sw_corner: usize,
    pub(crate) node_se_corner: usize,
    pub(crate) node_ne_corner: usize,
    pub(crate) coefficients: StencilCoefficients,

    /// Padded solution buffer, (n_columns + 4) x (n_rows + 4) cells.
    pub(crate) u: Vec<f32>,
    pub(crate) status: Vec<u8>,
    pub(crate) briggs: Vec<[f32; 6]>,
    pub(crate) fraction: Vec<f64>,
    pub(crate) bounds: [Option<Array2<f32>>; 2],
    pub(crate) constrained: bool,

    pub(crate) total_iterations: u64,
    pub(crate) sweeps: Vec<SweepRecord>,
    pub(crate) converged: bool,
}

impl SurfaceEngine {
    pub fn new(config: SurfaceConfig) -> SurfaceResult<Self> {
        config.validate()?;
        let [x_inc, y_inc] = config.spacing;
        let pixel = config.registration == Registration::Pixel;

        // Pixel registration: shift by half an increment, solve
        // node-registered, and trim the extra row/column on output.
        let mut region = config.region;
        if pixel {
            region.west += 0.5 * x_inc;
            region.east += 0.5 * x_inc;
            region.south += 0.5 * y_inc;
            region.north += 0.5 * y_inc;
        }

        let base = GridHeader::from_region(region, x_inc, y_inc);
        if base.n_columns < 4 || base.n_rows < 4 {
            return Err(SurfaceError::Degenerate {
                n_columns: base.n_columns,
                n_rows: base.n_rows,
            });
        }

        let periodic = config.is_periodic();
        let mut adjusted = false;
        let mut extra = [0usize; 4];
        if config.region_policy == RegionPolicy::Optimize && !periodic {
            if let Some(best) = suggest_dimensions(base.n_columns - 1, base.n_rows - 1).first() {
                if best.factor >= ADOPT_SUGGESTION_FACTOR {
                    let m_x = best.n_x_cells - (base.n_columns - 1);
                    let m_y = best.n_y_cells - (base.n_rows - 1);
                    extra = [m_x / 2, m_x - m_x / 2, m_y / 2, m_y - m_y / 2];
                    region.west -= extra[0] as f64 * x_inc;
                    region.east += extra[1] as f64 * x_inc;
                    region.south -= extra[2] as f64 * y_inc;
                    region.north += extra[3] as f64 * y_inc;
                    adjusted = m_x > 0 || m_y > 0;
                    if adjusted {
                        log::info!(
                            "Speeding up convergence with the larger region \
                             {}/{}/{}/{} ({} x {} to {} x {} cells, estimated speedup {:.3})",
                            region.west,
                            region.east,
                            region.south,
                            region.north,
                            base.n_columns - 1,
                            base.n_rows - 1,
                            best.n_x_cells,
                            best.n_y_cells,
                            best.factor
                        );
                        if config.geographic && (region.south < -90.0 || region.north > 90.0) {
                            log::warn!(
                                "Optimized region exceeds the latitude range [-90, 90]"
                            );
                        }
                    }
                }
            }
        }

        let header = GridHeader::from_region(region, x_inc, y_inc);
        let alpha = config.aspect_value();
        let coefficients = StencilCoefficients::new(config.solver.tension.interior, alpha);

        let limit_sources = [
            config.limits.low.map(limit_source_from_spec),
            config.limits.high.map(limit_source_from_spec),
        ];

        let geometry = StrideGeometry {
            nx: header.n_columns,
            ny: header.n_rows,
            x_inc,
            y_inc,
            r_x_inc: 1.0 / x_inc,
            r_y_inc: 1.0 / y_inc,
            region: header.region,
        };

        let mut engine = SurfaceEngine {
            config,
            header,
            pixel,
            adjusted,
            extra,
            periodic,
            alpha,
            raw_points: Vec::new(),
            pending_breaklines: Vec::new(),
            limit_sources,
            sweep_sink: None,
            data: Vec::new(),
            z_mean: 0.0,
            data_min: f64::MAX,
            data_max: f64::MIN,
            plane: PlaneFit::default(),
            z_rms: 1.0,
            r_z_rms: 1.0,
            converge_limit: 0.0,
            factors: Vec::new(),
            current_stride: 1,
            previous_stride: 1,
            current_nx: 0,
            current_ny: 0,
            current_mx: 0,
            previous_nx: 0,
            previous_ny: 0,
            previous_mx: 0,
            geometry,
            offsets: [0; 12],
            node_nw_corner: 0,
            node_sw_corner: 0,
            node_se_corner: 0,
            node_ne_corner: 0,
            coefficients,
            u: Vec::new(),
            status: Vec::new(),
            briggs: Vec::new(),
            fraction: Vec::new(),
            bounds: [None, None],
            constrained: false,
            total_iterations: 0,
            sweeps: Vec::new(),
            converged: true,
        };
        engine.set_grid_parameters();
        Ok(engine)
    }

    pub fn add_point(&mut self, x: f64, y: f64, z: f64) {
        self.raw_points.push([x, y, z]);
    }

    pub fn add_points(&mut self, points: impl IntoIterator<Item = [f64; 3]>) {
        self.raw_points.extend(points);
    }

    /// Queue a soft breakline; its samples override data points sharing
    /// their bin.
    pub fn add_breakline(&mut self, vertices: Vec<[f64; 3]>) {
        self.pending_breaklines.push(Breakline { vertices, fixed_z: None });
    }

    /// Queue a breakline whose z is a constant level, ignoring any z the
    /// vertices carry.
    pub fn add_breakline_at_level(&mut self, vertices: Vec<[f64; 3]>, z_level: f64) {
        self.pending_breaklines.push(Breakline { vertices, fixed_z: Some(z_level) });
    }

    /// Supply an external bound grid for `limits::LO` or `limits::HI`,
    /// overriding any constant/data bound from the config.
    pub fn set_limit_grid(&mut self, end: usize, grid: SurfaceGrid) {
        self.limit_sources[end] = Some(LimitSource::Grid(grid));
    }

    /// Stream one line per relaxation sweep to `sink` (the convergence
    /// log), in addition to the records kept in the report.
    pub fn set_sweep_log(&mut self, sink: Box<dyn Write>) {
        self.sweep_sink = Some(sink);
    }

    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    /// Run the full multigrid solve and hand back the final grid with a
    /// report. Convergence failure is not an error; the report says so.
    pub fn solve(mut self) -> SurfaceResult<(SurfaceGrid, SolveReport)> {
        if let Some(sink) = self.sweep_sink.as_mut() {
            let _ = writeln!(sink, "#grid\tmode\tgrid_iteration\tchange\tlimit\ttotal_iteration");
        }

        let gcd = gcd_euclid(self.header.n_columns - 1, self.header.n_rows - 1);
        if gcd == 1 {
            log::warn!("Grid dimensions are mutually prime; convergence is very unlikely.");
            for s in suggest_dimensions(self.header.n_columns - 1, self.header.n_rows - 1) {
                log::info!(
                    "Hint: {} x {} cells might cut run time by a factor of {:.4}",
                    s.n_x_cells,
                    s.n_y_cells,
                    s.factor
                );
            }
        }

        self.current_stride = 1;
        self.set_grid_parameters();
        self.read_data()?;
        self.inject_breaklines();
        data::discard_unusables(&mut self.data, &self.geometry);
        self.remove_planar_trend();
        let plane_only = self.rescale_z_values();

        self.u = vec![0.0f32; self.mxmy()];
        if plane_only {
            log::warn!("Input data lie exactly on a plane.");
            self.restore_planar_trend();
            self.finalize_limits()?;
            self.enforce_periodic();
            let grid = self.build_output();
            let report = self.build_report(true, None);
            return Ok((grid, report));
        }

        self.load_limits(true)?;

        self.current_stride = gcd;
        self.factors = prime_factors(gcd);
        self.set_grid_parameters();
        while self.current_nx < 4 || self.current_ny < 4 {
            self.smart_divide();
            self.set_grid_parameters();
        }
        self.set_offsets();
        data::recompute_indices(&mut self.data, &self.geometry);

        self.status = vec![UNCONSTRAINED; self.mxmy()];
        self.fraction = vec![0.0f64; self.current_stride];
        self.report_memory();

        if self.config.solver.search_radius > 0.0 {
            self.initialize_grid();
        }

        log::info!("Grid\tMode\tIteration\tMax Change\tConv Limit\tTotal Iterations");

        // Coarsest grid: classify the data constraints and converge.
        self.previous_stride = self.current_stride;
        self.find_nearest_constraints();
        self.iterate(SweepMode::Data);

        while self.current_stride > 1 {
            self.smart_divide();
            self.set_grid_parameters();
            self.set_offsets();
            data::recompute_indices(&mut self.data, &self.geometry);
            self.fill_in_forecast();
            self.iterate(SweepMode::Interpolating);
            self.find_nearest_constraints();
            self.iterate(SweepMode::Data);
            self.previous_stride = self.current_stride;
        }

        let misfit = self.check_errors();
        self.restore_planar_trend();
        self.finalize_limits()?;
        self.enforce_periodic();
        let grid = self.build_output();
        let report = self.build_report(false, Some(misfit));
        Ok((grid, report))
    }

    // ── Bookkeeping across strides ───────────────────────────────────

    pub(crate) fn mx(&self) -> usize {
        self.header.n_columns + 4
    }

    pub(crate) fn mxmy(&self) -> usize {
        (self.header.n_columns + 4) * (self.header.n_rows + 4)
    }

    /// Divide the stride by its largest remaining prime factor.
    pub(crate) fn smart_divide(&mut self) {
        let factor = self.factors.pop().expect("stride > 1 implies remaining factors");
        self.current_stride /= factor;
    }

    /// Refresh the node counts, cell sizes, corner nodes and comparator
    /// geometry after a stride change.
    pub(crate) fn set_grid_parameters(&mut self) {
        self.previous_nx = self.current_nx;
        self.previous_ny = self.current_ny;
        self.previous_mx = self.current_mx;

        self.current_nx = (self.header.n_columns - 1) / self.current_stride + 1;
        self.current_ny = (self.header.n_rows - 1) / self.current_stride + 1;
        self.current_mx = self.current_nx + 4;

        let x_inc = self.current_stride as f64 * self.header.x_inc;
        let y_inc = self.current_stride as f64 * self.header.y_inc;
        self.geometry = StrideGeometry {
            nx: self.current_nx,
            ny: self.current_ny,
            x_inc,
            y_inc,
            r_x_inc: 1.0 / x_inc,
            r_y_inc: 1.0 / y_inc,
            region: self.header.region,
        };

        self.node_nw_corner = 2 * self.current_mx + 2;
        self.node_sw_corner = self.node_nw_corner + (self.current_ny - 1) * self.current_mx;
        self.node_se_corner = self.node_sw_corner + self.current_nx - 1;
        self.node_ne_corner = self.node_nw_corner + self.current_nx - 1;
    }

    pub(crate) fn set_offsets(&mut self) {
        self.offsets = node_offsets(self.current_mx);
    }

    // ── Data pipeline ────────────────────────────────────────────────

    /// Move the queued raw points into the constraint array, dropping NaN
    /// and out-of-region records and replicating the periodic seam.
    fn read_data(&mut self) -> SurfaceResult<()> {
        log::info!("Processing input table data");
        let g = self.geometry;
        let lim_w = g.region.west - g.x_inc;
        let lim_e = g.region.east + g.x_inc;
        let lim_s = g.region.south - g.y_inc;
        let lim_n = g.region.north + g.y_inc;
        let half_dx = 0.5 * g.x_inc;

        let mut sum_z = 0.0f64;
        let mut n_duplicated = 0u64;
        let mut location_min = [0.0f64; 3];
        let mut location_max = [0.0f64; 3];

        for &[x0, y0, z] in &self.raw_points {
            if z.is_nan() {
                continue;
            }
            if y0 < lim_s || y0 > lim_n {
                continue;
            }
            let mut x = x0;
            if self.config.geographic {
                while x > lim_e {
                    x -= 360.0;
                }
                while x < lim_w {
                    x += 360.0;
                }
            }
            if x < lim_w || x > lim_e {
                continue;
            }
            let row = g.y_to_row(y0);
            if row < 0 || row >= g.ny as i64 {
                continue;
            }
            let col = if self.periodic && (g.region.east - x) < half_dx {
                // Constrain the western node and replicate eastward below.
                x -= 360.0;
                0
            } else {
                g.x_to_col(x)
            };
            if col < 0 || col >= g.nx as i64 {
                continue;
            }

            if z < self.data_min {
                self.data_min = z;
                location_min = [x, y0, z];
            }
            if z > self.data_max {
                self.data_max = z;
                location_max = [x, y0, z];
            }

            self.data.push(DataPoint {
                x: x as f32,
                y: y0 as f32,
                z: z as f32,
                kind: PointKind::Data,
                index: g.bin_index(row as usize, col as usize),
            });
            sum_z += z;

            if self.periodic && col == 0 {
                self.data.push(DataPoint {
                    x: (x + 360.0) as f32,
                    y: y0 as f32,
                    z: z as f32,
                    kind: PointKind::Data,
                    index: g.bin_index(row as usize, g.nx - 1),
                });
                sum_z += z;
                n_duplicated += 1;
            }
        }
        self.raw_points = Vec::new();

        if self.data.is_empty() {
            return Err(SurfaceError::EmptyInput);
        }
        self.z_mean = sum_z / self.data.len() as f64;
        log::info!(
            "Minimum value of your dataset x,y,z at: {} {} {}",
            location_min[0],
            location_min[1],
            location_min[2]
        );
        log::info!(
            "Maximum value of your dataset x,y,z at: {} {} {}",
            location_max[0],
            location_max[1],
            location_max[2]
        );
        if self.periodic && n_duplicated > 0 {
            log::info!(
                "Number of input values shared between repeating west and east columns: {n_duplicated}"
            );
        }
        if let Some(LimitSource::Value(v)) = &self.limit_sources[LO] {
            if *v > self.data_min {
                log::info!("Your lower limit is above the data minimum.");
            }
        }
        if let Some(LimitSource::Value(v)) = &self.limit_sources[HI] {
            if *v < self.data_max {
                log::info!("Your upper limit is below the data maximum.");
            }
        }
        Ok(())
    }

    /// Densify queued breaklines, keep the per-bin nearest samples, and
    /// append them as priority constraints.
    fn inject_breaklines(&mut self) {
        if self.pending_breaklines.is_empty() {
            return;
        }
        let g = self.geometry;
        let mut sum_z = self.z_mean * self.data.len() as f64;
        let lines = std::mem::take(&mut self.pending_breaklines);
        for line in &lines {
            let dense = densify(line, &g);
            let reduced = nearest_per_bin(&dense, &g);
            let mut n_used = 0usize;
            for p in &reduced {
                if p[2].is_nan() {
                    continue;
                }
                let col = g.x_to_col(p[0]);
                let row = g.y_to_row(p[1]);
                if col < 0 || col >= g.nx as i64 || row < 0 || row >= g.ny as i64 {
                    continue;
                }
                self.data.push(DataPoint {
                    x: p[0] as f32,
                    y: p[1] as f32,
                    z: p[2] as f32,
                    kind: PointKind::Breakline,
                    index: g.bin_index(row as usize, col as usize),
                });
                sum_z += p[2];
                self.data_min = self.data_min.min(p[2]);
                self.data_max = self.data_max.max(p[2]);
                n_used += 1;
            }
            log::debug!(
                "Breakline with {} vertices interpolated to {} points, reduced to {} constraints",
                line.vertices.len(),
                dense.len(),
                n_used
            );
        }
        self.z_mean = sum_z / self.data.len() as f64;
    }

    /// Fit and subtract the least-squares plane; restored after the solve.
    fn remove_planar_trend(&mut self) {
        let header = self.header;
        self.plane = PlaneFit::fit(self.data.iter().map(|p| {
            (
                header.x_to_fcol(p.x as f64),
                header.y_to_frow(p.y as f64),
                p.z as f64,
            )
        }));
        if self.periodic {
            // A periodic longitude domain cannot carry an x-trend.
            self.plane.slope_x = 0.0;
        }
        for p in &mut self.data {
            let xx = header.x_to_fcol(p.x as f64);
            let y_up = header.y_to_frow(p.y as f64);
            p.z -= self.plane.evaluate(xx, y_up) as f32;
        }
        log::info!(
            "Plane fit z = {} + ({} * col) + ({} * row)",
            self.plane.intercept,
            self.plane.slope_x,
            self.plane.slope_y
        );
    }

    /// Normalize the detrended data by their rms. Returns true when the
    /// data lie exactly on the fitted plane and no iteration is needed.
    fn rescale_z_values(&mut self) -> bool {
        let ssz: f64 = self.data.iter().map(|p| (p.z as f64) * (p.z as f64)).sum();
        self.z_rms = (ssz / self.data.len() as f64).sqrt();
        if self.z_rms < PLANE_RMS_LIMIT {
            self.z_rms = 1.0;
            self.r_z_rms = 1.0;
            return true;
        }
        self.r_z_rms = 1.0 / self.z_rms;
        for p in &mut self.data {
            p.z *= self.r_z_rms as f32;
        }
        // Keep the mean on the same scale as the data it summarizes; the
        // coarse-grid seeding falls back to it.
        self.z_mean =
            self.data.iter().map(|p| p.z as f64).sum::<f64>() / self.data.len() as f64;
        log::info!("Normalized detrended data constraints by z rms = {}", self.z_rms);

        self.converge_limit = match self.config.solver.convergence {
            Convergence::Value(v) => v,
            Convergence::Fraction(f) => f * self.z_rms,
            Convergence::Default => {
                let limit = surf_types::config::DEFAULT_CONVERGENCE_FRACTION * self.z_rms;
                log::info!("Using default convergence limit of {limit} (100 ppm of L2 scale)");
                limit
            }
        };
        false
    }

    /// Materialize the envelope grids; with `transform` they are
    /// detrended and rms-normalized like the data.
    pub(crate) fn load_limits(&mut self, transform: bool) -> SurfaceResult<()> {
        for end in [LO, HI] {
            let Some(source) = &self.limit_sources[end] else { continue };
            let which = if end == LO { "lower" } else { "upper" };
            let data_value = if end == LO { self.data_min } else { self.data_max };
            let mut bound = limits::materialize(
                source,
                which,
                self.header.n_rows,
                self.header.n_columns,
                data_value,
                self.extra,
            )?;
            if transform {
                limits::detrend_normalize(&mut bound, &self.plane, self.r_z_rms);
            }
            log::debug!("Loaded {which} limit grid");
            self.bounds[end] = Some(bound);
            self.constrained = true;
        }
        Ok(())
    }

    // ── Finalization ─────────────────────────────────────────────────

    /// Scale the grid back by the data rms and add the plane.
    pub(crate) fn restore_planar_trend(&mut self) {
        let n_rows = self.header.n_rows;
        let n_columns = self.header.n_columns;
        let mx = self.mx();
        for row in 0..n_rows {
            let y_up = (n_rows - row - 1) as f64;
            let node = node_index(row, 0, mx);
            for col in 0..n_columns {
                let restored =
                    self.u[node + col] as f64 * self.z_rms + self.plane.evaluate(col as f64, y_up);
                self.u[node + col] = restored as f32;
            }
        }
    }

    /// Reload the raw (untransformed) envelopes and clamp the final grid.
    fn finalize_limits(&mut self) -> SurfaceResult<()> {
        if self.limit_sources.iter().all(Option::is_none) {
            return Ok(());
        }
        self.load_limits(false)?;
        let n_rows = self.header.n_rows;
        let n_columns = self.header.n_columns;
        let mx = self.mx();
        for row in 0..n_rows {
            for col in 0..n_columns {
                let node = node_index(row, col, mx);
                if let Some(lo) = &self.bounds[LO] {
                    let b = lo[[row, col]];
                    if !b.is_nan() && self.u[node] < b {
                        self.u[node] = b;
                    }
                }
                if let Some(hi) = &self.bounds[HI] {
                    let b = hi[[row, col]];
                    if !b.is_nan() && self.u[node] > b {
                        self.u[node] = b;
                    }
                }
            }
        }
        Ok(())
    }

    /// Force exact equality of the repeated west and east columns.
    fn enforce_periodic(&mut self) {
        if !self.periodic {
            return;
        }
        let mx = self.mx();
        let n_columns = self.header.n_columns;
        for row in 0..self.header.n_rows {
            let west = node_index(row, 0, mx);
            let east = west + n_columns - 1;
            let mean = 0.5 * (self.u[west] + self.u[east]);
            self.u[west] = mean;
            self.u[east] = mean;
        }
    }

    /// Extract the interior, shrink back to the requested region, and
    /// emulate pixel registration by folding the extra row/column into
    /// the pad.
    fn build_output(&self) -> SurfaceGrid {
        let n_rows = self.header.n_rows;
        let n_columns = self.header.n_columns;
        let mx = self.mx();

        let (mut row0, mut row1) = (0usize, n_rows);
        let (mut col0, mut col1) = (0usize, n_columns);
        if self.adjusted {
            col0 = self.extra[0];
            col1 = n_columns - self.extra[1];
            row0 = self.extra[3];
            row1 = n_rows - self.extra[2];
            log::info!(
                "Shrinking back to the requested region by folding {} {} {} {} cells into the pad",
                self.extra[0],
                self.extra[1],
                self.extra[2],
                self.extra[3]
            );
        }
        if self.pixel {
            // The northernmost row and easternmost column sit half an
            // increment outside the requested pixel region.
            row0 += 1;
            col1 -= 1;
        }

        let mut values = Array2::<f32>::zeros((row1 - row0, col1 - col0));
        for row in row0..row1 {
            for col in col0..col1 {
                values[[row - row0, col - col0]] = self.u[node_index(row, col, mx)];
            }
        }

        let header = GridHeader {
            region: self.config.region,
            x_inc: self.header.x_inc,
            y_inc: self.header.y_inc,
            n_columns: col1 - col0,
            n_rows: row1 - row0,
            registration: self.config.registration,
        };
        SurfaceGrid { header, values }
    }

    fn build_report(&mut self, plane_only: bool, misfit: Option<MisfitReport>) -> SolveReport {
        SolveReport {
            converged: self.converged,
            total_iterations: self.total_iterations,
            sweeps: std::mem::take(&mut self.sweeps),
            plane_only,
            plane_intercept: self.plane.intercept,
            plane_slope_x: self.plane.slope_x,
            plane_slope_y: self.plane.slope_y,
            z_rms: if plane_only { 1.0 } else { self.z_rms },
            misfit,
        }
    }

    /// Segment header written to the convergence log when a stride/mode
    /// run begins.
    pub(crate) fn log_sweep_header(&mut self, mode: SweepMode, limit: f64) {
        if let Some(sink) = self.sweep_sink.as_mut() {
            let _ = writeln!(
                sink,
                "> Grid size = {} Mode = {} Convergence limit = {:e}",
                self.current_stride,
                mode.letter(),
                limit
            );
        }
    }

    pub(crate) fn record_sweep(&mut self, record: SweepRecord) {
        if let Some(sink) = self.sweep_sink.as_mut() {
            let _ = writeln!(
                sink,
                "{}\t{}\t{}\t{:.8e}\t{:.8e}\t{}",
                record.stride,
                record.mode.letter(),
                record.iteration,
                record.max_change,
                record.limit,
                record.total_iterations
            );
        }
        self.sweeps.push(record);
    }

    fn report_memory(&self) {
        let data_bytes = self.data.len() * std::mem::size_of::<DataPoint>();
        let grid_bytes = self.mxmy() * std::mem::size_of::<f32>();
        let status_bytes = self.mxmy();
        let briggs_bytes = self.data.len() * std::mem::size_of::<[f32; 6]>();
        let bound_bytes: usize = self
            .bounds
            .iter()
            .flatten()
            .map(|b| b.len() * std::mem::size_of::<f32>())
            .sum();
        log::info!(
            "Memory use: data {} B, grid {} B, status {} B, Briggs {} B, limits {} B, total {} B",
            data_bytes,
            grid_bytes,
            status_bytes,
            briggs_bytes,
            bound_bytes,
            data_bytes + grid_bytes + status_bytes + briggs_bytes + bound_bytes
        );
    }
}

fn limit_source_from_spec(spec: LimitSpec) -> LimitSource {
    match spec {
        LimitSpec::Constant(v) => LimitSource::Value(v),
        LimitSpec::Data => LimitSource::Data,
    }
}
