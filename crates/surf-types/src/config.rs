// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Config
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::error::{SurfaceError, SurfaceResult};

/// Default convergence limit as a fraction of the detrended data rms
/// (100 ppm of the L2 scale).
pub const DEFAULT_CONVERGENCE_FRACTION: f64 = 1.0e-4;

/// Default iteration cap at the final grid size; multiplied by the
/// current stride on coarser grids.
pub const DEFAULT_MAX_ITERATIONS: usize = 500;

/// Default successive over-relaxation factor.
pub const DEFAULT_RELAXATION: f64 = 1.4;

/// Node registration of the output grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Registration {
    #[default]
    Gridline,
    Pixel,
}

/// Whether the engine may enlarge the region to reach grid dimensions
/// with a richer prime factorization (shrinking back on output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegionPolicy {
    /// Honor the requested region exactly, even if the dimensions are prime.
    Exact,
    /// Expand symmetrically to better-factoring dimensions when it helps.
    #[default]
    Optimize,
}

/// Rectangular grid domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Region {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl Region {
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Region { west, east, south, north }
    }
}

/// Tension factors in [0, 1]; 0 is minimum curvature, 1 a harmonic surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tension {
    pub boundary: f64,
    pub interior: f64,
}

impl Tension {
    /// Same tension for the interior equations and the boundary conditions.
    pub fn both(t: f64) -> Self {
        Tension { boundary: t, interior: t }
    }
}

impl Default for Tension {
    fn default() -> Self {
        Tension::both(0.0)
    }
}

/// Aspect ratio dy/dx used to weight the stencil anisotropically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Aspect {
    Value(f64),
    /// cos(mid-latitude); requires a geographic grid.
    MidLatitude,
}

impl Default for Aspect {
    fn default() -> Self {
        Aspect::Value(1.0)
    }
}

/// Convergence limit on the max per-sweep change, in z units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Convergence {
    /// 1e-4 of the detrended data rms.
    #[default]
    Default,
    /// Absolute limit in the units of the data z.
    Value(f64),
    /// Fraction of the detrended data rms, e.g. 0.001 for 0.1%.
    Fraction(f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolverOptions {
    #[serde(default)]
    pub tension: Tension,
    #[serde(default)]
    pub aspect: Aspect,
    #[serde(default)]
    pub convergence: Convergence,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_relaxation")]
    pub relaxation: f64,
    /// Search radius (in x/y units) for the Gaussian moving-average seed
    /// of the coarsest grid; 0 skips the seeding step.
    #[serde(default)]
    pub search_radius: f64,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_relaxation() -> f64 {
    DEFAULT_RELAXATION
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            tension: Tension::default(),
            aspect: Aspect::default(),
            convergence: Convergence::Default,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            relaxation: DEFAULT_RELAXATION,
            search_radius: 0.0,
        }
    }
}

/// One envelope bound. External limit grids are supplied programmatically
/// through the engine since they do not belong in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LimitSpec {
    Constant(f64),
    /// Use the min (lower bound) or max (upper bound) of the input data.
    Data,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LimitOptions {
    #[serde(default)]
    pub low: Option<LimitSpec>,
    #[serde(default)]
    pub high: Option<LimitSpec>,
}

/// Full gridding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub region: Region,
    /// Grid increments [x_inc, y_inc].
    pub spacing: [f64; 2],
    #[serde(default)]
    pub registration: Registration,
    #[serde(default)]
    pub region_policy: RegionPolicy,
    /// x is longitude, y is latitude. Enables periodic handling for
    /// 360-degree domains and the `Aspect::MidLatitude` mode.
    #[serde(default)]
    pub geographic: bool,
    #[serde(default)]
    pub solver: SolverOptions,
    #[serde(default)]
    pub limits: LimitOptions,
}

impl SurfaceConfig {
    pub fn new(region: Region, x_inc: f64, y_inc: f64) -> Self {
        SurfaceConfig {
            region,
            spacing: [x_inc, y_inc],
            registration: Registration::default(),
            region_policy: RegionPolicy::default(),
            geographic: false,
            solver: SolverOptions::default(),
            limits: LimitOptions::default(),
        }
    }

    /// Load from a JSON file.
    pub fn from_file(path: &str) -> SurfaceResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// True when the domain spans 360 degrees of longitude.
    pub fn is_periodic(&self) -> bool {
        self.geographic && (self.region.east - self.region.west - 360.0).abs() < 1e-9
    }

    /// Reject invalid settings before any iteration starts.
    pub fn validate(&self) -> SurfaceResult<()> {
        let r = &self.region;
        if !(r.east > r.west) || !(r.north > r.south) {
            return Err(SurfaceError::Config(format!(
                "degenerate region {}/{}/{}/{}",
                r.west, r.east, r.south, r.north
            )));
        }
        if self.spacing[0] <= 0.0 || self.spacing[1] <= 0.0 {
            return Err(SurfaceError::Config(format!(
                "increments must be positive, got {}/{}",
                self.spacing[0], self.spacing[1]
            )));
        }
        let t = self.solver.tension;
        for (name, value) in [("boundary", t.boundary), ("interior", t.interior)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SurfaceError::Config(format!(
                    "{name} tension must be in [0, 1], got {value}"
                )));
            }
        }
        if !(1.0..=2.0).contains(&self.solver.relaxation) {
            return Err(SurfaceError::Config(format!(
                "over-relaxation must be in [1, 2], got {}",
                self.solver.relaxation
            )));
        }
        if self.solver.max_iterations < 1 {
            return Err(SurfaceError::Config("max iterations must be nonzero".into()));
        }
        match self.solver.aspect {
            Aspect::Value(a) if a <= 0.0 => {
                return Err(SurfaceError::Config(format!(
                    "aspect ratio must be positive, got {a}"
                )));
            }
            Aspect::MidLatitude if !self.geographic => {
                return Err(SurfaceError::Config(
                    "mid-latitude aspect requires a geographic grid".into(),
                ));
            }
            _ => {}
        }
        match self.solver.convergence {
            Convergence::Value(v) | Convergence::Fraction(v) if v <= 0.0 => {
                return Err(SurfaceError::Config(format!(
                    "convergence limit must be positive, got {v}"
                )));
            }
            _ => {}
        }
        if self.solver.search_radius < 0.0 {
            return Err(SurfaceError::Config(format!(
                "search radius must be non-negative, got {}",
                self.solver.search_radius
            )));
        }
        Ok(())
    }

    /// Resolved aspect ratio for this domain.
    pub fn aspect_value(&self) -> f64 {
        match self.solver.aspect {
            Aspect::Value(a) => a,
            Aspect::MidLatitude => {
                (0.5 * (self.region.south + self.region.north)).to_radians().cos()
            }
        }
    }
}
