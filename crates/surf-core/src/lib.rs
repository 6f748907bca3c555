//! Gridding of scattered (x, y, z) data with continuous-curvature splines
//! in tension.
//!
//! The engine fits a surface minimizing a blend of squared curvature and
//! squared gradient, controlled by a tension factor in [0, 1], using
//! Gauss-Seidel relaxation with over-relaxation inside a multigrid stride
//! progression. See Smith & Wessel (Geophysics, 55, 293-305, 1990).

pub mod breakline;
pub mod constraint;
pub mod data;
pub mod engine;
pub mod forecast;
pub mod limits;
pub mod relax;

pub use engine::SurfaceEngine;
