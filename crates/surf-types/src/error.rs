// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Error
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No data points inside the grid region")]
    EmptyInput,

    #[error("Grid must have at least 4 nodes per side (got {n_columns} x {n_rows})")]
    Degenerate { n_columns: usize, n_rows: usize },

    #[error("{which} limit grid is {got_columns} x {got_rows}, expected {want_columns} x {want_rows}")]
    LimitShapeMismatch {
        which: &'static str,
        got_columns: usize,
        got_rows: usize,
        want_columns: usize,
        want_rows: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;
