//! Error types for glyph scaling and interpolation.

use std::result;

/// Errors that can occur while scaling or interpolating glyphs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("invalid scale factors ({x}, {y}): must be finite and nonzero")]
    InvalidScale { x: f64, y: f64 },

    #[error("glyph not found: {0}")]
    GlyphNotFound(String),

    #[error("no masters supplied to the interpolation model")]
    EmptyDesignSpace,

    #[error("contour count mismatch in master {master}: expected {expected}, got {actual}")]
    ContourCountMismatch {
        master: usize,
        expected: usize,
        actual: usize,
    },

    #[error(
        "point count mismatch in master {master}, contour {contour}: expected {expected}, got {actual}"
    )]
    PointCountMismatch {
        master: usize,
        contour: usize,
        expected: usize,
        actual: usize,
    },

    #[error("component mismatch in master {master}: expected {expected}, got {actual}")]
    ComponentMismatch {
        master: usize,
        expected: String,
        actual: String,
    },
}

pub type Result<T> = result::Result<T, Error>;
