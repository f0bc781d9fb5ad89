//! Error types for irrigis

use thiserror::Error;

/// Main error type for irrigis operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error("Unknown sensor '{0}' (expected 'landsat' or 'sentinel')")]
    UnknownSensor(String),

    #[error("Unknown season '{0}' (expected 'summer' or 'winter')")]
    UnknownSeason(String),

    #[error("Unknown band name '{0}'")]
    UnknownBand(String),

    #[error("Band '{0}' is not present in the composite")]
    MissingBand(String),

    #[error("Feature schema mismatch: trained on [{expected}], got [{actual}]")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error comes from bad configuration rather than data or I/O.
    ///
    /// Configuration errors are never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownSensor(_)
                | Error::UnknownSeason(_)
                | Error::UnknownBand(_)
                | Error::MissingBand(_)
                | Error::SchemaMismatch { .. }
                | Error::InvalidParameter { .. }
        )
    }
}

/// Result type alias for irrigis operations
pub type Result<T> = std::result::Result<T, Error>;
