//! Station repository error types.

use crate::domain::StationId;

/// Errors that can occur when looking up stations.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// No station has this identifier
    #[error("station {0} not found")]
    NotFound(StationId),

    /// Search radius was negative or not a number
    #[error("invalid search radius: {0} km")]
    InvalidRadius(f64),

    /// Reading the station dataset failed
    #[error("station dataset I/O error: {message}")]
    Io { message: String },

    /// Station dataset could not be parsed
    #[error("station dataset parse error: {message}")]
    Json { message: String },

    /// Station dataset parsed but is inconsistent
    #[error("invalid station dataset: {message}")]
    Dataset { message: String },
}
