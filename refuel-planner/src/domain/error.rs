//! Domain error types.
//!
//! These errors represent invalid values in the domain layer. They are
//! distinct from provider/IO errors.

/// Domain-level validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Segment distance or duration is negative or not finite
    #[error("invalid segment: {0}")]
    InvalidSegment(&'static str),

    /// Validated route built with the wrong number of leg metrics
    #[error("route has {expected} legs but {actual} metrics were given")]
    SegmentCountMismatch { expected: usize, actual: usize },

    /// Vehicle parameters out of range
    #[error("invalid vehicle: {0}")]
    InvalidVehicle(&'static str),
}
