//! Planner error types.

use crate::distance::DistanceError;
use crate::domain::DomainError;
use crate::geocode::GeocodeError;
use crate::stations::StationError;

/// Hard failures while planning.
///
/// Not finding a route is not an error: searches report it as `None` and
/// trip planning as [`TripPlan::NoRoute`](super::TripPlan::NoRoute).
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Request parameters are unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Driving-distance lookup failed
    #[error("distance provider error: {0}")]
    Distance(#[from] DistanceError),

    /// Station dataset lookup failed
    #[error("station lookup error: {0}")]
    Stations(#[from] StationError),

    /// Address could not be geocoded
    #[error("geocoding error: {0}")]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A background scoring task panicked or was cancelled
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl PlanError {
    /// Whether the failure came from an external service rather than the
    /// request itself.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            PlanError::Distance(_) | PlanError::Stations(_) | PlanError::Geocode(_)
        )
    }
}
