//! Domain types for the refuelling route planner.
//!
//! Values here enforce their invariants at construction time, so planner
//! code receiving them can trust their validity.

mod error;
mod point;
mod route;
mod station;
mod vehicle;

pub use error::DomainError;
pub use point::{GeoPoint, InvalidGeoPoint};
pub use route::{CandidateRoute, SegmentMetrics, ValidatedRoute};
pub use station::{Station, StationId, StationLocation};
pub use vehicle::{DrivingConditions, Vehicle, optimal_from_reported, reported_from_optimal};
