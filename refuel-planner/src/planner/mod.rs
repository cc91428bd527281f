//! Refuelling route planning.
//!
//! A trip is planned in stages: the corridor search proposes candidate
//! stop sequences from straight-line distances, the selector measures their
//! legs on the road network and validates them against the fuel model, and
//! the trip planner retries with shrinking ranges until a route is found or
//! the attempts run out.

mod config;
mod corridor;
mod error;
mod segments;
mod select;
mod trip;
mod validate;

pub use config::PlannerConfig;
pub use corridor::{CorridorQuery, plan_refuel_stops};
pub use error::PlanError;
pub use segments::{Leg, RouteDistances, RouteEnds, route_legs};
pub use select::{
    MemoLookup, PrefixMemo, Selection, efficiency_improvement, route_fuel_litres,
    select_best_routes,
};
pub use trip::{RangeEstimate, RefuelWindow, TripPlan, TripRequest, estimate_ranges, plan_trip};
pub use validate::{FuelParams, Validation, validate, validate_segments};
