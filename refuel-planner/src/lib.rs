//! Refuelling route planner.
//!
//! Given a trip and a vehicle's fuel state, finds which fuel stations to
//! stop at so the vehicle never drops below a safety reserve, and picks
//! the fastest and the most fuel-efficient of the feasible routes.

pub mod cache;
pub mod distance;
pub mod domain;
pub mod fuel;
pub mod geo;
pub mod geocode;
pub mod planner;
pub mod stations;
pub mod telemetry;
