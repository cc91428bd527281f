//! Fuel station lookup.
//!
//! The planner only needs two queries from the station dataset: which
//! stations lie within a radius of a point, and a station's details by id.
//! The dataset itself is produced by external price-scraping jobs and
//! loaded here from a JSON snapshot.

mod error;
mod repository;

pub use error::StationError;
pub use repository::{InMemoryStationRepository, StationRepository};
