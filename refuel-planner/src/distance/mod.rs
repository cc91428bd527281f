//! Driving-distance provider.
//!
//! This module provides an HTTP client for a Distance Matrix style API,
//! which returns road distance and travel time between two places.
//!
//! Key characteristics:
//! - Each request covers a single origin/destination pair
//! - Endpoints are free-text addresses or `lat,lon` coordinates
//! - Distances arrive in metres and durations in seconds; both are
//!   converted to kilometres and minutes at the boundary

mod client;
mod error;
mod mock;
mod types;

pub use client::{DistanceClientConfig, DistanceMatrixClient, DistanceProvider};
pub use error::DistanceError;
pub use mock::MockDistanceClient;
pub use types::{
    AddressCheck, DistanceMatrixResponse, MatrixElement, MatrixRow, TextValue, Waypoint,
    parse_matrix_response,
};
