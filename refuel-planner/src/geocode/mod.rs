//! Address geocoding.
//!
//! Trip endpoints are entered as free text. They are resolved to
//! coordinates once, up front; the planner itself works on coordinates and
//! only passes the text labels through to the distance provider.

mod client;
mod error;

pub use client::{
    Geocoder, GeocoderConfig, NominatimGeocoder, StaticGeocoder, TripEndpoints,
    parse_search_response,
};
pub use error::GeocodeError;
