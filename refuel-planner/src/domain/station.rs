//! Fuel station types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// Identifier of a fuel station in the station dataset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u64);

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A station as returned by radius queries: just its identity and position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationLocation {
    pub id: StationId,
    pub location: GeoPoint,
}

impl StationLocation {
    pub fn new(id: StationId, location: GeoPoint) -> Self {
        Self { id, location }
    }
}

/// A fuel station with its brand and price reference.
///
/// Stations are read-only here; the dataset is maintained by external
/// price-scraping jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub location: GeoPoint,

    /// Display name, if known.
    #[serde(default)]
    pub name: Option<String>,

    /// Brand the station trades under.
    #[serde(default)]
    pub brand: Option<String>,

    /// Last scraped price per litre.
    #[serde(default)]
    pub price_per_litre: Option<f64>,

    /// ISO currency code for `price_per_litre`.
    #[serde(default)]
    pub currency: Option<String>,
}

impl Station {
    /// Create a station with no brand or price information.
    pub fn new(id: StationId, location: GeoPoint) -> Self {
        Self {
            id,
            location,
            name: None,
            brand: None,
            price_per_litre: None,
            currency: None,
        }
    }

    /// Set the brand.
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Set the price per litre and its currency.
    pub fn with_price(mut self, price_per_litre: f64, currency: impl Into<String>) -> Self {
        self.price_per_litre = Some(price_per_litre);
        self.currency = Some(currency.into());
        self
    }

    /// The identity/position pair used by corridor search.
    pub fn as_location(&self) -> StationLocation {
        StationLocation::new(self.id, self.location)
    }
}
