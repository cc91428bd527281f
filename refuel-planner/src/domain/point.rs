//! Geographic point type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when constructing a point from invalid coordinates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinates ({lat}, {lon}): {reason}")]
pub struct InvalidGeoPoint {
    lat: f64,
    lon: f64,
    reason: &'static str,
}

/// A latitude/longitude pair in degrees.
///
/// Coordinates are finite, latitude lies in `[-90, 90]` and longitude in
/// `[-180, 180]`. Any `GeoPoint` value is valid by construction.
///
/// # Examples
///
/// ```
/// use refuel_planner::domain::GeoPoint;
///
/// let warsaw = GeoPoint::new(52.2297, 21.0122).unwrap();
/// assert_eq!(warsaw.lat(), 52.2297);
///
/// assert!(GeoPoint::new(91.0, 0.0).is_err());
/// assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint", into = "RawPoint")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Create a point, validating the coordinate ranges.
    pub fn new(lat: f64, lon: f64) -> Result<Self, InvalidGeoPoint> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(InvalidGeoPoint {
                lat,
                lon,
                reason: "coordinates must be finite",
            });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidGeoPoint {
                lat,
                lon,
                reason: "latitude must be within [-90, 90]",
            });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(InvalidGeoPoint {
                lat,
                lon,
                reason: "longitude must be within [-180, 180]",
            });
        }
        Ok(Self { lat, lon })
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Debug for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeoPoint({}, {})", self.lat, self.lon)
    }
}

/// Formats as `"lat,lon"`, the form driving-distance APIs accept.
impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

#[derive(Serialize, Deserialize)]
struct RawPoint {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = InvalidGeoPoint;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.lat, raw.lon)
    }
}

impl From<GeoPoint> for RawPoint {
    fn from(point: GeoPoint) -> Self {
        RawPoint {
            lat: point.lat,
            lon: point.lon,
        }
    }
}
