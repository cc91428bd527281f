//! Distance Matrix API response DTOs and endpoint types.
//!
//! The response types map directly to the Distance Matrix JSON. Fields the
//! API omits on failure (`distance`, `duration`, address lists) are optional
//! or defaulted.

use std::fmt;

use serde::Deserialize;

use crate::domain::{GeoPoint, SegmentMetrics};

use super::error::DistanceError;

/// One end of a driving leg, as sent to the provider.
///
/// Addresses are preferred when known since the provider attributes them to
/// a named place; coordinates are used for stations and unlabeled points.
#[derive(Debug, Clone, PartialEq)]
pub enum Waypoint {
    Address(String),
    Coordinates(GeoPoint),
}

impl Waypoint {
    /// Use `label` when present, otherwise the coordinates.
    pub fn labelled_or(label: Option<&str>, point: GeoPoint) -> Self {
        match label {
            Some(text) if !text.trim().is_empty() => Waypoint::Address(text.to_string()),
            _ => Waypoint::Coordinates(point),
        }
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waypoint::Address(text) => f.write_str(text),
            Waypoint::Coordinates(point) => write!(f, "{point}"),
        }
    }
}

impl From<GeoPoint> for Waypoint {
    fn from(point: GeoPoint) -> Self {
        Waypoint::Coordinates(point)
    }
}

/// Top-level Distance Matrix response.
#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixResponse {
    /// Request-level status ("OK", "REQUEST_DENIED", ...).
    pub status: String,

    pub error_message: Option<String>,

    /// Addresses as the provider resolved them. Empty strings mean the
    /// corresponding input could not be resolved.
    #[serde(default)]
    pub origin_addresses: Vec<String>,

    #[serde(default)]
    pub destination_addresses: Vec<String>,

    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixRow {
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

/// A single origin/destination pair result.
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixElement {
    /// Element-level status ("OK", "NOT_FOUND", "ZERO_RESULTS", ...).
    pub status: String,
    pub distance: Option<TextValue>,
    pub duration: Option<TextValue>,
}

/// A human-readable text plus its numeric value (metres or seconds).
#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    #[serde(default)]
    pub text: String,
    pub value: f64,
}

/// Result of checking a pair of addresses with the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressCheck {
    pub metrics: SegmentMetrics,

    /// Origin as the provider resolved it.
    pub origin_address: Option<String>,

    /// Destination as the provider resolved it.
    pub destination_address: Option<String>,
}

fn non_empty(list: &[String]) -> Option<&str> {
    list.first().map(String::as_str).filter(|s| !s.trim().is_empty())
}

impl DistanceMatrixResponse {
    pub fn corrected_origin(&self) -> Option<&str> {
        non_empty(&self.origin_addresses)
    }

    pub fn corrected_destination(&self) -> Option<&str> {
        non_empty(&self.destination_addresses)
    }

    fn first_element(&self) -> Option<&MatrixElement> {
        self.rows.first().and_then(|row| row.elements.first())
    }

    /// Extract the metrics of the single origin/destination pair.
    ///
    /// Metres and seconds are converted to kilometres and minutes.
    pub fn metrics(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<SegmentMetrics, DistanceError> {
        let message = || self.error_message.clone().unwrap_or_default();

        match self.status.as_str() {
            "OK" => {}
            "REQUEST_DENIED" => return Err(DistanceError::Unauthorized),
            "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(DistanceError::RateLimited),
            "INVALID_REQUEST" | "MAX_ELEMENTS_EXCEEDED" | "MAX_DIMENSIONS_EXCEEDED" => {
                return Err(DistanceError::InvalidInput(format!(
                    "{} ({origin} -> {destination}): {}",
                    self.status,
                    message()
                )));
            }
            other => {
                return Err(DistanceError::Api {
                    status: other.to_string(),
                    message: message(),
                });
            }
        }

        let element = self.first_element().ok_or_else(|| DistanceError::Api {
            status: self.status.clone(),
            message: "response contained no elements".to_string(),
        })?;

        match element.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" | "MAX_ROUTE_LENGTH_EXCEEDED" => {
                return Err(DistanceError::RouteUnavailable {
                    origin: origin.to_string(),
                    destination: destination.to_string(),
                });
            }
            "NOT_FOUND" => {
                return Err(DistanceError::InvalidInput(format!(
                    "could not resolve {origin} or {destination}"
                )));
            }
            other => {
                return Err(DistanceError::Api {
                    status: other.to_string(),
                    message: message(),
                });
            }
        }

        let (Some(distance), Some(duration)) = (&element.distance, &element.duration) else {
            return Err(DistanceError::Json {
                message: "element is OK but has no distance or duration".to_string(),
                body: None,
            });
        };

        SegmentMetrics::new(distance.value / 1000.0, duration.value / 60.0).map_err(|e| {
            DistanceError::Api {
                status: element.status.clone(),
                message: e.to_string(),
            }
        })
    }

    /// Like [`metrics`](Self::metrics) but also reports the resolved
    /// addresses, and names the unresolvable one when the lookup fails.
    pub fn address_check(&self, origin: &str, destination: &str) -> Result<AddressCheck, DistanceError> {
        let from = Waypoint::Address(origin.to_string());
        let to = Waypoint::Address(destination.to_string());

        match self.metrics(&from, &to) {
            Ok(metrics) => Ok(AddressCheck {
                metrics,
                origin_address: self.corrected_origin().map(str::to_string),
                destination_address: self.corrected_destination().map(str::to_string),
            }),
            Err(e @ (DistanceError::Unauthorized | DistanceError::RateLimited)) => Err(e),
            Err(e) => match (self.corrected_origin(), self.corrected_destination()) {
                (None, None) => Err(DistanceError::InvalidInput(
                    "both origin and destination addresses are invalid".to_string(),
                )),
                (None, Some(_)) => Err(DistanceError::InvalidInput(
                    "origin address is invalid".to_string(),
                )),
                (Some(_), None) => Err(DistanceError::InvalidInput(
                    "destination address is invalid".to_string(),
                )),
                (Some(_), Some(_)) => Err(e),
            },
        }
    }
}

/// Parse a raw response body.
pub fn parse_matrix_response(body: &str) -> Result<DistanceMatrixResponse, DistanceError> {
    serde_json::from_str(body).map_err(|e| DistanceError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(500).collect()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_BODY: &str = r#"{
        "destination_addresses": ["Krakow, Poland"],
        "origin_addresses": ["Warsaw, Poland"],
        "rows": [{
            "elements": [{
                "distance": {"text": "294 km", "value": 294300},
                "duration": {"text": "3 hours 6 mins", "value": 11160},
                "status": "OK"
            }]
        }],
        "status": "OK"
    }"#;

    fn addr(s: &str) -> Waypoint {
        Waypoint::Address(s.to_string())
    }

    #[test]
    fn parses_ok_response() {
        let resp = parse_matrix_response(OK_BODY).unwrap();
        let metrics = resp.metrics(&addr("Warsaw"), &addr("Krakow")).unwrap();

        assert!((metrics.distance_km - 294.3).abs() < 1e-9);
        assert!((metrics.duration_min - 186.0).abs() < 1e-9);
        assert_eq!(resp.corrected_origin(), Some("Warsaw, Poland"));
    }

    #[test]
    fn zero_results_is_route_unavailable() {
        let body = r#"{
            "destination_addresses": ["Reykjavik, Iceland"],
            "origin_addresses": ["Gdansk, Poland"],
            "rows": [{"elements": [{"status": "ZERO_RESULTS"}]}],
            "status": "OK"
        }"#;
        let resp = parse_matrix_response(body).unwrap();
        let err = resp.metrics(&addr("Gdansk"), &addr("Reykjavik")).unwrap_err();

        assert!(matches!(err, DistanceError::RouteUnavailable { .. }));
    }

    #[test]
    fn not_found_is_invalid_input() {
        let body = r#"{
            "destination_addresses": [""],
            "origin_addresses": ["Warsaw, Poland"],
            "rows": [{"elements": [{"status": "NOT_FOUND"}]}],
            "status": "OK"
        }"#;
        let resp = parse_matrix_response(body).unwrap();
        let err = resp.metrics(&addr("Warsaw"), &addr("zzzz")).unwrap_err();
        assert!(matches!(err, DistanceError::InvalidInput(_)));
    }

    #[test]
    fn request_level_statuses() {
        let denied = r#"{"status": "REQUEST_DENIED", "error_message": "bad key", "rows": []}"#;
        let resp = parse_matrix_response(denied).unwrap();
        assert!(matches!(
            resp.metrics(&addr("a"), &addr("b")),
            Err(DistanceError::Unauthorized)
        ));

        let limited = r#"{"status": "OVER_QUERY_LIMIT", "rows": []}"#;
        let resp = parse_matrix_response(limited).unwrap();
        assert!(matches!(
            resp.metrics(&addr("a"), &addr("b")),
            Err(DistanceError::RateLimited)
        ));
    }

    #[test]
    fn address_check_names_invalid_side() {
        let body = r#"{
            "destination_addresses": [""],
            "origin_addresses": ["Warsaw, Poland"],
            "rows": [{"elements": [{"status": "NOT_FOUND"}]}],
            "status": "OK"
        }"#;
        let resp = parse_matrix_response(body).unwrap();
        let err = resp.address_check("Warsaw", "zzzz").unwrap_err();
        assert_eq!(err.to_string(), "invalid input: destination address is invalid");
    }

    #[test]
    fn address_check_returns_corrected_addresses() {
        let resp = parse_matrix_response(OK_BODY).unwrap();
        let check = resp.address_check("warsaw", "krakow").unwrap();
        assert_eq!(check.origin_address.as_deref(), Some("Warsaw, Poland"));
        assert_eq!(check.destination_address.as_deref(), Some("Krakow, Poland"));
    }

    #[test]
    fn malformed_body_is_json_error() {
        let err = parse_matrix_response("<html>").unwrap_err();
        assert!(matches!(err, DistanceError::Json { body: Some(_), .. }));
    }

    #[test]
    fn waypoint_display() {
        let p = GeoPoint::new(52.5, 13.25).unwrap();
        assert_eq!(Waypoint::from(p).to_string(), "52.5,13.25");
        assert_eq!(addr("Berlin").to_string(), "Berlin");
        assert_eq!(
            Waypoint::labelled_or(Some("  "), p),
            Waypoint::Coordinates(p)
        );
    }
}
