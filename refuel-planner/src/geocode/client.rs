//! Geocoder trait and the Nominatim HTTP client.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::domain::GeoPoint;

use super::error::GeocodeError;

/// Default base URL for the public Nominatim instance.
const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Nominatim's usage policy requires an identifying user agent.
const DEFAULT_USER_AGENT: &str = "refuel-planner";

/// Resolves free-text addresses to coordinates.
pub trait Geocoder {
    /// Coordinates of the best match for `text`.
    ///
    /// Fails with [`GeocodeError::NotFound`] when nothing matches.
    fn resolve_address(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<GeoPoint, GeocodeError>> + Send;
}

/// Configuration for the Nominatim geocoder.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GeocoderConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
        }
    }

    /// Set a custom base URL (for testing or a self-hosted instance).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One result of a Nominatim `/search` query.
#[derive(Debug, Clone, Deserialize)]
struct NominatimPlace {
    /// Nominatim sends coordinates as strings.
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Parse a Nominatim `/search?format=json` body and return the first match.
pub fn parse_search_response(query: &str, body: &str) -> Result<GeoPoint, GeocodeError> {
    let places: Vec<NominatimPlace> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Json {
            message: e.to_string(),
        })?;

    let place = places
        .first()
        .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;

    let parse = |field: &str, value: &str| {
        value.trim().parse::<f64>().map_err(|e| GeocodeError::Json {
            message: format!("invalid {field} {value:?}: {e}"),
        })
    };
    let lat = parse("lat", &place.lat)?;
    let lon = parse("lon", &place.lon)?;

    debug!(query, matched = place.display_name.as_deref().unwrap_or(""), lat, lon, "geocoded");

    GeoPoint::new(lat, lon).map_err(|e| GeocodeError::Json {
        message: e.to_string(),
    })
}

/// Geocoder backed by a Nominatim server.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    async fn resolve_address(&self, text: &str) -> Result<GeoPoint, GeocodeError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        let url = format!("{}/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        parse_search_response(query, &body)
    }
}

/// Geocoder with a fixed address table, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    places: HashMap<String, GeoPoint>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, address: impl Into<String>, point: GeoPoint) -> Self {
        self.places.insert(address.into(), point);
        self
    }
}

impl Geocoder for StaticGeocoder {
    async fn resolve_address(&self, text: &str) -> Result<GeoPoint, GeocodeError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }
        self.places
            .get(query)
            .copied()
            .ok_or_else(|| GeocodeError::NotFound(query.to_string()))
    }
}

/// Origin and destination of a trip, resolved to coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TripEndpoints {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub origin_label: String,
    pub destination_label: String,
}

impl TripEndpoints {
    /// Geocode both endpoints concurrently.
    pub async fn resolve<G: Geocoder>(
        geocoder: &G,
        origin_text: &str,
        destination_text: &str,
    ) -> Result<Self, GeocodeError> {
        let (origin, destination) = futures::try_join!(
            geocoder.resolve_address(origin_text),
            geocoder.resolve_address(destination_text),
        )?;

        Ok(Self {
            origin,
            destination,
            origin_label: origin_text.trim().to_string(),
            destination_label: destination_text.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn parses_first_match() {
        let body = r#"[
            {"place_id": 1, "lat": "52.2319581", "lon": "21.0067249",
             "display_name": "Warszawa, Polska"},
            {"place_id": 2, "lat": "0", "lon": "0"}
        ]"#;
        let point = parse_search_response("Warsaw", body).unwrap();
        assert_eq!(point, p(52.2319581, 21.0067249));
    }

    #[test]
    fn empty_result_is_not_found() {
        let err = parse_search_response("Atlantis", "[]").unwrap_err();
        assert!(matches!(err, GeocodeError::NotFound(q) if q == "Atlantis"));
    }

    #[test]
    fn bad_coordinates_are_json_errors() {
        let err = parse_search_response("x", r#"[{"lat": "north", "lon": "1"}]"#).unwrap_err();
        assert!(matches!(err, GeocodeError::Json { .. }));

        let err = parse_search_response("x", r#"[{"lat": "100", "lon": "1"}]"#).unwrap_err();
        assert!(matches!(err, GeocodeError::Json { .. }));
    }

    #[test]
    fn default_config() {
        let config = GeocoderConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.user_agent, "refuel-planner");
        assert_eq!(config.timeout_secs, 10);
    }

    #[tokio::test]
    async fn resolves_trip_endpoints() {
        let geocoder = StaticGeocoder::new()
            .with_place("Warsaw", p(52.23, 21.01))
            .with_place("Krakow", p(50.06, 19.94));

        let trip = TripEndpoints::resolve(&geocoder, " Warsaw ", "Krakow").await.unwrap();
        assert_eq!(trip.origin, p(52.23, 21.01));
        assert_eq!(trip.destination, p(50.06, 19.94));
        assert_eq!(trip.origin_label, "Warsaw");
    }

    #[tokio::test]
    async fn unknown_or_empty_endpoint_fails() {
        let geocoder = StaticGeocoder::new().with_place("Warsaw", p(52.23, 21.01));

        let err = TripEndpoints::resolve(&geocoder, "Warsaw", "Atlantis").await.unwrap_err();
        assert!(matches!(err, GeocodeError::NotFound(_)));

        let err = TripEndpoints::resolve(&geocoder, "", "Warsaw").await.unwrap_err();
        assert!(matches!(err, GeocodeError::EmptyQuery));
    }

    #[tokio::test]
    async fn nominatim_rejects_empty_query_without_network() {
        let geocoder = NominatimGeocoder::new(GeocoderConfig::new()).unwrap();
        let err = geocoder.resolve_address("   ").await.unwrap_err();
        assert!(matches!(err, GeocodeError::EmptyQuery));
    }
}
