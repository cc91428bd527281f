//! Distance Matrix HTTP client.
//!
//! Queries a single origin/destination pair per request. Handles
//! authentication via the `key` query parameter and bounds concurrency with
//! a semaphore so parallel segment lookups don't trip the provider's rate
//! limit.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::domain::SegmentMetrics;

use super::error::DistanceError;
use super::types::{AddressCheck, DistanceMatrixResponse, Waypoint, parse_matrix_response};

/// Default base URL for the Distance Matrix API.
const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Source of road distances between two waypoints.
///
/// This abstraction allows the planner to be tested without network access.
pub trait DistanceProvider {
    /// Driving distance and duration from `origin` to `destination`.
    fn driving_distance(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> impl Future<Output = Result<SegmentMetrics, DistanceError>> + Send;
}

/// Configuration for the distance client.
#[derive(Debug, Clone)]
pub struct DistanceClientConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL for the API (defaults to the production endpoint)
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl DistanceClientConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Distance Matrix API client.
#[derive(Debug, Clone)]
pub struct DistanceMatrixClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    semaphore: Arc<Semaphore>,
}

impl DistanceMatrixClient {
    /// Create a new client with the given configuration.
    pub fn new(config: DistanceClientConfig) -> Result<Self, DistanceError> {
        if config.api_key.trim().is_empty() {
            return Err(DistanceError::NotConfigured(
                "distance API key is empty".to_string(),
            ));
        }
        if config.max_concurrent == 0 {
            return Err(DistanceError::NotConfigured(
                "max_concurrent must be at least 1".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    async fn fetch(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<DistanceMatrixResponse, DistanceError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| DistanceError::Api {
                status: "CLIENT".to_string(),
                message: "semaphore closed".to_string(),
            })?;

        let url = format!("{}/json", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("origins", origin.to_string()),
                ("destinations", destination.to_string()),
                ("mode", "driving".to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DistanceError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DistanceError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DistanceError::Api {
                status: status.as_u16().to_string(),
                message: body,
            });
        }

        let body = response.text().await?;
        parse_matrix_response(&body)
    }

    /// Check that both addresses resolve and are connected by road.
    ///
    /// Returns the driving metrics and the addresses as the provider
    /// corrected them.
    pub async fn validate_addresses(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<AddressCheck, DistanceError> {
        let response = self
            .fetch(
                &Waypoint::Address(origin.to_string()),
                &Waypoint::Address(destination.to_string()),
            )
            .await?;
        response.address_check(origin, destination)
    }
}

impl DistanceProvider for DistanceMatrixClient {
    async fn driving_distance(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<SegmentMetrics, DistanceError> {
        let result = self
            .fetch(origin, destination)
            .await
            .and_then(|response| response.metrics(origin, destination));

        match &result {
            Ok(metrics) => debug!(
                %origin,
                %destination,
                distance_km = metrics.distance_km,
                duration_min = metrics.duration_min,
                "distance lookup"
            ),
            Err(e) => warn!(%origin, %destination, error = %e, "distance lookup failed"),
        }

        result
    }
}
