//! Driving-distance client error types.

/// Errors from a driving-distance provider.
#[derive(Debug, thiserror::Error)]
pub enum DistanceError {
    /// HTTP request failed (network error, connection reset, etc.)
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Request did not complete within the configured timeout
    #[error("distance request timed out")]
    Timeout,

    /// Response body was not the expected JSON
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Provider returned a status we don't map to a specific variant
    #[error("API error {status}: {message}")]
    Api { status: String, message: String },

    /// No driving route exists between the endpoints
    #[error("no driving route between {origin} and {destination}")]
    RouteUnavailable { origin: String, destination: String },

    /// An endpoint could not be resolved to a place
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Rate limited by the API
    #[error("rate limited by distance API")]
    RateLimited,

    /// Invalid API key or unauthorized
    #[error("unauthorized (invalid API key)")]
    Unauthorized,

    /// Client is missing required configuration
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for DistanceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DistanceError::Timeout
        } else {
            DistanceError::Http(err)
        }
    }
}

impl DistanceError {
    /// Whether retrying the same request later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DistanceError::Http(_) | DistanceError::Timeout | DistanceError::RateLimited
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DistanceError::RouteUnavailable {
            origin: "Gdansk".into(),
            destination: "Reykjavik".into(),
        };
        assert_eq!(
            err.to_string(),
            "no driving route between Gdansk and Reykjavik"
        );

        let err = DistanceError::Api {
            status: "UNKNOWN_ERROR".into(),
            message: "try again".into(),
        };
        assert_eq!(err.to_string(), "API error UNKNOWN_ERROR: try again");
    }

    #[test]
    fn transient_errors() {
        assert!(DistanceError::Timeout.is_transient());
        assert!(DistanceError::RateLimited.is_transient());
        assert!(!DistanceError::Unauthorized.is_transient());
        assert!(!DistanceError::InvalidInput("x".into()).is_transient());
    }
}
