//! Geocoder error types.

/// Errors from resolving an address to coordinates.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Address text was empty
    #[error("address is empty")]
    EmptyQuery,

    /// The geocoder found no match
    #[error("coordinates could not be retrieved for: {0}")]
    NotFound(String),

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },
}
