use std::time::Duration;
use thiserror::Error;

/// Failure of a single call into a places provider.
#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("place not found: {0}")]
    NotFound(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("places request failed: {0}")]
    Request(String),
}

/// A branch of a discovery run that did not produce a usable result.
///
/// These are collected into the run report instead of failing the batch.
#[derive(Debug, Error)]
pub enum CandidateFailure {
    #[error("autocomplete for {query:?} failed: {source}")]
    Autocomplete {
        query: String,
        #[source]
        source: PlacesError,
    },

    #[error("details for place {place_id} failed: {source}")]
    DetailFetch {
        place_id: String,
        #[source]
        source: PlacesError,
    },

    #[error("photo for place {place_id} failed, placeholder used: {source}")]
    PhotoFetch {
        place_id: String,
        #[source]
        source: PlacesError,
    },

    #[error("discovery branch aborted: {0}")]
    Aborted(String),
}

impl CandidateFailure {
    /// Whether the affected place is missing from the output.
    pub fn drops_candidate(&self) -> bool {
        !matches!(self, Self::PhotoFetch { .. })
    }
}

/// Hard failure of a whole discovery run, raised before any branch is issued.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}
