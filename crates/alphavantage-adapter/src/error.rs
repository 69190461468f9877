//! Error types for the Alphavantage adapter
//!
//! Only pre-network conditions surface as errors: a missing API key or a
//! malformed request. Provider and transport failures are recorded inside
//! the returned `ResultRecord` instead, so one category failing never aborts
//! a multi-category report.

use thiserror::Error;

/// Errors surfaced to the caller before any network activity.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No key in the request, client configuration, or profile file.
    #[error(
        "no API key found: set one on the request event, the client, or in \
         ~/.alphavantage under [access] api_key"
    )]
    MissingCredentials,

    /// Malformed input, e.g. an empty symbol.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}
