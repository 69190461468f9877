//! Alphavantage Adapter
//!
//! Thin client for the Alphavantage financial-data API:
//! - `AvClient`: one async operation per data category (company overview,
//!   daily prices, earnings, cash flow, income statement, global quote)
//! - `CredentialResolver`: ordered API-key lookup (request > client > profile)
//! - `ResultRecord`: normalized, category-tagged success/failure value
//!
//! Every operation is a single request/response round trip. Provider and
//! transport failures are captured inside the returned `ResultRecord` so a
//! caller aggregating many categories into one report is never aborted by a
//! single category.
//!
//! # Official Documentation
//! - Endpoints: https://www.alphavantage.co/documentation/
//! - Fundamentals: https://www.alphavantage.co/documentation/#fundamentals
//! - Time series: https://www.alphavantage.co/documentation/#time-series-data

pub mod client;
pub mod credentials;
pub mod error;
mod normalize;
pub mod types;

pub use client::AvClient;
pub use credentials::CredentialResolver;
pub use error::AdapterError;
pub use types::*;

/// Official query endpoint; every function is selected via query parameters.
/// Source: https://www.alphavantage.co/documentation/
pub const QUERY_API_BASE: &str = "https://www.alphavantage.co/query";

/// Profile file name looked up under the user's home directory.
/// Format: INI-style, section `[access]`, key `api_key`.
pub const PROFILE_FILE_NAME: &str = ".alphavantage";

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
