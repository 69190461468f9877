//! Request and result types for the Alphavantage adapter
//!
//! # Design Principles
//! 1. One call in, one `ResultRecord` out - success and failure share a shape
//! 2. Provider payloads stay `serde_json::Value` - field sets differ per
//!    function and Alphavantage adds fields without notice
//! 3. Unrecognized request parameters pass through via `#[serde(flatten)]`
//!    rather than being rejected
//!
//! # Source
//! - Query parameters: https://www.alphavantage.co/documentation/

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Categories
// ============================================================================

/// Data categories served by the adapter. Each maps to one `function` query
/// value on the shared endpoint.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Overview,
    GlobalQuote,
    StockPrice,
    Earnings,
    CashFlow,
    IncomeStatement,
}

impl Category {
    /// The `function` query value for this category.
    /// Source: https://www.alphavantage.co/documentation/
    pub const fn function(self) -> &'static str {
        match self {
            Self::Overview => "OVERVIEW",
            Self::GlobalQuote => "GLOBAL_QUOTE",
            Self::StockPrice => "TIME_SERIES_DAILY",
            Self::Earnings => "EARNINGS",
            Self::CashFlow => "CASH_FLOW",
            Self::IncomeStatement => "INCOME_STATEMENT",
        }
    }

    /// Stable lowercase tag used in reports and CLI output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::GlobalQuote => "global_quote",
            Self::StockPrice => "stock_price",
            Self::Earnings => "earnings",
            Self::CashFlow => "cash_flow",
            Self::IncomeStatement => "income_statement",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Request
// ============================================================================

/// Caller-supplied parameter bundle for one API call.
///
/// `symbol` is required by every operation. `api_key` overrides both the
/// client default and the profile file for this call only. Any other entry
/// (`interval`, `outputsize`, ...) is appended to the query string verbatim.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestEvent {
    /// Ticker symbol, e.g. "TSLA"
    pub symbol: String,

    /// Per-call API key override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Extra query parameters passed through to the provider
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl RequestEvent {
    /// Create a request for the given symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            api_key: None,
            extra: BTreeMap::new(),
        }
    }

    /// Attach a per-call API key override.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Attach an extra query parameter, e.g. `outputsize=full`.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

// ============================================================================
// Result
// ============================================================================

/// Failure class recorded in a `ResultRecord`.
///
/// `Provider` covers non-2xx statuses, in-body error messages, and malformed
/// JSON. `Transport` covers timeouts and connection failures. Both are
/// recovered locally so batch aggregation continues.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Provider,
    Transport,
}

/// Normalized outcome of one API call, tagged by data category.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Which data category was requested
    pub category: Category,

    /// Symbol the call was made for
    pub symbol: String,

    /// Whether the call produced a usable payload
    pub ok: bool,

    /// HTTP status, when a response was received at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Failure class, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,

    /// Diagnostic message, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Set when the provider answered with a free-tier throttling note
    pub limit_reached: bool,

    /// Normalized provider payload (empty object on failure)
    pub payload: Value,
}

impl ResultRecord {
    /// Successful call with a normalized payload.
    pub fn success(
        category: Category,
        symbol: impl Into<String>,
        status_code: u16,
        payload: Value,
    ) -> Self {
        Self {
            category,
            symbol: symbol.into(),
            ok: true,
            status_code: Some(status_code),
            failure: None,
            error_message: None,
            limit_reached: false,
            payload,
        }
    }

    /// Provider-level failure: non-2xx, in-body error, or unparseable body.
    pub fn provider_failure(
        category: Category,
        symbol: impl Into<String>,
        status_code: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            symbol: symbol.into(),
            ok: false,
            status_code,
            failure: Some(FailureKind::Provider),
            error_message: Some(message.into()),
            limit_reached: false,
            payload: Value::Object(Default::default()),
        }
    }

    /// Transport-level failure: timeout or connection error, no response.
    pub fn transport_failure(
        category: Category,
        symbol: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            symbol: symbol.into(),
            ok: false,
            status_code: None,
            failure: Some(FailureKind::Transport),
            error_message: Some(message.into()),
            limit_reached: false,
            payload: Value::Object(Default::default()),
        }
    }

    /// Provider answered 200 but the body only carried a throttling note.
    pub fn rate_limited(
        category: Category,
        symbol: impl Into<String>,
        status_code: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            limit_reached: true,
            ..Self::provider_failure(category, symbol, Some(status_code), message)
        }
    }

    /// Look up a top-level payload field.
    pub fn payload_field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

// ============================================================================
// Aggregated report
// ============================================================================

/// Combined multi-category report for one symbol.
///
/// Records are collected independently; a failed category appears as a
/// failure-tagged record next to successful ones.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FundamentalsReport {
    pub symbol: String,
    pub as_of: DateTime<Utc>,
    pub records: Vec<ResultRecord>,
}

impl FundamentalsReport {
    pub fn new(symbol: impl Into<String>, records: Vec<ResultRecord>) -> Self {
        Self {
            symbol: symbol.into(),
            as_of: Utc::now(),
            records,
        }
    }

    /// Record for a single category, if it was part of this report.
    pub fn get(&self, category: Category) -> Option<&ResultRecord> {
        self.records.iter().find(|r| r.category == category)
    }

    /// Number of categories that produced a usable payload.
    pub fn ok_count(&self) -> usize {
        self.records.iter().filter(|r| r.ok).count()
    }

    /// Categories that failed, with their diagnostic messages.
    pub fn failed(&self) -> Vec<(Category, &str)> {
        self.records
            .iter()
            .filter(|r| !r.ok)
            .map(|r| (r.category, r.error_message.as_deref().unwrap_or("")))
            .collect()
    }
}
