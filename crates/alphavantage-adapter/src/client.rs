//! Alphavantage REST client
//!
//! Single endpoint, one `function` query value per data category:
//! - GET ?function=OVERVIEW - company overview
//! - GET ?function=TIME_SERIES_DAILY - daily price series
//! - GET ?function=GLOBAL_QUOTE - latest quote snapshot
//! - GET ?function=EARNINGS / CASH_FLOW / INCOME_STATEMENT - statements
//!
//! Every operation resolves credentials fresh, issues exactly one GET with a
//! bounded timeout, and returns one `ResultRecord`. Provider and transport
//! failures come back inside the record, never as `Err` - only a missing key
//! or a malformed request errors, and both before any network activity.
//!
//! # Source
//! - https://www.alphavantage.co/documentation/

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::credentials::CredentialResolver;
use crate::error::AdapterError;
use crate::normalize;
use crate::types::{Category, FundamentalsReport, RequestEvent, ResultRecord};
use crate::QUERY_API_BASE;

/// Bounded per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap on response excerpts carried in diagnostic messages.
const DIAGNOSTIC_EXCERPT_CHARS: usize = 200;

/// Alphavantage API client.
///
/// Carries only immutable configuration: the HTTP client, base URL, optional
/// default API key, and the credential resolver. Cloning is cheap and
/// concurrent use is safe - no state is shared across calls.
#[derive(Clone)]
pub struct AvClient {
    client: Client,
    base_url: String,
    default_key: Option<String>,
    credentials: CredentialResolver,
}

impl AvClient {
    /// Create a client against the official endpoint.
    pub fn new() -> Result<Self, AdapterError> {
        Self::with_base_url(QUERY_API_BASE)
    }

    /// Create a client against a custom base URL (tests, proxies).
    pub fn with_base_url(base_url: &str) -> Result<Self, AdapterError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_key: None,
            credentials: CredentialResolver::new(),
        })
    }

    /// Set the client-level default API key (second credential source).
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.default_key = Some(api_key.into());
        self
    }

    /// Replace the credential resolver, e.g. to point at a specific profile
    /// file or to disable the profile source entirely.
    #[must_use]
    pub fn credential_resolver(mut self, resolver: CredentialResolver) -> Self {
        self.credentials = resolver;
        self
    }

    /// Company overview: `function=OVERVIEW`.
    pub async fn company_overview(&self, event: &RequestEvent) -> Result<ResultRecord, AdapterError> {
        self.fetch(Category::Overview, event).await
    }

    /// Latest quote snapshot: `function=GLOBAL_QUOTE`.
    pub async fn global_quote(&self, event: &RequestEvent) -> Result<ResultRecord, AdapterError> {
        self.fetch(Category::GlobalQuote, event).await
    }

    /// Daily price series: `function=TIME_SERIES_DAILY`.
    ///
    /// Extra parameters such as `outputsize=full` pass through the event.
    pub async fn stock_price(&self, event: &RequestEvent) -> Result<ResultRecord, AdapterError> {
        self.fetch(Category::StockPrice, event).await
    }

    /// Daily price series reduced to the most recent trading day.
    pub async fn latest_stock_price(&self, event: &RequestEvent) -> Result<ResultRecord, AdapterError> {
        let record = self.stock_price(event).await?;
        Ok(reduce(
            record,
            normalize::latest_trading_day,
            "price series held no trading days",
        ))
    }

    /// Earnings history: `function=EARNINGS`.
    pub async fn earnings(&self, event: &RequestEvent) -> Result<ResultRecord, AdapterError> {
        self.fetch(Category::Earnings, event).await
    }

    /// Earnings reduced to the most recent annual and quarterly reports.
    pub async fn latest_earnings(&self, event: &RequestEvent) -> Result<ResultRecord, AdapterError> {
        let record = self.earnings(event).await?;
        Ok(reduce(
            record,
            normalize::latest_statements,
            "response contained no report periods",
        ))
    }

    /// Cash flow statements: `function=CASH_FLOW`.
    pub async fn cash_flow(&self, event: &RequestEvent) -> Result<ResultRecord, AdapterError> {
        self.fetch(Category::CashFlow, event).await
    }

    /// Cash flow reduced to the most recent annual and quarterly reports.
    pub async fn latest_cash_flow(&self, event: &RequestEvent) -> Result<ResultRecord, AdapterError> {
        let record = self.cash_flow(event).await?;
        Ok(reduce(
            record,
            normalize::latest_statements,
            "response contained no report periods",
        ))
    }

    /// Income statements: `function=INCOME_STATEMENT`.
    pub async fn income_statement(&self, event: &RequestEvent) -> Result<ResultRecord, AdapterError> {
        self.fetch(Category::IncomeStatement, event).await
    }

    /// Income statements reduced to the most recent annual and quarterly reports.
    pub async fn latest_income_statement(
        &self,
        event: &RequestEvent,
    ) -> Result<ResultRecord, AdapterError> {
        let record = self.income_statement(event).await?;
        Ok(reduce(
            record,
            normalize::latest_statements,
            "response contained no report periods",
        ))
    }

    /// Combined report across all categories for one symbol.
    ///
    /// The five calls run concurrently; each category's failure is isolated
    /// inside its own record. Only a missing key or an empty symbol aborts
    /// the whole report, since those would fail every category identically.
    pub async fn fundamentals_report(
        &self,
        event: &RequestEvent,
    ) -> Result<FundamentalsReport, AdapterError> {
        let (overview, quote, earnings, cash_flow, income) = tokio::join!(
            self.company_overview(event),
            self.global_quote(event),
            self.latest_earnings(event),
            self.latest_cash_flow(event),
            self.latest_income_statement(event),
        );

        let records = vec![overview?, quote?, earnings?, cash_flow?, income?];
        Ok(FundamentalsReport::new(event.symbol.trim(), records))
    }

    /// Shared request/response round trip for every category.
    async fn fetch(
        &self,
        category: Category,
        event: &RequestEvent,
    ) -> Result<ResultRecord, AdapterError> {
        let symbol = event.symbol.trim();
        if symbol.is_empty() {
            return Err(AdapterError::InvalidRequest(
                "symbol must not be empty".to_owned(),
            ));
        }

        let api_key = self
            .credentials
            .resolve(event, self.default_key.as_deref())?;

        // Key appended after logging so it never reaches the log stream.
        let url = self.request_url(category, symbol, event);
        debug!("GET {}", url);
        let url = format!("{url}&apikey={api_key}");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!("{category} {symbol}: {}", transport_message(&error));
                return Ok(ResultRecord::transport_failure(
                    category,
                    symbol,
                    transport_message(&error),
                ));
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                return Ok(ResultRecord::transport_failure(
                    category,
                    symbol,
                    format!("failed to read response body: {error}"),
                ));
            }
        };

        if !(200..300).contains(&status) {
            warn!("{category} {symbol}: upstream returned HTTP {status}");
            return Ok(ResultRecord::provider_failure(
                category,
                symbol,
                Some(status),
                format!("HTTP {status}: {}", excerpt(&body)),
            ));
        }

        let mut payload: Value = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(error) => {
                return Ok(ResultRecord::provider_failure(
                    category,
                    symbol,
                    Some(status),
                    format!("malformed JSON body: {error}"),
                ));
            }
        };

        if let Some(message) = normalize::provider_error_message(&payload) {
            return Ok(ResultRecord::provider_failure(
                category,
                symbol,
                Some(status),
                message,
            ));
        }
        if let Some(note) = normalize::rate_limit_note(&payload) {
            warn!("{category} {symbol}: rate limit note from provider");
            return Ok(ResultRecord::rate_limited(category, symbol, status, note));
        }

        normalize::normalize_payload(&mut payload);
        Ok(ResultRecord::success(category, symbol, status, payload))
    }

    /// Build the request URL minus the API key. `datatype=json` is injected
    /// unless the caller set one; reserved parameters cannot be overridden
    /// through the passthrough map.
    fn request_url(&self, category: Category, symbol: &str, event: &RequestEvent) -> String {
        let mut url = format!(
            "{}?function={}&symbol={}",
            self.base_url,
            category.function(),
            symbol
        );
        for (name, value) in &event.extra {
            if matches!(name.as_str(), "function" | "symbol" | "apikey") {
                continue;
            }
            url.push_str(&format!("&{name}={value}"));
        }
        if !event.extra.contains_key("datatype") {
            url.push_str("&datatype=json");
        }
        url
    }
}

impl fmt::Debug for AvClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvClient")
            .field("base_url", &self.base_url)
            .field("default_key", &self.default_key.as_deref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Apply a latest-period reduction to a successful record. An empty series
/// becomes a provider failure so "latest" never returns an ok record with
/// nothing in it.
fn reduce(
    record: ResultRecord,
    reducer: impl Fn(&Value) -> Option<Value>,
    empty_message: &str,
) -> ResultRecord {
    if !record.ok {
        return record;
    }
    match reducer(&record.payload) {
        Some(payload) => ResultRecord { payload, ..record },
        None => ResultRecord::provider_failure(
            record.category,
            record.symbol,
            record.status_code,
            empty_message,
        ),
    }
}

fn transport_message(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timeout: {error}")
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        format!("request failed: {error}")
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(DIAGNOSTIC_EXCERPT_CHARS) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureKind;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> AvClient {
        AvClient::with_base_url(base_url)
            .expect("client builds")
            .api_key("demo")
            .credential_resolver(CredentialResolver::without_profile())
    }

    #[test]
    fn request_url_injects_datatype_and_orders_passthrough_params() {
        let client = test_client("https://example.test/query");
        let event = RequestEvent::new("TSLA")
            .with_param("outputsize", "full")
            .with_param("interval", "60min");

        assert_eq!(
            client.request_url(Category::StockPrice, "TSLA", &event),
            "https://example.test/query?function=TIME_SERIES_DAILY&symbol=TSLA\
             &interval=60min&outputsize=full&datatype=json"
        );
    }

    #[test]
    fn request_url_keeps_caller_supplied_datatype_and_drops_reserved_params() {
        let client = test_client("https://example.test/query");
        let event = RequestEvent::new("TSLA")
            .with_param("datatype", "json")
            .with_param("function", "SMUGGLED")
            .with_param("apikey", "smuggled");

        let url = client.request_url(Category::Overview, "TSLA", &event);
        assert_eq!(
            url,
            "https://example.test/query?function=OVERVIEW&symbol=TSLA&datatype=json"
        );
    }

    #[test]
    fn debug_output_redacts_the_default_key() {
        let client = test_client("https://example.test/query").api_key("super-secret");
        let debug_str = format!("{client:?}");
        assert!(!debug_str.contains("super-secret"));
        assert!(debug_str.contains("REDACTED"));
    }

    #[tokio::test]
    async fn overview_round_trip_tags_and_echoes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("function", "OVERVIEW"))
            .and(query_param("symbol", "TSLA"))
            .and(query_param("apikey", "demo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Symbol": "TSLA", "Name": "Tesla Inc"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let record = client
            .company_overview(&RequestEvent::new("TSLA"))
            .await
            .expect("no fatal error");

        assert_eq!(record.category, Category::Overview);
        assert_eq!(record.symbol, "TSLA");
        assert!(record.ok);
        assert_eq!(record.status_code, Some(200));
        assert_eq!(record.payload_field("Symbol"), Some(&json!("TSLA")));
        assert_eq!(record.payload_field("Name"), Some(&json!("Tesla Inc")));
    }

    #[tokio::test]
    async fn request_key_overrides_client_key_on_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("apikey", "event-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Symbol": "TSLA"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri()).api_key("client-key");
        let event = RequestEvent::new("TSLA").with_api_key("event-key");
        let record = client.company_overview(&event).await.expect("no fatal error");
        assert!(record.ok);
    }

    #[tokio::test]
    async fn non_success_status_is_a_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let record = client
            .earnings(&RequestEvent::new("TSLA"))
            .await
            .expect("recovered locally");

        assert!(!record.ok);
        assert_eq!(record.failure, Some(FailureKind::Provider));
        assert_eq!(record.status_code, Some(500));
        assert!(record.error_message.as_deref().unwrap_or("").contains("HTTP 500"));
    }

    #[tokio::test]
    async fn malformed_json_body_is_a_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let record = client
            .company_overview(&RequestEvent::new("TSLA"))
            .await
            .expect("recovered locally");

        assert!(!record.ok);
        assert_eq!(record.failure, Some(FailureKind::Provider));
        assert!(record
            .error_message
            .as_deref()
            .unwrap_or("")
            .contains("malformed JSON"));
    }

    #[tokio::test]
    async fn in_body_error_message_is_a_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Error Message": "Invalid API call. Please retry or visit the documentation."
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let record = client
            .company_overview(&RequestEvent::new("NOPE"))
            .await
            .expect("recovered locally");

        assert!(!record.ok);
        assert!(!record.limit_reached);
        assert!(record
            .error_message
            .as_deref()
            .unwrap_or("")
            .contains("Invalid API call"));
    }

    #[tokio::test]
    async fn throttling_note_sets_limit_reached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let record = client
            .global_quote(&RequestEvent::new("TSLA"))
            .await
            .expect("recovered locally");

        assert!(!record.ok);
        assert!(record.limit_reached);
        assert_eq!(record.failure, Some(FailureKind::Provider));
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_failure() {
        // Nothing listens on port 9 (discard); the connect attempt fails fast.
        let client = test_client("http://127.0.0.1:9");
        let record = client
            .company_overview(&RequestEvent::new("TSLA"))
            .await
            .expect("recovered locally");

        assert!(!record.ok);
        assert_eq!(record.failure, Some(FailureKind::Transport));
        assert_eq!(record.status_code, None);
    }

    #[tokio::test]
    async fn empty_symbol_is_rejected_before_any_request() {
        let server = MockServer::start().await;
        let client = test_client(&server.uri());

        let error = client
            .company_overview(&RequestEvent::new("   "))
            .await
            .expect_err("fatal input error");
        assert!(matches!(error, AdapterError::InvalidRequest(_)));
        assert!(server.received_requests().await.expect("recorded").is_empty());
    }

    #[tokio::test]
    async fn missing_credentials_surface_before_any_request() {
        let server = MockServer::start().await;
        let client = AvClient::with_base_url(&server.uri())
            .expect("client builds")
            .credential_resolver(CredentialResolver::without_profile());

        let error = client
            .company_overview(&RequestEvent::new("TSLA"))
            .await
            .expect_err("no key anywhere");
        assert!(matches!(error, AdapterError::MissingCredentials));
        assert!(server.received_requests().await.expect("recorded").is_empty());
    }

    #[tokio::test]
    async fn latest_stock_price_equals_most_recent_series_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("function", "TIME_SERIES_DAILY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Meta Data": {"2. Symbol": "TSLA"},
                "Time Series (Daily)": {
                    "2024-01-02": {"4. close": "238.45"},
                    "2024-01-04": {"4. close": "237.93"},
                    "2024-01-03": {"4. close": "238.93"}
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let event = RequestEvent::new("TSLA");

        let series = client.stock_price(&event).await.expect("series fetched");
        let latest = client
            .latest_stock_price(&event)
            .await
            .expect("latest fetched");

        assert!(latest.ok);
        let latest_day = latest.payload_field("data").expect("single entry");
        assert_eq!(latest_day["query_date"], "2024-01-04");
        assert_eq!(
            latest_day["4. close"],
            series.payload["data"]["2024-01-04"]["4. close"]
        );
    }

    #[tokio::test]
    async fn latest_earnings_renames_and_reduces_to_single_periods() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("function", "EARNINGS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "symbol": "TSLA",
                "annualEarnings": [
                    {"fiscalDateEnding": "2022-12-31", "reportedEPS": "4.07"},
                    {"fiscalDateEnding": "2023-12-31", "reportedEPS": "3.12"}
                ],
                "quarterlyEarnings": [
                    {"fiscalDateEnding": "2023-12-31", "reportedEPS": "0.71"},
                    {"fiscalDateEnding": "2024-03-31", "reportedEPS": "0.45"}
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let record = client
            .latest_earnings(&RequestEvent::new("TSLA"))
            .await
            .expect("latest fetched");

        assert!(record.ok);
        assert_eq!(
            record.payload["annualReport"]["fiscalDateEnding"],
            "2023-12-31"
        );
        assert_eq!(
            record.payload["quarterlyReport"]["fiscalDateEnding"],
            "2024-03-31"
        );
        assert!(record.payload_field("annualReports").is_none());
    }

    #[tokio::test]
    async fn latest_on_empty_series_is_a_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Meta Data": {"2. Symbol": "TSLA"},
                "Time Series (Daily)": {}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let record = client
            .latest_stock_price(&RequestEvent::new("TSLA"))
            .await
            .expect("recovered locally");

        assert!(!record.ok);
        assert_eq!(record.failure, Some(FailureKind::Provider));
    }

    #[tokio::test]
    async fn report_isolates_a_single_category_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("function", "OVERVIEW"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Symbol": "TSLA"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("function", "GLOBAL_QUOTE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Global Quote": {"01. symbol": "TSLA", "05. price": "238.45"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("function", "EARNINGS"))
            .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
            .mount(&server)
            .await;
        for function in ["CASH_FLOW", "INCOME_STATEMENT"] {
            Mock::given(method("GET"))
                .and(query_param("function", function))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "symbol": "TSLA",
                    "annualReports": [{"fiscalDateEnding": "2023-12-31"}],
                    "quarterlyReports": [{"fiscalDateEnding": "2024-03-31"}]
                })))
                .mount(&server)
                .await;
        }

        let client = test_client(&server.uri());
        let report = client
            .fundamentals_report(&RequestEvent::new("TSLA"))
            .await
            .expect("report assembled");

        assert_eq!(report.records.len(), 5);
        assert_eq!(report.ok_count(), 4);
        assert!(!report.get(Category::Earnings).expect("present").ok);
        assert!(report.get(Category::Overview).expect("present").ok);
        assert!(report.get(Category::CashFlow).expect("present").ok);
        assert_eq!(
            report.get(Category::GlobalQuote).expect("present").payload["data"]["05. price"],
            "238.45"
        );
    }
}
