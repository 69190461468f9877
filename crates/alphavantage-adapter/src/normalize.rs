//! Response payload normalization
//!
//! Alphavantage varies its top-level keys per function: the daily series
//! arrives under `Time Series (Daily)`, the quote under `Global Quote`, and
//! the earnings report names its arrays `annualEarnings`/`quarterlyEarnings`
//! where the other statements use `annualReports`/`quarterlyReports`. The
//! adapter collapses these onto one shape (`data`, `annualReports`,
//! `quarterlyReports`) so callers address every category the same way.
//!
//! The "latest" reductions are pure functions over an already-normalized
//! payload - no second network call.

use serde_json::Value;

/// Collapse function-specific top-level keys onto the adapter's shape.
pub(crate) fn normalize_payload(payload: &mut Value) {
    let Some(map) = payload.as_object_mut() else {
        return;
    };

    let renames: Vec<(String, &'static str)> = map
        .keys()
        .filter_map(|key| renamed_key(key).map(|new| (key.clone(), new)))
        .collect();

    for (old, new) in renames {
        if let Some(value) = map.remove(&old) {
            map.insert(new.to_owned(), value);
        }
    }
}

fn renamed_key(key: &str) -> Option<&'static str> {
    if key.starts_with("Time Series (") || key == "Global Quote" {
        Some("data")
    } else if key == "annualEarnings" {
        Some("annualReports")
    } else if key == "quarterlyEarnings" {
        Some("quarterlyReports")
    } else {
        None
    }
}

/// In-body error reported with an HTTP 200, e.g. for an unknown symbol.
pub(crate) fn provider_error_message(payload: &Value) -> Option<String> {
    payload
        .get("Error Message")
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Free-tier throttling note, also delivered with an HTTP 200.
pub(crate) fn rate_limit_note(payload: &Value) -> Option<String> {
    ["Note", "Information"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::to_owned)
}

/// Reduce a normalized price-series payload to its most recent trading day.
///
/// The winning entry keeps its fields and gains a `query_date` echo of the
/// series key it came from. Returns `None` when the series is empty.
pub(crate) fn latest_trading_day(payload: &Value) -> Option<Value> {
    let series = payload.get("data")?.as_object()?;
    let (date, entry) = series.iter().max_by(|a, b| a.0.cmp(b.0))?;

    let mut latest = entry.as_object()?.clone();
    latest.insert("query_date".to_owned(), Value::String(date.clone()));

    let mut reduced = payload.as_object()?.clone();
    reduced.insert("data".to_owned(), Value::Object(latest));
    Some(Value::Object(reduced))
}

/// Reduce a normalized statement payload to its most recent annual and
/// quarterly reports, keyed `annualReport`/`quarterlyReport` (singular).
///
/// Returns `None` when neither array holds an entry.
pub(crate) fn latest_statements(payload: &Value) -> Option<Value> {
    let annual = most_recent_report(payload.get("annualReports"));
    let quarterly = most_recent_report(payload.get("quarterlyReports"));
    if annual.is_none() && quarterly.is_none() {
        return None;
    }

    let mut reduced = payload.as_object()?.clone();
    reduced.remove("annualReports");
    reduced.remove("quarterlyReports");
    if let Some(report) = annual {
        reduced.insert("annualReport".to_owned(), report);
    }
    if let Some(report) = quarterly {
        reduced.insert("quarterlyReport".to_owned(), report);
    }
    Some(Value::Object(reduced))
}

/// Chronologically most recent entry of a report array, by `fiscalDateEnding`.
fn most_recent_report(reports: Option<&Value>) -> Option<Value> {
    reports?
        .as_array()?
        .iter()
        .max_by_key(|report| fiscal_date(report))
        .cloned()
}

fn fiscal_date(report: &Value) -> &str {
    report
        .get("fiscalDateEnding")
        .and_then(Value::as_str)
        .unwrap_or("")
}
