//! Sample parsing service
//!
//! Turns the cost API's parallel `labels`/`costs` arrays into samples.
//! Entries with an unreadable timestamp or a non-numeric cost are dropped,
//! never reported as errors.

use crate::types::{CostHistory, Sample};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Naive formats written by the cost logger (local wall-clock time)
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_naive(label: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(label, fmt).ok())
}

/// Parse an ISO-8601 label into a UTC instant.
///
/// Labels with an explicit offset are taken as-is, seconds optional.
/// A bare date is midnight UTC. Any other label without an offset is
/// read as local time.
pub fn parse_timestamp(label: &str) -> Option<DateTime<Utc>> {
    let label = label.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(label) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(label, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = label.strip_suffix(['Z', 'z']).and_then(parse_naive) {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(label, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    parse_naive(label)
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}

/// Read a cost value: numbers and numeric strings, finite and non-negative.
///
/// # Examples
/// ```
/// use rctrack::services::samples::parse_value;
/// use serde_json::json;
///
/// assert_eq!(parse_value(&json!(42)), Some(42.0));
/// assert_eq!(parse_value(&json!("1.5e9")), Some(1.5e9));
/// assert_eq!(parse_value(&json!(null)), None);
/// assert_eq!(parse_value(&json!("n/a")), None);
/// ```
pub fn parse_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    (number.is_finite() && number >= 0.0).then_some(number)
}

/// Pair labels with costs by index, keeping only valid pairs.
/// Extra entries in the longer array are ignored.
pub fn samples_from_history(history: &CostHistory) -> Vec<Sample> {
    let pairs = history.labels.len().min(history.costs.len());

    let samples: Vec<Sample> = history
        .labels
        .iter()
        .zip(&history.costs)
        .filter_map(|(label, cost)| Some(Sample::new(parse_timestamp(label)?, parse_value(cost)?)))
        .collect();

    let dropped = pairs - samples.len();
    if dropped > 0 || history.labels.len() != history.costs.len() {
        tracing::debug!(
            labels = history.labels.len(),
            costs = history.costs.len(),
            dropped,
            "skipped unusable cost history entries"
        );
    }

    samples
}
