//! Time-series types for claim-cost history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single claim-cost observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// RC cost, expected finite and non-negative; bucketing skips non-finite values
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Aggregated statistics for one fixed-width time window.
///
/// `start_ms` is the window start in epoch milliseconds, which is also the
/// `x` value handed to the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub start_ms: i64,
    pub average: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub count: u64,
}

impl Bucket {
    /// Window start as a UTC instant (None only for out-of-range values)
    pub fn start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_ms)
    }
}

/// Raw response of `/api/rc_cost_data`.
///
/// `costs` stays untyped: entries may be numbers, numeric strings or junk,
/// and sample parsing decides what survives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostHistory {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub costs: Vec<serde_json::Value>,
    #[serde(default)]
    pub most_recent_cost: Option<f64>,
    #[serde(default)]
    pub most_recent_time: Option<String>,
}

/// Display divisor for chart values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Units,
    Millions,
    Billions,
}

impl Scale {
    pub fn divisor(self) -> f64 {
        match self {
            Self::Units => 1.0,
            Self::Millions => 1e6,
            Self::Billions => 1e9,
        }
    }

    /// Y-axis title for this scale
    pub fn axis_title(self) -> &'static str {
        match self {
            Self::Units => "RC Cost",
            Self::Millions => "RC Cost (millions)",
            Self::Billions => "RC Cost (billions)",
        }
    }

    /// Pick a scale for the largest value on the chart
    pub fn for_max(max: f64, thresholds: &ScaleThresholds) -> Self {
        if max > thresholds.billions_above {
            Self::Billions
        } else if max > thresholds.millions_above {
            Self::Millions
        } else {
            Self::Units
        }
    }
}

/// Cutoffs above which chart values are shown in millions or billions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleThresholds {
    /// Values above this are divided by 1e9
    pub billions_above: f64,
    /// Values above this are divided by 1e6
    pub millions_above: f64,
}

impl Default for ScaleThresholds {
    fn default() -> Self {
        Self {
            billions_above: 1e12,
            millions_above: 1e9,
        }
    }
}
