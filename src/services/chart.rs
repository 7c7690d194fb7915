//! Chart preparation: turns samples into display-ready series per view range

use super::aggregator::{local_offset_ms, TimeSeriesAggregator, DAY_MS, HOUR_MS};
use crate::types::{Bucket, Result, RctrackError, Sample, Scale, ScaleThresholds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Time range shown on the chart
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewRange {
    /// Raw samples from the last 24 hours
    #[default]
    Daily,
    /// Daily buckets over the last 7 days
    Weekly,
    /// Daily buckets over the last 30 days
    Monthly,
}

impl ViewRange {
    pub fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }

    /// How far back from `now` the view reaches
    pub fn lookback_ms(self) -> i64 {
        match self {
            Self::Daily => DAY_MS,
            Self::Weekly => 7 * DAY_MS,
            Self::Monthly => 30 * DAY_MS,
        }
    }

    /// Whether the min/max band is drawn
    pub fn shows_band(self) -> bool {
        !matches!(self, Self::Daily)
    }

    /// Axis label pattern for the x axis
    pub fn x_label_format(self) -> &'static str {
        match self {
            Self::Daily => "HH:mm",
            Self::Weekly | Self::Monthly => "MMM dd",
        }
    }
}

/// Settings that shape a chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartOptions {
    pub range: ViewRange,
    /// Trailing window (in buckets) for weekly/monthly smoothing; 1 disables it
    pub smoothing_window: usize,
    pub thresholds: ScaleThresholds,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            range: ViewRange::default(),
            smoothing_window: 1,
            thresholds: ScaleThresholds::default(),
        }
    }
}

/// Scaled `(x, y)` point of the main line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub x: i64,
    pub y: f64,
}

/// Scaled min/max point of the band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangePoint {
    pub x: i64,
    pub low: f64,
    pub high: f64,
}

/// Display-ready series for one render
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub range: ViewRange,
    pub scale: Scale,
    pub line: Vec<ChartPoint>,
    /// Empty for the daily view
    pub band: Vec<RangePoint>,
    /// Unscaled buckets behind the line (empty for the daily view)
    pub buckets: Vec<Bucket>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    fn empty(range: ViewRange) -> Self {
        Self {
            range,
            scale: Scale::Units,
            line: Vec::new(),
            band: Vec::new(),
            buckets: Vec::new(),
        }
    }

    /// Build the series for `options.range` as seen at `now`
    pub fn prepare(samples: &[Sample], now: DateTime<Utc>, options: &ChartOptions) -> Result<Self> {
        let range = options.range;
        let cutoff_ms = now.timestamp_millis() - range.lookback_ms();

        if range == ViewRange::Daily {
            let mut points: Vec<(i64, f64)> = samples
                .iter()
                .map(|s| (s.timestamp.timestamp_millis(), s.value))
                .filter(|(ts, _)| *ts >= cutoff_ms)
                .collect();
            if points.is_empty() {
                return Ok(Self::empty(range));
            }
            points.sort_by_key(|(ts, _)| *ts);

            let max = points.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
            let scale = Scale::for_max(max, &options.thresholds);
            let divisor = scale.divisor();

            return Ok(Self {
                range,
                scale,
                line: points
                    .into_iter()
                    .map(|(x, v)| ChartPoint { x, y: v / divisor })
                    .collect(),
                band: Vec::new(),
                buckets: Vec::new(),
            });
        }

        let daily = TimeSeriesAggregator::bucket_by_interval(samples, DAY_MS, local_offset_ms(now))?;
        let recent: Vec<Bucket> = daily
            .into_iter()
            .filter(|b| b.start_ms >= cutoff_ms && b.average.is_finite())
            .collect();
        if recent.is_empty() {
            return Ok(Self::empty(range));
        }

        let buckets = TimeSeriesAggregator::rolling_average(&recent, options.smoothing_window)?;
        let scale = TimeSeriesAggregator::select_scale_with(&buckets, &options.thresholds);
        let divisor = scale.divisor();

        Ok(Self {
            range,
            scale,
            line: buckets
                .iter()
                .map(|b| ChartPoint {
                    x: b.start_ms,
                    y: b.average / divisor,
                })
                .collect(),
            band: buckets
                .iter()
                .map(|b| RangePoint {
                    x: b.start_ms,
                    low: b.minimum / divisor,
                    high: b.maximum / divisor,
                })
                .collect(),
            buckets,
        })
    }
}

/// Series type understood by the charting library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeriesKind {
    Line,
    RangeArea,
}

/// `y` is a single value for lines and `[low, high]` for range areas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesValue {
    Single(f64),
    Range([f64; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub x: i64,
    pub y: SeriesValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SeriesKind,
    pub data: Vec<SeriesPoint>,
}

/// Input for an external charting library: named series plus axis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    pub range: ViewRange,
    pub series: Vec<NamedSeries>,
    pub y_axis_title: String,
    pub x_label_format: String,
    pub scale_divisor: f64,
}

impl From<&ChartData> for ChartPayload {
    fn from(chart: &ChartData) -> Self {
        let mut series = vec![NamedSeries {
            name: "Value".to_string(),
            kind: SeriesKind::Line,
            data: chart
                .line
                .iter()
                .map(|p| SeriesPoint {
                    x: p.x,
                    y: SeriesValue::Single(p.y),
                })
                .collect(),
        }];

        if chart.range.shows_band() {
            series.push(NamedSeries {
                name: "Range".to_string(),
                kind: SeriesKind::RangeArea,
                data: chart
                    .band
                    .iter()
                    .map(|p| SeriesPoint {
                        x: p.x,
                        y: SeriesValue::Range([p.low, p.high]),
                    })
                    .collect(),
            });
        }

        Self {
            range: chart.range,
            series,
            y_axis_title: chart.scale.axis_title().to_string(),
            x_label_format: chart.range.x_label_format().to_string(),
            scale_divisor: chart.scale.divisor(),
        }
    }
}

/// Parse an interval such as `30m`, `1h`, `6h` or `1d` into milliseconds
pub fn parse_interval(text: &str) -> Result<i64> {
    let text = text.trim();
    let invalid = || RctrackError::Parse(format!("invalid interval '{}' (try 1h or 1d)", text));

    let split = text.len().checked_sub(1).ok_or_else(invalid)?;
    if !text.is_char_boundary(split) {
        return Err(invalid());
    }
    let (digits, unit) = text.split_at(split);
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    let unit_ms = match unit {
        "m" => 60_000,
        "h" => HOUR_MS,
        "d" => DAY_MS,
        _ => return Err(invalid()),
    };

    match amount.checked_mul(unit_ms) {
        Some(ms) if ms > 0 => Ok(ms),
        _ => Err(RctrackError::InvalidArgument(format!(
            "interval must be positive, got '{}'",
            text
        ))),
    }
}

/// Alignment offset for ad-hoc bucketing: whole days align to local
/// midnight, shorter intervals to UTC.
pub fn offset_for_interval(interval_ms: i64, now: DateTime<Utc>) -> i64 {
    if interval_ms % DAY_MS == 0 {
        local_offset_ms(now)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 31, 12, 0, 0).unwrap()
    }

    fn hours_ago(h: i64, value: f64) -> Sample {
        Sample::new(now() - Duration::hours(h), value)
    }

    fn options(range: ViewRange) -> ChartOptions {
        ChartOptions {
            range,
            ..ChartOptions::default()
        }
    }

    // ========== ViewRange ==========

    #[test]
    fn test_view_range_band_and_format() {
        assert!(!ViewRange::Daily.shows_band());
        assert!(ViewRange::Weekly.shows_band());
        assert_eq!(ViewRange::Daily.x_label_format(), "HH:mm");
        assert_eq!(ViewRange::Monthly.x_label_format(), "MMM dd");
        assert_eq!(ViewRange::default(), ViewRange::Daily);
    }

    // ========== ChartData::prepare ==========

    #[test]
    fn test_daily_keeps_raw_points_in_last_day() {
        let samples = vec![hours_ago(2, 20.0), hours_ago(30, 99.0), hours_ago(5, 10.0)];

        let chart = ChartData::prepare(&samples, now(), &options(ViewRange::Daily)).unwrap();

        assert_eq!(chart.line.len(), 2);
        assert!(chart.line[0].x < chart.line[1].x);
        assert_eq!(chart.line[0].y, 10.0);
        assert!(chart.band.is_empty());
        assert!(chart.buckets.is_empty());
    }

    #[test]
    fn test_daily_scales_large_values() {
        let samples = vec![hours_ago(1, 5e12), hours_ago(2, 1e12)];

        let chart = ChartData::prepare(&samples, now(), &options(ViewRange::Daily)).unwrap();

        assert_eq!(chart.scale, Scale::Billions);
        assert!((chart.line[1].y - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_buckets_with_band() {
        let samples = vec![
            hours_ago(24 * 2, 10.0),
            hours_ago(24 * 2 + 1, 30.0),
            hours_ago(24 * 10, 500.0), // outside 7 days
        ];

        let chart = ChartData::prepare(&samples, now(), &options(ViewRange::Weekly)).unwrap();

        assert_eq!(chart.buckets.len(), chart.line.len());
        assert_eq!(chart.band.len(), chart.line.len());
        assert!(chart.band.iter().all(|p| p.high < 500.0));
        let total: u64 = chart.buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_monthly_reaches_further_back() {
        let samples = vec![hours_ago(24 * 10, 500.0), hours_ago(24 * 40, 1.0)];

        let chart = ChartData::prepare(&samples, now(), &options(ViewRange::Monthly)).unwrap();

        assert_eq!(chart.line.len(), 1);
        assert_eq!(chart.line[0].y, 500.0);
    }

    #[test]
    fn test_smoothing_applies_to_bucketed_views() {
        let samples: Vec<Sample> = (0..5).map(|d| hours_ago(24 * d, (5 - d) as f64)).collect();
        let opts = ChartOptions {
            range: ViewRange::Weekly,
            smoothing_window: 2,
            ..ChartOptions::default()
        };

        let raw = ChartData::prepare(&samples, now(), &options(ViewRange::Weekly)).unwrap();
        let smooth = ChartData::prepare(&samples, now(), &opts).unwrap();

        assert_eq!(raw.line.len(), smooth.line.len());
        assert_eq!(raw.line[0], smooth.line[0]);
        assert!(smooth.line[1].y < raw.line[1].y);
    }

    #[test]
    fn test_zero_smoothing_window_is_rejected() {
        let opts = ChartOptions {
            smoothing_window: 0,
            ..ChartOptions::default()
        };
        let samples = vec![hours_ago(1, 1.0)];
        assert!(ChartData::prepare(&samples, now(), &opts).is_err());
    }

    #[test]
    fn test_empty_input_gives_empty_chart() {
        for range in [ViewRange::Daily, ViewRange::Weekly, ViewRange::Monthly] {
            let chart = ChartData::prepare(&[], now(), &options(range)).unwrap();
            assert!(chart.is_empty());
            assert_eq!(chart.scale, Scale::Units);
        }
    }

    // ========== ChartPayload ==========

    #[test]
    fn test_payload_shape_for_weekly() {
        let samples = vec![hours_ago(24, 2e9), hours_ago(25, 4e9)];
        let chart = ChartData::prepare(&samples, now(), &options(ViewRange::Weekly)).unwrap();

        let payload = ChartPayload::from(&chart);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["series"][0]["name"], "Value");
        assert_eq!(json["series"][0]["type"], "line");
        assert_eq!(json["series"][1]["type"], "rangeArea");
        assert!(json["series"][1]["data"][0]["y"].is_array());
        assert_eq!(json["y_axis_title"], "RC Cost (millions)");
        assert_eq!(json["range"], "weekly");
    }

    #[test]
    fn test_payload_daily_has_no_range_series() {
        let chart =
            ChartData::prepare(&[hours_ago(1, 3.0)], now(), &options(ViewRange::Daily)).unwrap();
        let payload = ChartPayload::from(&chart);
        assert_eq!(payload.series.len(), 1);
        assert_eq!(payload.series[0].data[0].y, SeriesValue::Single(3.0));
    }

    // ========== parse_interval ==========

    #[test]
    fn test_parse_interval_units() {
        assert_eq!(parse_interval("30m").unwrap(), 1_800_000);
        assert_eq!(parse_interval("1h").unwrap(), HOUR_MS);
        assert_eq!(parse_interval("6h").unwrap(), 6 * HOUR_MS);
        assert_eq!(parse_interval("1d").unwrap(), DAY_MS);
    }

    #[test]
    fn test_parse_interval_rejects_bad_input() {
        assert!(matches!(parse_interval("0h"), Err(RctrackError::InvalidArgument(_))));
        assert!(matches!(parse_interval("h"), Err(RctrackError::Parse(_))));
        assert!(matches!(parse_interval("5y"), Err(RctrackError::Parse(_))));
        assert!(matches!(parse_interval(""), Err(RctrackError::Parse(_))));
        assert!(matches!(parse_interval("-1h"), Err(RctrackError::InvalidArgument(_))));
    }

    #[test]
    fn test_offset_for_interval() {
        assert_eq!(offset_for_interval(HOUR_MS, now()), 0);
        assert_eq!(offset_for_interval(DAY_MS, now()), local_offset_ms(now()));
    }
}
