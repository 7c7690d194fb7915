//! `rctrack chart` and `rctrack buckets` subcommands

use chrono::{DateTime, Local, Utc};
use clap::Args;

use super::Context;
use crate::services::chart::{offset_for_interval, parse_interval};
use crate::services::claims::format_amount;
use crate::services::samples::parse_timestamp;
use crate::services::{
    samples_from_history, ChartData, ChartPayload, TimeSeriesAggregator, ViewRange,
};
use crate::types::{Bucket, CostHistory, Result, RctrackError, Scale};

/// Width of the text sparkline column
const BAR_WIDTH: usize = 20;

/// Print the claim-cost chart
#[derive(Args, Debug)]
pub struct ChartArgs {
    /// View range (default from config)
    #[arg(long, value_enum)]
    pub range: Option<ViewRange>,

    /// Rolling-average window in days (weekly/monthly only)
    #[arg(long, value_name = "DAYS")]
    pub smooth: Option<usize>,

    /// Hours of history to request
    #[arg(long)]
    pub hours: Option<u32>,

    /// Output the chart series as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChartArgs {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let hours = self.hours.unwrap_or(ctx.config.history_hours);
        let history = ctx.client.cost_history(hours).await?;
        let samples = samples_from_history(&history);

        let mut options = ctx
            .config
            .chart_options(self.range.unwrap_or(ctx.config.default_range));
        if let Some(window) = self.smooth {
            options.smoothing_window = window;
        }

        let chart = ChartData::prepare(&samples, Utc::now(), &options)?;

        if self.json {
            let json = serde_json::to_string_pretty(&ChartPayload::from(&chart))
                .map_err(|e| RctrackError::Parse(e.to_string()))?;
            println!("{}", json);
        } else {
            print!("{}", render_chart(&chart, &history));
        }
        Ok(())
    }
}

/// Bucket the history by an arbitrary interval
#[derive(Args, Debug)]
pub struct BucketsArgs {
    /// Bucket width: minutes (30m), hours (6h) or days (1d)
    #[arg(long, default_value = "1h")]
    pub interval: String,

    /// Rolling-average window in buckets
    #[arg(long, value_name = "BUCKETS")]
    pub smooth: Option<usize>,

    /// Hours of history to request
    #[arg(long)]
    pub hours: Option<u32>,

    /// Output buckets as JSON
    #[arg(long)]
    pub json: bool,
}

impl BucketsArgs {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let interval_ms = parse_interval(&self.interval)?;
        let hours = self.hours.unwrap_or(ctx.config.history_hours);
        let history = ctx.client.cost_history(hours).await?;
        let samples = samples_from_history(&history);

        let offset = offset_for_interval(interval_ms, Utc::now());
        let buckets = TimeSeriesAggregator::bucket_by_interval(&samples, interval_ms, offset)?;
        let buckets = TimeSeriesAggregator::rolling_average(&buckets, self.smooth.unwrap_or(1))?;

        if self.json {
            let json = serde_json::to_string_pretty(&buckets)
                .map_err(|e| RctrackError::Parse(e.to_string()))?;
            println!("{}", json);
        } else {
            let scale = TimeSeriesAggregator::select_scale_with(&buckets, &ctx.config.scale);
            print!("{}", render_buckets(&buckets, scale));
        }
        Ok(())
    }
}

/// Format a sparkline bar for `value` relative to `max`.
/// Example: value=5, max=10, width=8 → "▓▓▓▓░░░░"
pub fn format_sparkline(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || !max.is_finite() || width == 0 {
        return "░".repeat(width);
    }
    let ratio = (value / max).clamp(0.0, 1.0);
    let filled = ((ratio * width as f64).round() as usize).min(width);
    format!("{}{}", "▓".repeat(filled), "░".repeat(width - filled))
}

fn local_time(ms: i64, pattern: &str) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.with_timezone(&Local).format(pattern).to_string())
        .unwrap_or_else(|| "?".to_string())
}

/// "Latest: <cost> as of <time>" line, or a no-data note
pub fn latest_line(history: &CostHistory) -> String {
    match history.most_recent_cost {
        Some(cost) => {
            let when = history
                .most_recent_time
                .as_deref()
                .map(|raw| match parse_timestamp(raw) {
                    Some(ts) => ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
                    None => raw.to_string(),
                })
                .map(|t| format!(" as of {}", t))
                .unwrap_or_default();
            format!("Latest: {}{}", format_amount(cost), when)
        }
        None => "Latest: No data available".to_string(),
    }
}

/// Text rendering of a prepared chart
pub fn render_chart(chart: &ChartData, history: &CostHistory) -> String {
    let mut out = format!(
        "RC claim cost - {} - {}\n{}\n\n",
        chart.range.label(),
        chart.scale.axis_title(),
        latest_line(history)
    );

    if chart.is_empty() {
        out.push_str("No RC cost data available.\n");
        return out;
    }

    if chart.range.shows_band() {
        let max = chart.band.iter().map(|p| p.high).fold(0.0, f64::max);
        out.push_str(&format!(
            "{:<8} {:>14} {:>14} {:>14}  {}\n",
            "Day", "Avg", "Min", "Max", "Avg"
        ));
        for (point, band) in chart.line.iter().zip(&chart.band) {
            out.push_str(&format!(
                "{:<8} {:>14} {:>14} {:>14}  {}\n",
                local_time(point.x, "%b %d"),
                format_amount(point.y),
                format_amount(band.low),
                format_amount(band.high),
                format_sparkline(point.y, max, BAR_WIDTH)
            ));
        }
    } else {
        let max = chart.line.iter().map(|p| p.y).fold(0.0, f64::max);
        out.push_str(&format!("{:<8} {:>14}  {}\n", "Time", "Value", "Value"));
        for point in &chart.line {
            out.push_str(&format!(
                "{:<8} {:>14}  {}\n",
                local_time(point.x, "%H:%M"),
                format_amount(point.y),
                format_sparkline(point.y, max, BAR_WIDTH)
            ));
        }
    }
    out
}

/// Text rendering of an ad-hoc bucket table
pub fn render_buckets(buckets: &[Bucket], scale: Scale) -> String {
    if buckets.is_empty() {
        return "No RC cost data available.\n".to_string();
    }

    let divisor = scale.divisor();
    let mut out = format!(
        "{}\n{:<17} {:>14} {:>14} {:>14} {:>6}\n",
        scale.axis_title(),
        "Start",
        "Avg",
        "Min",
        "Max",
        "Count"
    );
    for b in buckets {
        out.push_str(&format!(
            "{:<17} {:>14} {:>14} {:>14} {:>6}\n",
            local_time(b.start_ms, "%Y-%m-%d %H:%M"),
            format_amount(b.average / divisor),
            format_amount(b.minimum / divisor),
            format_amount(b.maximum / divisor),
            b.count
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chart::{ChartPoint, RangePoint};

    fn history(cost: Option<f64>, time: Option<&str>) -> CostHistory {
        CostHistory {
            most_recent_cost: cost,
            most_recent_time: time.map(String::from),
            ..CostHistory::default()
        }
    }

    #[test]
    fn test_format_sparkline() {
        assert_eq!(format_sparkline(5.0, 10.0, 8), "▓▓▓▓░░░░");
        assert_eq!(format_sparkline(10.0, 10.0, 4), "▓▓▓▓");
        assert_eq!(format_sparkline(20.0, 10.0, 4), "▓▓▓▓");
        assert_eq!(format_sparkline(1.0, 0.0, 3), "░░░");
    }

    #[test]
    fn test_latest_line_without_data() {
        assert_eq!(latest_line(&history(None, None)), "Latest: No data available");
    }

    #[test]
    fn test_latest_line_keeps_unparseable_time() {
        let line = latest_line(&history(Some(1_500.0), Some("soon")));
        assert_eq!(line, "Latest: 1,500 as of soon");
    }

    #[test]
    fn test_render_empty_chart() {
        let chart = ChartData {
            range: ViewRange::Weekly,
            scale: Scale::Units,
            line: Vec::new(),
            band: Vec::new(),
            buckets: Vec::new(),
        };
        let text = render_chart(&chart, &history(None, None));
        assert!(text.contains("No RC cost data available."));
    }

    #[test]
    fn test_render_weekly_rows() {
        let chart = ChartData {
            range: ViewRange::Weekly,
            scale: Scale::Millions,
            line: vec![ChartPoint { x: 0, y: 1_500.0 }],
            band: vec![RangePoint {
                x: 0,
                low: 1_000.0,
                high: 2_000.0,
            }],
            buckets: Vec::new(),
        };
        let text = render_chart(&chart, &history(Some(1.5e9), None));
        assert!(text.contains("RC Cost (millions)"));
        assert!(text.contains("1,500"));
        assert!(text.contains("2,000"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_render_buckets_scales_values() {
        let buckets = vec![Bucket {
            start_ms: 0,
            average: 2e9,
            minimum: 1e9,
            maximum: 3e9,
            count: 7,
        }];
        let text = render_buckets(&buckets, Scale::Millions);
        assert!(text.starts_with("RC Cost (millions)"));
        assert!(text.contains("2,000"));
        assert!(text.trim_end().ends_with('7'));
    }
}
