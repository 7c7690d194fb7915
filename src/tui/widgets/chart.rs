//! Chart tab: average line with the min/max band drawn as two edge lines

use chrono::{DateTime, Local, Utc};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, LegendPosition, Widget},
};

use crate::services::aggregator::HOUR_MS;
use crate::services::claims::format_amount;
use crate::services::{ChartData, ViewRange};
use crate::tui::theme::Theme;

/// Headroom added above and below the plotted values
const Y_PADDING: f64 = 0.05;

/// `[low, high]` bounds for a set of values, padded so lines never sit on the frame
pub fn axis_bounds(values: impl IntoIterator<Item = f64>) -> [f64; 2] {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return [0.0, 1.0];
    }
    let span = max - min;
    let pad = if span > 0.0 {
        span * Y_PADDING
    } else {
        max.abs().max(1.0) * Y_PADDING
    };
    [(min - pad).max(0.0), max + pad]
}

/// Time bounds in epoch ms; a single point gets an hour on each side
pub fn time_bounds(xs: impl IntoIterator<Item = i64>) -> [f64; 2] {
    let (min, max) = xs
        .into_iter()
        .fold((i64::MAX, i64::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
    if min > max {
        return [0.0, 1.0];
    }
    if min == max {
        return [(min - HOUR_MS) as f64, (max + HOUR_MS) as f64];
    }
    [min as f64, max as f64]
}

fn time_label(ms: f64, range: ViewRange) -> String {
    let pattern = match range {
        ViewRange::Daily => "%H:%M",
        ViewRange::Weekly | ViewRange::Monthly => "%b %d",
    };
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .map(|dt| dt.with_timezone(&Local).format(pattern).to_string())
        .unwrap_or_default()
}

pub struct CostChart<'a> {
    data: &'a ChartData,
    theme: Theme,
}

impl<'a> CostChart<'a> {
    pub fn new(data: &'a ChartData, theme: Theme) -> Self {
        Self { data, theme }
    }
}

impl Widget for CostChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        if self.data.is_empty() {
            let text = "No RC cost data available.";
            let x = area.x + area.width.saturating_sub(text.len() as u16) / 2;
            buf.set_string(
                x,
                area.y + area.height / 2,
                text,
                Style::default().fg(self.theme.muted()),
            );
            return;
        }

        let range = self.data.range;
        let line: Vec<(f64, f64)> = self.data.line.iter().map(|p| (p.x as f64, p.y)).collect();
        let low: Vec<(f64, f64)> = self.data.band.iter().map(|p| (p.x as f64, p.low)).collect();
        let high: Vec<(f64, f64)> = self.data.band.iter().map(|p| (p.x as f64, p.high)).collect();

        let x_bounds = time_bounds(self.data.line.iter().map(|p| p.x));
        let y_bounds = axis_bounds(
            line.iter()
                .chain(low.iter())
                .chain(high.iter())
                .map(|(_, y)| *y),
        );

        let mut datasets = vec![Dataset::default()
            .name(if range.shows_band() { "Average" } else { "Value" })
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(self.theme.accent()))
            .data(&line)];
        if range.shows_band() {
            datasets.push(
                Dataset::default()
                    .name("Max")
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(self.theme.band()))
                    .data(&high),
            );
            datasets.push(
                Dataset::default()
                    .name("Min")
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(self.theme.band()))
                    .data(&low),
            );
        }

        let muted = Style::default().fg(self.theme.muted());
        let mid_x = (x_bounds[0] + x_bounds[1]) / 2.0;
        let x_labels: Vec<Line> = [x_bounds[0], mid_x, x_bounds[1]]
            .iter()
            .map(|x| Line::from(Span::styled(time_label(*x, range), muted)))
            .collect();
        let mid_y = (y_bounds[0] + y_bounds[1]) / 2.0;
        let y_labels: Vec<Line> = [y_bounds[0], mid_y, y_bounds[1]]
            .iter()
            .map(|y| Line::from(Span::styled(format_amount(*y), muted)))
            .collect();

        Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .style(muted)
                    .bounds(x_bounds)
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .title(Span::styled(
                        self.data.scale.axis_title(),
                        Style::default()
                            .fg(self.theme.cost())
                            .add_modifier(Modifier::BOLD),
                    ))
                    .style(muted)
                    .bounds(y_bounds)
                    .labels(y_labels),
            )
            .legend_position(Some(LegendPosition::TopLeft))
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chart::{ChartPoint, RangePoint};
    use crate::types::Scale;

    #[test]
    fn test_axis_bounds_pads_span() {
        let [lo, hi] = axis_bounds([10.0, 20.0]);
        assert!((lo - 9.5).abs() < 1e-9);
        assert!((hi - 20.5).abs() < 1e-9);
    }

    #[test]
    fn test_axis_bounds_flat_series() {
        let [lo, hi] = axis_bounds([100.0, 100.0]);
        assert!(lo < 100.0 && hi > 100.0);
    }

    #[test]
    fn test_axis_bounds_never_negative() {
        let [lo, _] = axis_bounds([0.0, 1.0]);
        assert_eq!(lo, 0.0);
    }

    #[test]
    fn test_axis_bounds_empty() {
        assert_eq!(axis_bounds(std::iter::empty()), [0.0, 1.0]);
        assert_eq!(axis_bounds([f64::NAN]), [0.0, 1.0]);
    }

    #[test]
    fn test_time_bounds_single_point() {
        let [lo, hi] = time_bounds([HOUR_MS * 10]);
        assert_eq!(lo, (HOUR_MS * 9) as f64);
        assert_eq!(hi, (HOUR_MS * 11) as f64);
    }

    fn buffer_text(buf: &Buffer) -> String {
        let area = buf.area;
        (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|pos| buf[pos].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_empty_chart_shows_message() {
        let data = ChartData {
            range: ViewRange::Daily,
            scale: Scale::Units,
            line: Vec::new(),
            band: Vec::new(),
            buckets: Vec::new(),
        };
        let area = Rect::new(0, 0, 60, 10);
        let mut buf = Buffer::empty(area);
        CostChart::new(&data, Theme::Dark).render(area, &mut buf);
        assert!(buffer_text(&buf).contains("No RC cost data available."));
    }

    #[test]
    fn test_weekly_chart_shows_legend_and_title() {
        let data = ChartData {
            range: ViewRange::Weekly,
            scale: Scale::Millions,
            line: vec![
                ChartPoint { x: 0, y: 1_500.0 },
                ChartPoint {
                    x: 86_400_000,
                    y: 1_700.0,
                },
            ],
            band: vec![
                RangePoint {
                    x: 0,
                    low: 1_000.0,
                    high: 2_000.0,
                },
                RangePoint {
                    x: 86_400_000,
                    low: 1_200.0,
                    high: 2_100.0,
                },
            ],
            buckets: Vec::new(),
        };
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        CostChart::new(&data, Theme::Dark).render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("RC Cost (millions)"));
        assert!(text.contains("Average"));
    }
}
