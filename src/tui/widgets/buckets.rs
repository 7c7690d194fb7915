//! Buckets tab: scrollable table of per-bucket average/min/max/count

use chrono::{DateTime, Local, Utc};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::cli::format_sparkline;
use crate::services::claims::format_amount;
use crate::tui::theme::Theme;
use crate::types::{Bucket, Scale};

/// Column labels and widths: Start(18) + Avg(14) + Min(14) + Max(14) + Count(7) + bar(14)
const COLUMNS: &[(&str, u16)] = &[
    ("Start", 18),
    ("Avg", 14),
    ("Min", 14),
    ("Max", 14),
    ("Count", 7),
    ("", 14),
];

const BAR_WIDTH: usize = 12;

fn table_width() -> u16 {
    COLUMNS.iter().map(|(_, w)| *w).sum()
}

fn start_label(bucket: &Bucket) -> String {
    DateTime::<Utc>::from_timestamp_millis(bucket.start_ms)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "?".to_string())
}

pub struct BucketTable<'a> {
    buckets: &'a [Bucket],
    scale: Scale,
    scroll_offset: usize,
    theme: Theme,
}

impl<'a> BucketTable<'a> {
    pub fn new(buckets: &'a [Bucket], scale: Scale, scroll_offset: usize, theme: Theme) -> Self {
        Self {
            buckets,
            scale,
            scroll_offset,
            theme,
        }
    }

    /// Largest offset that still shows a full page of rows
    pub fn max_scroll_offset(len: usize, visible_rows: usize) -> usize {
        len.saturating_sub(visible_rows)
    }

    /// Data rows that fit below the title and header lines
    pub fn visible_rows(area_height: u16) -> usize {
        area_height.saturating_sub(2) as usize
    }

    fn centered(area: Rect) -> Rect {
        let width = table_width().min(area.width);
        Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            width,
            ..area
        }
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let style = Style::default()
            .fg(self.theme.text())
            .add_modifier(Modifier::BOLD);
        let spans: Vec<Span> = COLUMNS
            .iter()
            .enumerate()
            .map(|(i, (label, width))| {
                let width = *width as usize;
                if i == 0 {
                    Span::styled(format!("{:<width$}", label, width = width), style)
                } else {
                    Span::styled(format!("{:>width$}", label, width = width), style)
                }
            })
            .collect();
        Paragraph::new(Line::from(spans)).render(area, buf);
    }

    fn render_row(&self, area: Rect, buf: &mut Buffer, bucket: &Bucket, max: f64) {
        let divisor = self.scale.divisor();
        let widths: Vec<usize> = COLUMNS.iter().map(|(_, w)| *w as usize).collect();
        let cost = Style::default().fg(self.theme.cost());
        let line = Line::from(vec![
            Span::styled(
                format!("{:<w$}", start_label(bucket), w = widths[0]),
                Style::default().fg(self.theme.date()),
            ),
            Span::styled(
                format!("{:>w$}", format_amount(bucket.average / divisor), w = widths[1]),
                cost,
            ),
            Span::styled(
                format!("{:>w$}", format_amount(bucket.minimum / divisor), w = widths[2]),
                Style::default().fg(self.theme.text()),
            ),
            Span::styled(
                format!("{:>w$}", format_amount(bucket.maximum / divisor), w = widths[3]),
                Style::default().fg(self.theme.text()),
            ),
            Span::styled(
                format!("{:>w$}", bucket.count, w = widths[4]),
                Style::default().fg(self.theme.muted()),
            ),
            Span::styled(
                format!("  {}", format_sparkline(bucket.average, max, BAR_WIDTH)),
                Style::default().fg(self.theme.bar()),
            ),
        ]);
        Paragraph::new(line).render(area, buf);
    }
}

impl Widget for BucketTable<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        if self.buckets.is_empty() {
            Paragraph::new(Line::from(Span::styled(
                "No RC cost data available.",
                Style::default().fg(self.theme.muted()),
            )))
            .alignment(Alignment::Center)
            .render(Rect { height: 1, ..area }, buf);
            return;
        }

        let table = Self::centered(area);
        Paragraph::new(Line::from(Span::styled(
            self.scale.axis_title(),
            Style::default().fg(self.theme.muted()),
        )))
        .render(Rect { height: 1, ..table }, buf);
        if area.height < 2 {
            return;
        }
        self.render_header(
            Rect {
                y: table.y + 1,
                height: 1,
                ..table
            },
            buf,
        );

        let visible_rows = Self::visible_rows(area.height);
        let max = self
            .buckets
            .iter()
            .map(|b| b.average)
            .fold(0.0, f64::max);
        let start = self
            .scroll_offset
            .min(Self::max_scroll_offset(self.buckets.len(), visible_rows));

        for (i, bucket) in self.buckets.iter().skip(start).take(visible_rows).enumerate() {
            let row = Rect {
                y: table.y + 2 + i as u16,
                height: 1,
                ..table
            };
            self.render_row(row, buf, bucket, max);
        }
    }
}
