//! Help popup widget - displays keyboard shortcuts

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use crate::tui::theme::Theme;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const POPUP_WIDTH: u16 = 44;
const POPUP_HEIGHT: u16 = 19;

const VIEW_KEYS: &[(&str, &str)] = &[
    ("Tab / Shift+Tab", "Switch tab"),
    ("1-3", "Jump to tab"),
    ("d / w / m", "Daily/Weekly/Monthly"),
    ("+ / -", "Smoothing window"),
    ("Up/Down or j/k", "Scroll (Buckets)"),
];

const GENERAL_KEYS: &[(&str, &str)] = &[
    ("r", "Refresh data"),
    ("?", "Toggle help"),
    ("q / Esc", "Quit"),
];

/// Help popup widget showing keyboard shortcuts
pub struct HelpPopup {
    theme: Theme,
}

impl HelpPopup {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    /// Calculate centered popup area
    pub fn centered_area(area: Rect) -> Rect {
        let x = area.x + (area.width.saturating_sub(POPUP_WIDTH)) / 2;
        let y = area.y + (area.height.saturating_sub(POPUP_HEIGHT)) / 2;
        Rect {
            x,
            y,
            width: POPUP_WIDTH.min(area.width),
            height: POPUP_HEIGHT.min(area.height),
        }
    }

    fn section(&self, title: &'static str, keys: &[(&str, &str)], width: u16) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(Span::styled(
                title,
                Style::default()
                    .fg(self.theme.date())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "─".repeat(width as usize),
                Style::default().fg(self.theme.muted()),
            )),
        ];
        lines.extend(keys.iter().map(|(key, desc)| {
            Line::from(vec![
                Span::styled(
                    format!("  {:<18}", key),
                    Style::default().fg(self.theme.accent()),
                ),
                Span::styled(desc.to_string(), Style::default().fg(self.theme.text())),
            ])
        }));
        lines
    }
}

impl Widget for HelpPopup {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // overlay
        Clear.render(area, buf);

        let block = Block::default()
            .title(format!(" rctrack v{} ", VERSION))
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.accent()));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines = vec![Line::default()];
        lines.extend(self.section("View", VIEW_KEYS, inner.width));
        lines.push(Line::default());
        lines.extend(self.section("General", GENERAL_KEYS, inner.width));
        lines.push(Line::default());
        lines.push(
            Line::from(Span::styled(
                "Press ? to close",
                Style::default().fg(self.theme.muted()),
            ))
            .alignment(Alignment::Center),
        );

        Paragraph::new(lines).render(inner, buf);
    }
}
