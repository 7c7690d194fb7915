//! Loading spinner widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

use crate::tui::theme::Theme;

/// Spinner animation frames
const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

const APP_NAME: &str = "rctrack";
const TAGLINE: &str = "Hive account claim cost tracker";

/// What the background load is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingStage {
    #[default]
    Fetching,
    Refreshing,
}

impl LoadingStage {
    pub fn message(self) -> &'static str {
        match self {
            Self::Fetching => "Fetching cost history...",
            Self::Refreshing => "Refreshing...",
        }
    }
}

/// Loading spinner widget
pub struct Spinner {
    frame: usize,
    stage: LoadingStage,
    theme: Theme,
}

impl Spinner {
    pub fn new(frame: usize, stage: LoadingStage, theme: Theme) -> Self {
        Self {
            frame,
            stage,
            theme,
        }
    }

    pub fn current_char(&self) -> char {
        SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()]
    }

    /// Advance to next frame, returning the new frame index
    pub fn next_frame(frame: usize) -> usize {
        (frame + 1) % SPINNER_FRAMES.len()
    }
}

/// x that centers `text` in `area`
fn centered_x(area: Rect, text: &str) -> u16 {
    area.x + (area.width.saturating_sub(text.chars().count() as u16)) / 2
}

impl Widget for Spinner {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 5 || area.width < 35 {
            return;
        }

        // name, tagline, blank, spinner
        let name_y = (area.y + area.height / 2).saturating_sub(2);
        buf.set_string(
            centered_x(area, APP_NAME),
            name_y,
            APP_NAME,
            Style::default()
                .fg(self.theme.text())
                .add_modifier(Modifier::BOLD),
        );
        buf.set_string(
            centered_x(area, TAGLINE),
            name_y + 1,
            TAGLINE,
            Style::default().fg(self.theme.muted()),
        );

        let status = format!("{} {}", self.current_char(), self.stage.message());
        buf.set_string(
            centered_x(area, &status),
            name_y + 3,
            &status,
            Style::default().fg(self.theme.accent()),
        );
    }
}
