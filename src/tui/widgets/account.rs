//! Account tab: RC gauge and claim capacity for `--user`

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget},
};

use crate::services::claims::{claim_capacity, format_amount, format_thousands};
use crate::tui::theme::Theme;
use crate::types::AccountRc;

/// Max gauge width so it stays readable on wide terminals
const GAUGE_WIDTH: u16 = 60;

/// Account status as loaded alongside the cost history
pub enum AccountStatus<'a> {
    /// No `--user` given
    NotRequested,
    Loaded {
        username: &'a str,
        account: &'a AccountRc,
        estimate: Option<f64>,
    },
    Failed {
        username: &'a str,
        message: &'a str,
    },
}

pub struct AccountView<'a> {
    status: AccountStatus<'a>,
    theme: Theme,
}

impl<'a> AccountView<'a> {
    pub fn new(status: AccountStatus<'a>, theme: Theme) -> Self {
        Self { status, theme }
    }

    fn render_message(&self, area: Rect, buf: &mut Buffer, lines: Vec<Line>) {
        let y = area.y + area.height.saturating_sub(lines.len() as u16) / 2;
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(Rect { y, ..area }, buf);
    }
}

impl Widget for AccountView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        let (username, account, estimate) = match self.status {
            AccountStatus::NotRequested => {
                let lines = vec![
                    Line::from(Span::styled(
                        "No account selected.",
                        Style::default().fg(self.theme.text()),
                    )),
                    Line::from(vec![
                        Span::styled("Run ", Style::default().fg(self.theme.muted())),
                        Span::styled(
                            "rctrack tui --user <name>",
                            Style::default().fg(self.theme.accent()),
                        ),
                        Span::styled(
                            " to see RC status.",
                            Style::default().fg(self.theme.muted()),
                        ),
                    ]),
                ];
                self.render_message(area, buf, lines);
                return;
            }
            AccountStatus::Failed { username, message } => {
                let lines = vec![
                    Line::from(Span::styled(
                        username.to_string(),
                        Style::default()
                            .fg(self.theme.text())
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        format!("Error: {}", message),
                        Style::default().fg(self.theme.error()),
                    )),
                ];
                self.render_message(area, buf, lines);
                return;
            }
            AccountStatus::Loaded {
                username,
                account,
                estimate,
            } => (username, account, estimate),
        };

        let capacity = claim_capacity(&account.manabar, estimate);
        let width = area.width.min(GAUGE_WIDTH);
        let column = Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            width,
            ..area
        };
        let chunks = Layout::vertical([
            Constraint::Length(1), // Padding
            Constraint::Length(1), // Username
            Constraint::Length(1), // RC numbers
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Padding
            Constraint::Length(1), // Capacity
            Constraint::Length(1), // Pending claims
            Constraint::Min(0),
        ])
        .split(column);

        Paragraph::new(Line::from(Span::styled(
            username.to_string(),
            Style::default()
                .fg(self.theme.text())
                .add_modifier(Modifier::BOLD),
        )))
        .render(chunks[1], buf);

        Paragraph::new(Line::from(vec![
            Span::styled("RC: ", Style::default().fg(self.theme.muted())),
            Span::styled(
                format!(
                    "{} / {}",
                    format_thousands(capacity.current_mana),
                    format_thousands(capacity.max_mana)
                ),
                Style::default().fg(self.theme.cost()),
            ),
        ]))
        .render(chunks[2], buf);

        Gauge::default()
            .gauge_style(Style::default().fg(self.theme.bar()))
            .percent(u16::from(capacity.percent))
            .label(format!("{}%", capacity.percent))
            .render(chunks[3], buf);

        let verdict = if capacity.sufficient {
            Span::styled(
                format!(
                    "Enough RC to claim {} account(s) at ~{} RC each",
                    capacity.max_claims,
                    format_amount(capacity.estimated_cost)
                ),
                Style::default().fg(self.theme.bar()),
            )
        } else if capacity.estimated_cost > 0.0 {
            Span::styled(
                format!(
                    "Not enough RC: need {} to claim 1 account",
                    format_amount(capacity.estimated_cost)
                ),
                Style::default().fg(self.theme.error()),
            )
        } else {
            Span::styled(
                "No cost estimate available",
                Style::default().fg(self.theme.muted()),
            )
        };
        Paragraph::new(Line::from(verdict)).render(chunks[5], buf);

        if let Some(n) = account.claims {
            Paragraph::new(Line::from(Span::styled(
                format!(
                    "{} claimed account{} ready to use",
                    n,
                    if n == 1 { "" } else { "s" }
                ),
                Style::default().fg(self.theme.text()),
            )))
            .render(chunks[6], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RcManabar;

    fn buffer_text(buf: &Buffer) -> String {
        let area = buf.area;
        (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|pos| buf[pos].symbol().to_string())
            .collect()
    }

    fn render(status: AccountStatus) -> String {
        let area = Rect::new(0, 0, 80, 10);
        let mut buf = Buffer::empty(area);
        AccountView::new(status, Theme::Dark).render(area, &mut buf);
        buffer_text(&buf)
    }

    #[test]
    fn test_not_requested_shows_hint() {
        assert!(render(AccountStatus::NotRequested).contains("--user"));
    }

    #[test]
    fn test_failed_shows_error() {
        let text = render(AccountStatus::Failed {
            username: "ghost",
            message: "account not found",
        });
        assert!(text.contains("Error: account not found"));
    }

    #[test]
    fn test_loaded_shows_capacity() {
        let account = AccountRc {
            manabar: RcManabar {
                current_mana: 9_000,
                max_mana: 10_000,
            },
            claims: Some(2),
        };
        let text = render(AccountStatus::Loaded {
            username: "alice",
            account: &account,
            estimate: Some(2_000.0),
        });
        assert!(text.contains("9,000 / 10,000"));
        assert!(text.contains("90%"));
        assert!(text.contains("claim 4 account(s)"));
        assert!(text.contains("2 claimed accounts ready"));
    }

    #[test]
    fn test_loaded_without_estimate() {
        let account = AccountRc {
            manabar: RcManabar {
                current_mana: 10,
                max_mana: 100,
            },
            claims: None,
        };
        let text = render(AccountStatus::Loaded {
            username: "bob",
            account: &account,
            estimate: None,
        });
        assert!(text.contains("No cost estimate available"));
    }
}
