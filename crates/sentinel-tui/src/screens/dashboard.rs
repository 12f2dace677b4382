//! Dashboard screen -- summary cards over the latest incidents.

use std::sync::Arc;

use chrono::{Local, Utc};
use color_eyre::eyre::Result;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use sentinel_core::{FeedState, IncidentSummary, Severity};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

/// How many incidents the "Latest" panel lists.
const LATEST_ROWS: usize = 12;

pub struct DashboardScreen {
    focused: bool,
    state: Arc<FeedState>,
    summary: IncidentSummary,
}

impl DashboardScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            state: Arc::default(),
            summary: IncidentSummary::default(),
        }
    }

    fn recompute(&mut self) {
        self.summary = IncidentSummary::from_incidents(&self.state.incidents, Utc::now());
    }

    fn render_cards(&self, frame: &mut Frame, area: Rect) {
        let s = &self.summary;
        let trend = s
            .trend_percent()
            .map_or_else(|| "n/a".to_owned(), |pct| format!("{pct:+.0}%"));

        let cards: [(&str, String, Color); 6] = [
            ("Total", s.total.to_string(), theme::NEON_CYAN),
            ("Critical", s.critical.to_string(), theme::severity_color(Severity::Critical)),
            ("High", s.high.to_string(), theme::severity_color(Severity::High)),
            ("Anomalies", s.anomalies.to_string(), theme::CORAL),
            ("Last hour", s.last_hour.to_string(), theme::ELECTRIC_PURPLE),
            ("Last 24h", format!("{} ({trend})", s.last_24h), theme::ELECTRIC_PURPLE),
        ];

        let columns = Layout::horizontal([Constraint::Ratio(1, 6); 6]).split(area);
        for ((label, value, color), col) in cards.into_iter().zip(columns.iter()) {
            let block = Block::default()
                .title(format!(" {label} "))
                .title_style(theme::key_hint())
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(color));
            let text = Paragraph::new(Line::from(Span::styled(
                value,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )))
            .block(block)
            .centered();
            frame.render_widget(text, *col);
        }
    }

    fn render_latest(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(" Latest incidents ({}) ", self.state.incidents.len()))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines = Vec::with_capacity(LATEST_ROWS + 2);
        if let Some(ref err) = self.state.error {
            lines.push(Line::from(Span::styled(
                format!("  ✗ {err} -- showing last good data"),
                Style::default().fg(theme::ERROR_RED),
            )));
        }

        if !self.state.has_snapshot() {
            let msg = if self.state.loading {
                "  Loading incidents..."
            } else {
                "  Waiting for the first fetch..."
            };
            lines.push(Line::from(Span::styled(msg, theme::key_hint())));
        } else if self.state.incidents.is_empty() {
            lines.push(Line::from(Span::styled("  No incidents", theme::key_hint())));
        }

        let msg_width = usize::from(inner.width.saturating_sub(42)).max(10);
        for incident in self.state.incidents.iter().take(LATEST_ROWS) {
            let time = incident.timestamp.with_timezone(&Local).format("%H:%M:%S");
            let message: String = incident.message_or_default().chars().take(msg_width).collect();
            lines.push(Line::from(vec![
                Span::styled(format!("  {time}  "), Style::default().fg(theme::ELECTRIC_YELLOW)),
                Span::styled(
                    format!("{:<9}", incident.severity.as_ref().to_uppercase()),
                    theme::severity_style(incident.severity),
                ),
                Span::styled(
                    format!("{:<14}", incident.kind_or_default()),
                    Style::default().fg(theme::NEON_CYAN),
                ),
                Span::styled(message, theme::table_row()),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Component for DashboardScreen {
    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::FeedUpdated(state) => {
                self.state = Arc::clone(state);
                self.recompute();
            }
            // Time windows slide even without new data.
            Action::Tick => self.recompute(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::vertical([Constraint::Length(3), Constraint::Min(3)]).split(area);
        self.render_cards(frame, layout[0]);
        self.render_latest(frame, layout[1]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
mod tests {
    use sentinel_core::Severity;

    use super::*;
    use crate::testing::incident;

    #[test]
    fn feed_update_refreshes_the_summary() {
        let mut screen = DashboardScreen::new();
        let state = FeedState {
            incidents: Arc::new(vec![
                incident("2", Severity::Critical, 5),
                incident("1", Severity::Low, 90),
            ]),
            sequence: 1,
            ..FeedState::default()
        };
        screen
            .update(&Action::FeedUpdated(Arc::new(state)))
            .expect("update");
        assert_eq!(screen.summary.total, 2);
        assert_eq!(screen.summary.critical, 1);
        assert_eq!(screen.summary.last_hour, 1);
    }
}
