//! Incidents screen -- filterable, sortable table with a detail pane.

use std::sync::Arc;

use chrono::{Local, Utc};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

use sentinel_core::filter::distinct_kinds;
use sentinel_core::{
    FeedState, Incident, IncidentFilter, IncidentId, Period, Severity, SortField, SortOrder,
};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

const PAGE: isize = 10;

const HINTS: &[(&str, &str)] = &[
    ("s", "severity"),
    ("t", "type"),
    ("p", "period"),
    ("o/O", "sort/order"),
    ("c", "clear"),
    ("Enter", "detail"),
];

/// Severity filter cycle: all → critical → high → medium → low → all.
fn next_severity(current: Option<Severity>) -> Option<Severity> {
    match current {
        None => Some(Severity::Critical),
        Some(Severity::Critical) => Some(Severity::High),
        Some(Severity::High) => Some(Severity::Medium),
        Some(Severity::Medium) => Some(Severity::Low),
        Some(Severity::Low | Severity::Unknown) => None,
    }
}

/// Sort cycle: backend order → timestamp → severity → score → backend order.
fn next_sort(current: Option<(SortField, SortOrder)>) -> Option<(SortField, SortOrder)> {
    match current {
        None => Some((SortField::default(), SortOrder::default())),
        Some((field, _)) if field.next() == SortField::default() => None,
        Some((field, order)) => Some((field.next(), order)),
    }
}

/// Type filter cycle over the types present in the snapshot.
fn next_kind(current: Option<&str>, kinds: &[String]) -> Option<String> {
    let next = match current {
        None => 0,
        Some(kind) => match kinds.iter().position(|k| k.eq_ignore_ascii_case(kind)) {
            Some(idx) => idx + 1,
            None => 0,
        },
    };
    kinds.get(next).cloned()
}

pub struct IncidentsScreen {
    focused: bool,
    state: Arc<FeedState>,
    filter: IncidentFilter,
    visible: Vec<Arc<Incident>>,
    table_state: TableState,
    detail_open: bool,
}

impl IncidentsScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            state: Arc::default(),
            filter: IncidentFilter::default(),
            visible: Vec::new(),
            table_state: TableState::default(),
            detail_open: false,
        }
    }

    fn selected(&self) -> Option<&Arc<Incident>> {
        self.table_state.selected().and_then(|i| self.visible.get(i))
    }

    /// Re-run the filter, keeping the selection on the same incident when
    /// it is still visible.
    fn refilter(&mut self) {
        let keep: Option<IncidentId> = self.selected().map(|i| i.id.clone());
        self.visible = self.filter.apply(&self.state.incidents, Utc::now());

        let idx = keep
            .and_then(|id| self.visible.iter().position(|i| i.id == id))
            .or_else(|| {
                let len = self.visible.len();
                (len > 0).then(|| self.table_state.selected().unwrap_or(0).min(len - 1))
            });
        self.table_state.select(idx);
    }

    fn select(&mut self, idx: usize) {
        let clamped = idx.min(self.visible.len().saturating_sub(1));
        self.table_state
            .select((!self.visible.is_empty()).then_some(clamped));
    }

    fn move_by(&mut self, delta: isize) {
        let current = self.table_state.selected().unwrap_or(0);
        self.select(current.saturating_add_signed(delta));
    }

    fn filter_line(&self) -> Line<'static> {
        let value = |v: String| Span::styled(format!("[{v}]"), Style::default().fg(theme::NEON_CYAN));
        let label = |l: &'static str| Span::styled(l, Style::default().fg(theme::DIM_WHITE));

        let sort = match self.filter.sort {
            None => "feed".to_owned(),
            Some((field, order)) => format!("{field} {order}"),
        };
        let mut spans = vec![
            label("  Severity: "),
            value(self.filter.severity.map_or_else(|| "all".into(), |s| s.to_string())),
            label("  Type: "),
            value(self.filter.kind.clone().unwrap_or_else(|| "all".into())),
            label("  Period: "),
            value(self.filter.period.to_string()),
            label("  Sort: "),
            value(sort),
        ];
        if let Some(q) = self.filter.search.as_deref().filter(|q| !q.is_empty()) {
            spans.push(label("  Search: "));
            spans.push(value(q.to_owned()));
        }
        Line::from(spans)
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let header = Row::new(vec![
            Cell::from("Time").style(theme::table_header()),
            Cell::from("Severity").style(theme::table_header()),
            Cell::from("Type").style(theme::table_header()),
            Cell::from("Source").style(theme::table_header()),
            Cell::from("Score").style(theme::table_header()),
            Cell::from("Message").style(theme::table_header()),
        ]);

        let rows: Vec<Row> = self
            .visible
            .iter()
            .map(|i| {
                let anomaly = if i.is_anomaly { "◆ " } else { "  " };
                Row::new(vec![
                    Cell::from(
                        i.timestamp
                            .with_timezone(&Local)
                            .format("%m-%d %H:%M:%S")
                            .to_string(),
                    )
                    .style(Style::default().fg(theme::ELECTRIC_YELLOW)),
                    Cell::from(format!("{anomaly}{}", i.severity.as_ref().to_uppercase()))
                        .style(theme::severity_style(i.severity)),
                    Cell::from(i.kind_or_default().to_owned())
                        .style(Style::default().fg(theme::NEON_CYAN)),
                    Cell::from(i.source_or_default().to_owned())
                        .style(Style::default().fg(theme::CORAL)),
                    Cell::from(i.score.map(|s| format!("{s:.2}")).unwrap_or_default()),
                    Cell::from(i.message_or_default().to_owned()),
                ])
                .style(theme::table_row())
            })
            .collect();

        let widths = [
            Constraint::Length(15),
            Constraint::Length(11),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(6),
            Constraint::Min(10),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .row_highlight_style(theme::table_selected());

        let mut state = self.table_state;
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Detail ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());

        let Some(i) = self.selected() else {
            frame.render_widget(
                Paragraph::new(Span::styled("  Nothing selected", theme::key_hint())).block(block),
                area,
            );
            return;
        };

        let field = |name: &'static str, value: String| {
            Line::from(vec![
                Span::styled(format!("{name:<10}"), theme::key_hint()),
                Span::styled(value, Style::default().fg(theme::DIM_WHITE)),
            ])
        };
        let mut lines = vec![
            field("ID", i.id.to_string()),
            field(
                "Time",
                i.timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            ),
            Line::from(vec![
                Span::styled(format!("{:<10}", "Severity"), theme::key_hint()),
                Span::styled(
                    i.severity.as_ref().to_uppercase(),
                    theme::severity_style(i.severity),
                ),
            ]),
            field("Type", i.kind_or_default().to_owned()),
            field("Source", i.source_or_default().to_owned()),
            field(
                "Score",
                i.score.map_or_else(|| "-".into(), |s| format!("{s:.3}")),
            ),
            field("Anomaly", if i.is_anomaly { "yes" } else { "no" }.into()),
            Line::from(""),
            Line::from(Span::styled(
                i.message_or_default().to_owned(),
                Style::default()
                    .fg(theme::DIM_WHITE)
                    .add_modifier(Modifier::BOLD),
            )),
        ];
        if let Some(ref values) = i.values {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Values", theme::key_hint())));
            lines.extend(
                format!("{values:#}")
                    .lines()
                    .map(|l| Line::from(Span::styled(l.to_owned(), theme::table_row()))),
            );
        }

        frame.render_widget(
            Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: false }),
            area,
        );
    }
}

impl Component for IncidentsScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match (key.modifiers, key.code) {
            (_, KeyCode::Char('j') | KeyCode::Down) => self.move_by(1),
            (_, KeyCode::Char('k') | KeyCode::Up) => self.move_by(-1),
            (_, KeyCode::Char('g') | KeyCode::Home) => self.select(0),
            (_, KeyCode::Char('G') | KeyCode::End) => self.select(usize::MAX),
            (KeyModifiers::CONTROL, KeyCode::Char('d')) | (_, KeyCode::PageDown) => {
                self.move_by(PAGE);
            }
            (KeyModifiers::CONTROL, KeyCode::Char('u')) | (_, KeyCode::PageUp) => {
                self.move_by(-PAGE);
            }
            (_, KeyCode::Enter) => self.detail_open = !self.detail_open,
            (_, KeyCode::Char('s')) => {
                self.filter.severity = next_severity(self.filter.severity);
                self.refilter();
            }
            (_, KeyCode::Char('t')) => {
                let kinds = distinct_kinds(&self.state.incidents);
                self.filter.kind = next_kind(self.filter.kind.as_deref(), &kinds);
                self.refilter();
            }
            (_, KeyCode::Char('p')) => {
                self.filter.period = self.filter.period.next();
                self.refilter();
            }
            (_, KeyCode::Char('o')) => {
                self.filter.sort = next_sort(self.filter.sort);
                self.refilter();
            }
            (_, KeyCode::Char('O')) => {
                if let Some((field, order)) = self.filter.sort {
                    self.filter.sort = Some((field, order.flip()));
                    self.refilter();
                }
            }
            (_, KeyCode::Char('c')) => {
                self.filter = IncidentFilter::default();
                self.refilter();
            }
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::FeedUpdated(state) => {
                self.state = Arc::clone(state);
                self.refilter();
            }
            Action::SearchInput(query) => {
                self.filter.search = (!query.is_empty()).then(|| query.clone());
                self.refilter();
            }
            Action::Tick if self.filter.period != Period::All => self.refilter(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(
                " Incidents ({}/{}) ",
                self.visible.len(),
                self.state.incidents.len()
            ))
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

        let layout = Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).split(inner);
        frame.render_widget(Paragraph::new(self.filter_line()), layout[0]);

        if self.detail_open {
            let cols = Layout::horizontal([Constraint::Percentage(62), Constraint::Percentage(38)])
                .split(layout[1]);
            self.render_table(frame, cols[0]);
            self.render_detail(frame, cols[1]);
        } else {
            self.render_table(frame, layout[1]);
        }
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn hints(&self) -> &'static [(&'static str, &'static str)] {
        HINTS
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::incident;

    fn press(screen: &mut IncidentsScreen, code: KeyCode) {
        screen
            .handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
            .expect("key");
    }

    fn loaded() -> IncidentsScreen {
        let mut screen = IncidentsScreen::new();
        let state = FeedState {
            incidents: Arc::new(vec![
                incident("4", Severity::Critical, 1),
                incident("3", Severity::Low, 2),
                incident("2", Severity::High, 3),
                incident("1", Severity::Low, 4),
            ]),
            sequence: 1,
            ..FeedState::default()
        };
        screen
            .update(&Action::FeedUpdated(Arc::new(state)))
            .expect("update");
        screen
    }

    fn visible_ids(screen: &IncidentsScreen) -> Vec<String> {
        screen.visible.iter().map(|i| i.id.to_string()).collect()
    }

    #[test]
    fn severity_key_cycles_the_filter() {
        let mut screen = loaded();
        press(&mut screen, KeyCode::Char('s'));
        assert_eq!(visible_ids(&screen), ["4"]);
        press(&mut screen, KeyCode::Char('s'));
        assert_eq!(visible_ids(&screen), ["2"]);
        for _ in 0..3 {
            press(&mut screen, KeyCode::Char('s'));
        }
        assert_eq!(screen.filter.severity, None);
        assert_eq!(visible_ids(&screen).len(), 4);
    }

    #[test]
    fn selection_follows_the_incident_across_updates() {
        let mut screen = loaded();
        press(&mut screen, KeyCode::Char('j'));
        assert_eq!(screen.selected().map(|i| i.id.to_string()), Some("3".into()));

        let mut next = screen.state.incidents.to_vec();
        next.insert(0, incident("5", Severity::Medium, 0));
        let state = FeedState {
            incidents: Arc::new(next),
            sequence: 2,
            new_count: 1,
            ..FeedState::default()
        };
        screen
            .update(&Action::FeedUpdated(Arc::new(state)))
            .expect("update");
        assert_eq!(screen.selected().map(|i| i.id.to_string()), Some("3".into()));
    }

    #[test]
    fn search_input_filters_and_clears() {
        let mut screen = loaded();
        screen
            .update(&Action::SearchInput("incident 2".into()))
            .expect("update");
        assert_eq!(visible_ids(&screen), ["2"]);
        screen.update(&Action::SearchInput(String::new())).expect("update");
        assert_eq!(visible_ids(&screen).len(), 4);
    }

    #[test]
    fn sort_cycles_back_to_feed_order() {
        let mut screen = loaded();
        press(&mut screen, KeyCode::Char('o'));
        assert_eq!(screen.filter.sort, Some((SortField::Timestamp, SortOrder::Desc)));
        press(&mut screen, KeyCode::Char('O'));
        assert_eq!(visible_ids(&screen), ["1", "2", "3", "4"]);
        press(&mut screen, KeyCode::Char('o'));
        press(&mut screen, KeyCode::Char('o'));
        press(&mut screen, KeyCode::Char('o'));
        assert_eq!(screen.filter.sort, None);
        assert_eq!(visible_ids(&screen), ["4", "3", "2", "1"]);
    }

    #[test]
    fn type_filter_cycles_through_present_kinds() {
        let kinds = vec!["spike".to_owned(), "drift".to_owned()];
        assert_eq!(next_kind(None, &kinds).as_deref(), Some("spike"));
        assert_eq!(next_kind(Some("spike"), &kinds).as_deref(), Some("drift"));
        assert_eq!(next_kind(Some("drift"), &kinds), None);
    }

    #[test]
    fn navigation_clamps_to_the_table() {
        let mut screen = loaded();
        press(&mut screen, KeyCode::Char('G'));
        assert_eq!(screen.table_state.selected(), Some(3));
        press(&mut screen, KeyCode::Char('j'));
        assert_eq!(screen.table_state.selected(), Some(3));
        press(&mut screen, KeyCode::Char('g'));
        press(&mut screen, KeyCode::Char('k'));
        assert_eq!(screen.table_state.selected(), Some(0));
    }
}
