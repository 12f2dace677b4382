//! Application core -- event loop, screen management, action dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Tabs},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sentinel_core::{FeedState, IncidentFeed, LiveFlag, Notification, NotificationQueue};

use crate::action::Action;
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::theme;
use crate::tui::Tui;
use crate::widgets::{live_indicator, toasts};

/// How long a transient status message stays in the status bar.
const STATUS_TTL: Duration = Duration::from_secs(5);

pub struct App {
    active_screen: ScreenId,
    screens: HashMap<ScreenId, Box<dyn Component>>,
    running: bool,
    help_visible: bool,
    search_active: bool,
    search_query: String,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,

    feed: IncidentFeed,
    queue: NotificationQueue,
    live: LiveFlag,
    /// Label shown in the status bar (profile name or URL).
    target: String,

    // Latest values mirrored from the data bridge for the status bar.
    feed_state: Arc<FeedState>,
    notifications: Arc<Vec<Notification>>,
    live_on: bool,
    status_message: Option<(String, Instant)>,

    /// Cancels the data bridge and the notification runner.
    data_cancel: CancellationToken,
}

impl App {
    pub fn new(feed: IncidentFeed, queue: NotificationQueue, target: String) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let live = feed.live().clone();
        let live_on = live.is_live();

        Self {
            active_screen: ScreenId::Dashboard,
            screens: create_screens().into_iter().collect(),
            running: true,
            help_visible: false,
            search_active: false,
            search_query: String::new(),
            action_tx,
            action_rx,
            feed_state: feed.state(),
            notifications: queue.active(),
            feed,
            queue,
            live,
            target,
            live_on,
            status_message: None,
            data_cancel: CancellationToken::new(),
        }
    }

    /// Run until the user quits. Tears down the bridge, the notification
    /// runner and the feed before returning.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }

        let runner = tokio::spawn({
            let queue = self.queue.clone();
            let stream = self.feed.subscribe();
            let cancel = self.data_cancel.child_token();
            async move { queue.run(stream, cancel).await }
        });
        let bridge = tokio::spawn(crate::data_bridge::spawn_data_bridge(
            self.feed.subscribe(),
            self.queue.subscribe(),
            self.live.clone(),
            self.action_tx.clone(),
            self.data_cancel.child_token(),
        ));
        self.feed.start().await;

        let mut events = EventReader::new(
            Duration::from_millis(250),
            Duration::from_millis(33),
        );

        info!(endpoint = %self.target, "dashboard running");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        self.data_cancel.cancel();
        let _ = tokio::join!(bridge, runner);
        self.feed.stop().await;
        info!("TUI event loop ended");
        Ok(())
    }

    /// Search and help modes swallow keys first, then the global bindings,
    /// then the active screen.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        // Search input captures every other key.
        if self.search_active {
            return Ok(match key.code {
                KeyCode::Esc => {
                    self.search_query.clear();
                    Some(Action::CloseSearch)
                }
                KeyCode::Enter => Some(Action::SearchSubmit),
                KeyCode::Backspace => {
                    self.search_query.pop();
                    Some(Action::SearchInput(self.search_query.clone()))
                }
                KeyCode::Char(c) => {
                    self.search_query.push(c);
                    Some(Action::SearchInput(self.search_query.clone()))
                }
                _ => None,
            });
        }

        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),
            (KeyModifiers::NONE, KeyCode::Char('/')) => return Ok(Some(Action::OpenSearch)),

            // Feed control
            (KeyModifiers::NONE, KeyCode::Char('l')) => return Ok(Some(Action::ToggleLive)),
            (KeyModifiers::NONE, KeyCode::Char('r')) => return Ok(Some(Action::Refresh)),
            (KeyModifiers::NONE, KeyCode::Char('d')) => return Ok(Some(Action::DismissNewest)),
            (KeyModifiers::SHIFT, KeyCode::Char('D')) | (KeyModifiers::NONE, KeyCode::Char('D')) => {
                return Ok(Some(Action::DismissAll));
            }

            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='9')) => {
                let n = u8::try_from(c).map_or(0, |b| b - b'0');
                if let Some(screen) = ScreenId::from_number(n) {
                    return Ok(Some(Action::SwitchScreen(screen)));
                }
            }
            (KeyModifiers::NONE, KeyCode::Tab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }
            (KeyModifiers::SHIFT, KeyCode::BackTab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
            }
            _ => {}
        }

        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }
        Ok(None)
    }

    /// Update app state for one action and propagate it to components.
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::Tick => {
                if self
                    .status_message
                    .as_ref()
                    .is_some_and(|(_, at)| at.elapsed() >= STATUS_TTL)
                {
                    self.status_message = None;
                }
            }

            Action::SwitchScreen(target) => self.switch_screen(*target),

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::OpenSearch => {
                self.search_active = true;
                self.switch_screen(ScreenId::Incidents);
            }
            Action::CloseSearch => {
                self.search_active = false;
                self.action_tx.send(Action::SearchInput(String::new()))?;
            }
            Action::SearchSubmit => self.search_active = false,

            Action::ToggleLive => {
                let on = self.live.toggle();
                info!(live = on, "live toggled");
            }

            Action::Refresh => {
                let feed = self.feed.clone();
                let tx = self.action_tx.clone();
                self.status_message = Some(("refreshing...".into(), Instant::now()));
                tokio::spawn(async move {
                    if let Err(e) = feed.fetch_once().await {
                        warn!(error = %e, "manual refresh failed");
                        let _ = tx.send(Action::RefreshFailed(e.to_string()));
                    }
                });
            }
            Action::RefreshFailed(message) => {
                self.status_message = Some((format!("refresh failed: {message}"), Instant::now()));
            }

            Action::DismissNewest => {
                if let Some(newest) = self.notifications.first() {
                    self.queue.dismiss(newest.id);
                }
            }
            Action::DismissAll => self.queue.dismiss_all(),

            Action::FeedUpdated(state) => {
                if state.error.is_none() && self.status_message.is_some() && !state.loading {
                    self.status_message = None;
                }
                self.feed_state = Arc::clone(state);
            }
            Action::NotificationsUpdated(active) => self.notifications = Arc::clone(active),
            Action::LiveChanged(on) => self.live_on = *on,

            Action::Render | Action::Resize(..) | Action::SearchInput(_) => {}
        }

        // Data and clock updates reach every screen; the rest only the active one.
        let follow_ups = if action.is_data_update() || matches!(action, Action::Tick) {
            let mut out = Vec::new();
            for screen in self.screens.values_mut() {
                if let Some(next) = screen.update(action)? {
                    out.push(next);
                }
            }
            out
        } else if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.update(action)?.into_iter().collect()
        } else {
            Vec::new()
        };
        for next in follow_ups {
            self.action_tx.send(next)?;
        }
        Ok(())
    }

    fn switch_screen(&mut self, target: ScreenId) {
        if target == self.active_screen {
            return;
        }
        debug!(from = %self.active_screen, to = %target, "switch screen");
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(false);
        }
        self.active_screen = target;
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let layout = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, layout[0]);
        }
        self.render_tab_bar(frame, layout[1]);
        self.render_status_bar(frame, layout[2]);

        toasts::render_tray(frame, layout[0], &self.notifications);

        if self.help_visible {
            render_help_overlay(frame, area);
        }
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                Line::from(Span::styled(format!(" {} {} ", id.number(), id.label()), style))
            })
            .collect();

        let tabs = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(
                ScreenId::ALL
                    .iter()
                    .position(|&s| s == self.active_screen)
                    .unwrap_or(0),
            );
        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        if self.search_active {
            let line = Line::from(vec![
                Span::styled(" / ", Style::default().fg(theme::ELECTRIC_PURPLE)),
                Span::styled(&self.search_query, Style::default().fg(theme::NEON_CYAN)),
                Span::styled("█", Style::default().fg(theme::NEON_CYAN)),
                Span::styled("  Esc cancel  Enter keep", theme::key_hint()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            return;
        }

        let mut spans = vec![Span::raw(" ")];
        spans.extend(live_indicator::live_badge(self.live_on, &self.feed_state, Utc::now()).spans);
        spans.push(Span::styled(format!("  {}", self.target), theme::key_hint()));

        if let Some((ref message, _)) = self.status_message {
            spans.push(Span::styled(
                format!("  {message}"),
                Style::default().fg(theme::ELECTRIC_YELLOW),
            ));
        }

        spans.push(Span::styled(" │", theme::key_hint()));
        let screen_hints = self
            .screens
            .get(&self.active_screen)
            .map(|s| s.hints())
            .unwrap_or_default();
        for (key, label) in screen_hints
            .iter()
            .chain([("l", "live"), ("r", "refresh"), ("?", "help"), ("q", "quit")].iter())
        {
            spans.push(Span::styled(format!(" {key}"), theme::key_hint_key()));
            spans.push(Span::styled(format!(" {label}"), theme::key_hint()));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

fn help_row(key: &'static str, label: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
        Span::styled(label, theme::key_hint()),
    ])
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = 56u16.min(area.width.saturating_sub(4));
    let height = 24u16.min(area.height.saturating_sub(2));
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    let help_area = Rect::new(area.x + x, area.y + y, width, height);

    frame.render_widget(Clear, help_area);
    let block = Block::default()
        .title(" Keyboard Shortcuts ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused())
        .style(Style::default().bg(theme::BG_DARK));
    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            format!("  {title}"),
            Style::default().fg(theme::NEON_CYAN),
        ))
    };
    let lines = vec![
        section("Feed"),
        help_row("l", "Toggle live polling"),
        help_row("r", "Refresh now"),
        help_row("d", "Dismiss newest notification"),
        help_row("D", "Dismiss all notifications"),
        Line::from(""),
        section("Navigation"),
        help_row("1-2 Tab", "Switch screen"),
        help_row("j/k ↑/↓", "Move up/down"),
        help_row("g/G", "Top / bottom"),
        help_row("Enter", "Toggle detail pane"),
        Line::from(""),
        section("Incidents"),
        help_row("/", "Search"),
        help_row("s", "Cycle severity filter"),
        help_row("t", "Cycle type filter"),
        help_row("p", "Cycle period"),
        help_row("o / O", "Cycle sort / flip order"),
        help_row("c", "Clear filters"),
        Line::from(""),
        Line::from(Span::styled("  Esc or ? to close", theme::key_hint())),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}
