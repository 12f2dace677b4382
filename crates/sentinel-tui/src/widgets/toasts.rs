//! Notification tray -- stacked toasts in the top-right corner.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};

use sentinel_core::Notification;

use crate::theme;

const TOAST_WIDTH: u16 = 48;
/// Border + heading + message + countdown bar + border.
const TOAST_HEIGHT: u16 = 5;

/// Areas for up to `count` toasts, newest at the top, right-aligned.
///
/// Stops early when the next toast would not fit vertically.
pub fn toast_areas(area: Rect, count: usize) -> Vec<Rect> {
    let width = TOAST_WIDTH.min(area.width.saturating_sub(2));
    if width < 12 {
        return Vec::new();
    }
    let x = area.x + area.width.saturating_sub(width + 1);

    let mut areas = Vec::with_capacity(count);
    let mut y = area.y + 1;
    for _ in 0..count {
        if y + TOAST_HEIGHT > area.y + area.height {
            break;
        }
        areas.push(Rect::new(x, y, width, TOAST_HEIGHT));
        y += TOAST_HEIGHT;
    }
    areas
}

/// Countdown bar: `filled` of `width` cells, proportional to `ratio`.
pub fn remaining_bar(ratio: f64, width: u16) -> String {
    let ratio = ratio.clamp(0.0, 1.0);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::as_conversions
    )]
    let filled = (ratio * f64::from(width)).round() as usize;
    let width = usize::from(width);
    format!("{}{}", "━".repeat(filled), "─".repeat(width - filled.min(width)))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Draw the active notifications over whatever is underneath.
pub fn render_tray(frame: &mut Frame, area: Rect, notifications: &[Notification]) {
    for (toast_area, note) in toast_areas(area, notifications.len())
        .into_iter()
        .zip(notifications)
    {
        render_toast(frame, toast_area, note);
    }
}

fn render_toast(frame: &mut Frame, area: Rect, note: &Notification) {
    let incident = &note.incident;
    let color = theme::severity_color(incident.severity);

    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(theme::BG_DARK))
        .title(Span::styled(
            " New incident ",
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text_width = usize::from(inner.width.saturating_sub(1));
    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" {} ", incident.severity.as_ref().to_uppercase()),
                theme::severity_style(incident.severity),
            ),
            Span::styled(
                truncate(
                    &format!("{} · {}", incident.kind_or_default(), incident.source_or_default()),
                    text_width.saturating_sub(10),
                ),
                Style::default().fg(theme::DIM_WHITE),
            ),
        ]),
        Line::from(Span::styled(
            format!(" {}", truncate(incident.message_or_default(), text_width)),
            theme::table_row(),
        )),
        Line::from(Span::styled(
            format!(
                " {}",
                remaining_bar(note.remaining_ratio(), inner.width.saturating_sub(2))
            ),
            Style::default().fg(color),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}
