//! Live badge -- ●/⏸ with new-count, freshness and last error.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use sentinel_core::FeedState;

use crate::theme;

/// "updated 12s ago", rounded to whole seconds.
pub fn updated_ago(last_update: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = last_update else {
        return "never updated".into();
    };
    let secs = (now - at).num_seconds().max(0).unsigned_abs();
    if secs == 0 {
        return "updated just now".into();
    }
    format!(
        "updated {} ago",
        humantime::format_duration(Duration::from_secs(secs))
    )
}

/// Status-bar badge for the feed.
pub fn live_badge(live: bool, state: &FeedState, now: DateTime<Utc>) -> Line<'static> {
    let mut spans = Vec::with_capacity(6);

    spans.push(if live {
        Span::styled(
            "● LIVE",
            Style::default()
                .fg(theme::SUCCESS_GREEN)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("⏸ PAUSED", Style::default().fg(theme::ELECTRIC_YELLOW))
    });

    if state.loading {
        spans.push(Span::styled(" ⟳", Style::default().fg(theme::NEON_CYAN)));
    }

    if state.new_count > 0 {
        spans.push(Span::styled(
            format!("  +{} new", state.new_count),
            Style::default()
                .fg(theme::CORAL)
                .add_modifier(Modifier::BOLD),
        ));
    }

    spans.push(Span::styled(
        format!("  {}", updated_ago(state.last_update, now)),
        theme::key_hint(),
    ));

    if let Some(ref err) = state.error {
        spans.push(Span::styled(
            format!("  ✗ {} error", err.kind()),
            Style::default().fg(theme::ERROR_RED),
        ));
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;
    use sentinel_core::CoreError;

    use super::*;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn freshness_is_human_readable() {
        let now = Utc::now();
        assert_eq!(updated_ago(None, now), "never updated");
        assert_eq!(updated_ago(Some(now), now), "updated just now");
        assert_eq!(
            updated_ago(Some(now - TimeDelta::seconds(75)), now),
            "updated 1m 15s ago"
        );
    }

    #[test]
    fn badge_shows_paused_new_count_and_error() {
        let now = Utc::now();
        let state = FeedState {
            new_count: 3,
            last_update: Some(now - TimeDelta::seconds(12)),
            error: Some(CoreError::Network {
                message: "refused".into(),
            }),
            ..FeedState::default()
        };
        let rendered = text(&live_badge(false, &state, now));
        assert_eq!(
            rendered,
            "⏸ PAUSED  +3 new  updated 12s ago  ✗ network error"
        );
    }

    #[test]
    fn quiet_live_badge() {
        let now = Utc::now();
        let rendered = text(&live_badge(true, &FeedState::default(), now));
        assert_eq!(rendered, "● LIVE  never updated");
    }
}
