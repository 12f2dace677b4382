//! All UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use sentinel_core::{FeedState, Notification};

use crate::screen::ScreenId;

#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ──
    SwitchScreen(ScreenId),
    ToggleHelp,

    // ── Search ──
    OpenSearch,
    CloseSearch,
    SearchInput(String),
    SearchSubmit,

    // ── Feed control ──
    ToggleLive,
    Refresh,
    /// A manual refresh failed; the published state carries the details.
    RefreshFailed(String),
    DismissNewest,
    DismissAll,

    // ── Data (from the bridge) ──
    FeedUpdated(Arc<FeedState>),
    NotificationsUpdated(Arc<Vec<Notification>>),
    LiveChanged(bool),
}

impl Action {
    /// Data updates are broadcast to every screen, not just the active one.
    pub fn is_data_update(&self) -> bool {
        matches!(
            self,
            Self::FeedUpdated(_) | Self::NotificationsUpdated(_) | Self::LiveChanged(_)
        )
    }
}
