//! Live incident synchronization between `sentinel-api` and UI consumers
//! (CLI / TUI).
//!
//! - **[`IncidentFeed`]** -- Polls the backend on a timer while the
//!   [`LiveFlag`] is on, publishes each snapshot with the number of newly
//!   arrived incidents, and keeps the last good snapshot when a fetch fails.
//!   Fetches are sequence-numbered so late responses never win.
//!
//! - **[`LiveFlag`]** -- Explicit shared on/off handle for auto-refresh.
//!   Cloned into the feed and every surface that shows or flips it.
//!
//! - **[`NotificationQueue`]** -- Derives short-lived alerts from feed
//!   snapshots whenever the newest incident changes, with a bounded list,
//!   auto-expiry, dismissal, and an [`AlertTone`] hook for severe incidents.
//!
//! - **Domain model** ([`model`]), client-side [`filter`]ing and
//!   [`summary`] statistics for table and dashboard views.

pub mod config;
pub mod convert;
pub mod error;
pub mod feed;
pub mod filter;
pub mod live;
pub mod model;
pub mod notify;
pub mod stream;
pub mod summary;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{Credentials, FeedConfig, TlsVerification};
pub use error::{CoreError, FeedErrorKind};
pub use feed::{FeedState, HttpSource, IncidentFeed, IncidentSource, PollSettings, Snapshot};
pub use filter::{IncidentFilter, Period, SortField, SortOrder};
pub use live::LiveFlag;
pub use model::{Incident, IncidentId, Severity};
pub use notify::{
    ALERT_TONE, AlertTone, Notification, NotificationQueue, NotificationSettings, SilentTone,
    ToneSpec,
};
pub use stream::{FeedStream, NotificationStream, StateStream};
pub use summary::IncidentSummary;
