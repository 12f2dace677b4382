// ── Live toggle ──
//
// Single source of truth for "is auto-refresh on". An explicit handle,
// cloned into the feed and into every surface that shows or flips it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::info;

/// Shared on/off flag for periodic fetching.
///
/// Cheap to clone; all clones share one value. Writes are visible to
/// every reader as soon as the call returns. Starts out live and is
/// never persisted.
#[derive(Clone, Debug)]
pub struct LiveFlag {
    inner: Arc<LiveInner>,
}

#[derive(Debug)]
struct LiveInner {
    tx: watch::Sender<bool>,
    /// Number of off -> on transitions. `watch` coalesces values, so a
    /// quick off/on pair is only visible through this counter.
    resumes: AtomicU64,
}

impl Default for LiveFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LiveFlag {
    pub fn new(initial: bool) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            inner: Arc::new(LiveInner {
                tx,
                resumes: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_live(&self) -> bool {
        *self.inner.tx.borrow()
    }

    /// How many times the flag has gone from off to on.
    pub fn resumes(&self) -> u64 {
        self.inner.resumes.load(Ordering::SeqCst)
    }

    /// Flip the flag, returning the new value.
    pub fn toggle(&self) -> bool {
        let mut now = false;
        self.inner.tx.send_modify(|live| {
            *live = !*live;
            now = *live;
            if now {
                self.inner.resumes.fetch_add(1, Ordering::SeqCst);
            }
        });
        info!(live = now, "live mode toggled");
        now
    }

    /// Set the flag explicitly. Subscribers are only woken on an actual
    /// change.
    pub fn set_live(&self, live: bool) {
        let changed = self.inner.tx.send_if_modified(|current| {
            if *current == live {
                return false;
            }
            if live {
                self.inner.resumes.fetch_add(1, Ordering::SeqCst);
            }
            *current = live;
            true
        });
        if changed {
            info!(live, "live mode set");
        }
    }

    /// Watch the flag. The receiver starts with the current value marked
    /// as seen.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.tx.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn live_by_default() {
        assert!(LiveFlag::default().is_live());
    }

    #[test]
    fn clones_share_state() {
        let a = LiveFlag::default();
        let b = a.clone();
        assert!(!a.toggle());
        assert!(!b.is_live());
        b.set_live(true);
        assert!(a.is_live());
    }

    #[tokio::test]
    async fn set_to_same_value_does_not_wake_subscribers() {
        let flag = LiveFlag::new(true);
        let mut rx = flag.subscribe();
        flag.set_live(true);
        assert!(!rx.has_changed().unwrap());
        flag.set_live(false);
        assert!(rx.has_changed().unwrap());
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());
    }

    #[test]
    fn resumes_count_off_to_on_edges() {
        let flag = LiveFlag::new(true);
        let mut rx = flag.subscribe();
        flag.set_live(true);
        assert_eq!(flag.resumes(), 0);

        flag.set_live(false);
        flag.toggle();
        // The receiver only sees `true` again, the counter keeps the edge.
        assert!(*rx.borrow_and_update());
        assert_eq!(flag.resumes(), 1);

        flag.toggle();
        assert_eq!(flag.resumes(), 1);
    }
}
