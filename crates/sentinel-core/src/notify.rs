// ── Notification queue ──
//
// Watches feed snapshots and raises a transient alert whenever the
// incident at the head of the list changes identity. Alerts expire on
// their own after a fixed delay or can be dismissed early. High and
// critical incidents also trigger an audible cue through `AlertTone`.
//
// "Newest" means index 0 of the snapshot, i.e. whatever the backend
// put first. That relies on the backend's newest-first ordering.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{DEFAULT_NOTIFICATION_CAP, DEFAULT_NOTIFICATION_TTL};
use crate::feed::FeedState;
use crate::model::{Incident, IncidentId};
use crate::stream::{FeedStream, NotificationStream};

// ── Audible cue ──────────────────────────────────────────────────

/// Parameters of the synthesized alert tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: f32,
    pub duration: Duration,
    /// Linear amplitude, 0.0..=1.0.
    pub gain: f32,
}

/// Short sine beep used for high and critical incidents.
pub const ALERT_TONE: ToneSpec = ToneSpec {
    frequency_hz: 800.0,
    duration: Duration::from_millis(300),
    gain: 0.3,
};

/// Emits the audible cue for an alerting incident.
///
/// Called while the queue is being updated, so implementations must
/// return promptly and do any playback in the background.
pub trait AlertTone: Send + Sync {
    fn play(&self, incident: &Incident);
}

/// Tone that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentTone;

impl AlertTone for SilentTone {
    fn play(&self, _incident: &Incident) {}
}

// ── Notification ─────────────────────────────────────────────────

/// A transient alert about one incident.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Local id, unrelated to the incident id.
    pub id: Uuid,
    pub incident: Arc<Incident>,
    pub created_at: DateTime<Utc>,
    created: Instant,
    ttl: Duration,
}

impl Notification {
    fn new(incident: Arc<Incident>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            incident,
            created_at: Utc::now(),
            created: Instant::now(),
            ttl,
        }
    }

    /// Time left before auto-expiry.
    pub fn remaining(&self) -> Duration {
        (self.created + self.ttl).saturating_duration_since(Instant::now())
    }

    /// Fraction of the lifetime still left, 1.0 when fresh.
    pub fn remaining_ratio(&self) -> f64 {
        if self.ttl.is_zero() {
            return 0.0;
        }
        self.remaining().as_secs_f64() / self.ttl.as_secs_f64()
    }
}

impl PartialEq for Notification {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Notification {}

/// Capacity and lifetime of queued notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSettings {
    /// Most notifications kept at once; the oldest is dropped first.
    pub cap: usize,
    /// Lifetime before auto-expiry.
    pub ttl: Duration,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            cap: DEFAULT_NOTIFICATION_CAP,
            ttl: DEFAULT_NOTIFICATION_TTL,
        }
    }
}

// ── NotificationQueue ────────────────────────────────────────────

/// Bounded list of active notifications derived from feed snapshots.
///
/// Cheaply cloneable. Expiry timers run on the Tokio runtime, so
/// [`observe()`](Self::observe) must be called from within one.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    settings: NotificationSettings,
    tone: Arc<dyn AlertTone>,
    active: tokio::sync::watch::Sender<Arc<Vec<Notification>>>,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    /// Head id of the last non-empty snapshot observed.
    last_head: Option<IncidentId>,
    timers: HashMap<Uuid, AbortHandle>,
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        if let Ok(state) = self.state.get_mut() {
            for timer in state.timers.values() {
                timer.abort();
            }
        }
    }
}

impl NotificationQueue {
    pub fn new(settings: NotificationSettings, tone: Arc<dyn AlertTone>) -> Self {
        let (active, _) = tokio::sync::watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(QueueInner {
                settings: NotificationSettings {
                    cap: settings.cap.max(1),
                    ttl: settings.ttl,
                },
                tone,
                active,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn settings(&self) -> NotificationSettings {
        self.inner.settings
    }

    /// Active notifications, newest first.
    pub fn active(&self) -> Arc<Vec<Notification>> {
        self.inner.active.borrow().clone()
    }

    pub fn subscribe(&self) -> NotificationStream {
        NotificationStream::new(self.inner.active.subscribe())
    }

    /// Compare the head of `incidents` with the last head seen and raise
    /// a notification if it changed.
    ///
    /// Empty snapshots are ignored. The first head ever seen only
    /// becomes the baseline.
    pub fn observe(&self, incidents: &[Arc<Incident>]) -> Option<Notification> {
        let head = incidents.first()?;
        let settings = self.inner.settings;

        let mut state = self.inner.state.lock().expect("notification state poisoned");
        match state.last_head.replace(head.id.clone()) {
            None => {
                debug!(id = %head.id, "notification baseline recorded");
                return None;
            }
            Some(previous) if previous == head.id => return None,
            Some(_) => {}
        }

        let notification = Notification::new(Arc::clone(head), settings.ttl);
        let mut trimmed = Vec::new();
        self.inner.active.send_modify(|list| {
            let keep = settings.cap - 1;
            let mut next = Vec::with_capacity(settings.cap);
            next.push(notification.clone());
            next.extend(list.iter().take(keep).cloned());
            trimmed.extend(list.iter().skip(keep).map(|n| n.id));
            *list = Arc::new(next);
        });
        for id in trimmed {
            if let Some(timer) = state.timers.remove(&id) {
                timer.abort();
            }
        }

        let timer = spawn_expiry(Arc::downgrade(&self.inner), notification.id, settings.ttl);
        state.timers.insert(notification.id, timer);
        drop(state);

        info!(
            incident = %head.id,
            severity = %head.severity,
            "new incident notification"
        );
        if head.severity.is_alerting() {
            self.inner.tone.play(head);
        }
        Some(notification)
    }

    /// Remove a notification before it expires. Returns `false` if it was
    /// already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut state = self.inner.state.lock().expect("notification state poisoned");
        if let Some(timer) = state.timers.remove(&id) {
            timer.abort();
        }
        let removed = self.inner.remove(id);
        if removed {
            debug!(%id, "notification dismissed");
        }
        removed
    }

    /// Dismiss every active notification.
    pub fn dismiss_all(&self) {
        let mut state = self.inner.state.lock().expect("notification state poisoned");
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
        self.inner.active.send_if_modified(|list| {
            if list.is_empty() {
                return false;
            }
            *list = Arc::new(Vec::new());
            true
        });
    }

    /// Feed every newly applied snapshot into [`observe()`](Self::observe)
    /// until cancelled or the feed goes away.
    ///
    /// Error-only updates and loading flips carry the same snapshot and
    /// are skipped.
    pub async fn run(&self, mut feed: FeedStream, cancel: CancellationToken) {
        let mut seen = 0;
        let current = Arc::clone(feed.current());
        self.observe_state(&current, &mut seen);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                next = feed.changed() => match next {
                    Some(state) => self.observe_state(&state, &mut seen),
                    None => break,
                },
            }
        }
        debug!("notification queue stopped");
    }

    fn observe_state(&self, state: &FeedState, seen: &mut u64) {
        if state.sequence > *seen {
            *seen = state.sequence;
            self.observe(&state.incidents);
        }
    }
}

impl QueueInner {
    fn remove(&self, id: Uuid) -> bool {
        self.active.send_if_modified(|list| {
            if !list.iter().any(|n| n.id == id) {
                return false;
            }
            *list = Arc::new(list.iter().filter(|n| n.id != id).cloned().collect());
            true
        })
    }

    fn expire(&self, id: Uuid) {
        let mut state = self.state.lock().expect("notification state poisoned");
        state.timers.remove(&id);
        if self.remove(id) {
            debug!(%id, "notification expired");
        }
    }
}

fn spawn_expiry(queue: Weak<QueueInner>, id: Uuid, ttl: Duration) -> AbortHandle {
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        if let Some(queue) = queue.upgrade() {
            queue.expire(id);
        }
    })
    .abort_handle()
}
