// ── Incident feed poller ──
//
// Keeps a fresh snapshot of the backend's incident list, reports how many
// incidents are new since the previous fetch, and publishes both through a
// `watch` channel. Scheduling follows the shared `LiveFlag`: ticks only
// fire while the flag is on and auto-refresh is enabled.
//
// Every fetch carries a sequence number. A response is applied only if it
// is newer than the last applied one and was issued after the most recent
// `stop()`, so a slow manual refresh can never overwrite fresher data.

mod source;
mod state;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use source::{HttpSource, IncidentSource};
pub use state::{FeedState, Snapshot, id_set, newly_arrived};

use crate::config::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, FeedConfig};
use crate::error::CoreError;
use crate::live::LiveFlag;
use crate::model::IncidentId;
use crate::stream::FeedStream;

/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Scheduling knobs for an [`IncidentFeed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// When false, only `start()` and `fetch_once()` trigger fetches.
    pub auto_refresh: bool,
    /// Upper bound for one fetch.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            auto_refresh: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// ── IncidentFeed ─────────────────────────────────────────────────

/// Periodic incident poller.
///
/// Cheaply cloneable. The background task is cancelled by [`stop()`],
/// or when the last clone is dropped.
///
/// [`stop()`]: Self::stop
#[derive(Clone)]
pub struct IncidentFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    shared: Arc<FeedShared>,
    live: LiveFlag,
    interval: watch::Sender<Duration>,
    auto_refresh: bool,
    cancel: CancellationToken,
    run: Mutex<Option<PollRun>>,
}

struct PollRun {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// State reachable from the poll task and from in-flight fetches.
struct FeedShared {
    source: Arc<dyn IncidentSource>,
    timeout: Duration,
    state: watch::Sender<Arc<FeedState>>,
    tracker: Mutex<Tracker>,
}

#[derive(Default)]
struct Tracker {
    /// Last sequence number handed out.
    issued: u64,
    /// Sequence of the newest response applied (success or failure).
    applied: u64,
    /// Responses at or below this were issued before the last `stop()`.
    floor: u64,
    in_flight: usize,
    /// Part of `in_flight` started by the poll task. These are aborted on
    /// `stop()`; manual fetches are not.
    scheduled_in_flight: usize,
    /// Ids of the last applied snapshot; `None` until the first success
    /// after `start()`.
    previous_ids: Option<HashSet<IncidentId>>,
}

/// Who asked for a fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
    Manual,
    Scheduled,
}

/// What happened to a completed fetch.
enum Applied {
    Fresh,
    Stale,
}

impl Drop for FeedInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl IncidentFeed {
    /// Create a feed. Does not fetch -- call [`start()`](Self::start).
    pub fn new(source: Arc<dyn IncidentSource>, live: LiveFlag, settings: PollSettings) -> Self {
        let (state, _) = watch::channel(Arc::new(FeedState::default()));
        let (interval, _) = watch::channel(clamp_interval(settings.interval));

        Self {
            inner: Arc::new(FeedInner {
                shared: Arc::new(FeedShared {
                    source,
                    timeout: settings.timeout,
                    state,
                    tracker: Mutex::new(Tracker::default()),
                }),
                live,
                interval,
                auto_refresh: settings.auto_refresh,
                cancel: CancellationToken::new(),
                run: Mutex::new(None),
            }),
        }
    }

    /// Build a feed backed by the HTTP API described by `config`.
    pub fn from_config(config: &FeedConfig, live: LiveFlag) -> Result<Self, CoreError> {
        let source = HttpSource::from_config(config)?;
        Ok(Self::new(Arc::new(source), live, config.poll_settings()))
    }

    pub fn live(&self) -> &LiveFlag {
        &self.inner.live
    }

    pub fn auto_refresh(&self) -> bool {
        self.inner.auto_refresh
    }

    pub fn interval(&self) -> Duration {
        *self.inner.interval.borrow()
    }

    /// Change the poll interval. The pending tick is rescheduled with the
    /// new period; no extra fetch is triggered.
    pub fn set_interval(&self, interval: Duration) {
        let interval = clamp_interval(interval);
        debug!(interval_ms = interval.as_millis(), "poll interval changed");
        self.inner.interval.send_replace(interval);
    }

    /// The current published state.
    pub fn state(&self) -> Arc<FeedState> {
        self.inner.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> FeedStream {
        FeedStream::new(self.inner.shared.state.subscribe())
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .run
            .lock()
            .await
            .as_ref()
            .is_some_and(|run| !run.task.is_finished())
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start polling: fetch immediately, then on every tick while live.
    ///
    /// A no-op if already running. The first successful fetch after a
    /// start is the new baseline and always reports `new_count == 0`.
    pub async fn start(&self) {
        let mut run = self.inner.run.lock().await;
        if run.as_ref().is_some_and(|r| !r.task.is_finished()) {
            debug!("feed already running");
            return;
        }

        self.inner.shared.tracker.lock().await.previous_ids = None;

        let cancel = self.inner.cancel.child_token();
        let task = tokio::spawn(poll_task(
            Arc::clone(&self.inner.shared),
            self.inner.live.clone(),
            self.inner.interval.subscribe(),
            self.inner.auto_refresh,
            cancel.clone(),
        ));
        *run = Some(PollRun { cancel, task });
        info!(
            interval_ms = self.interval().as_millis(),
            live = self.inner.live.is_live(),
            auto_refresh = self.inner.auto_refresh,
            "incident feed started"
        );
    }

    /// Stop polling. Pending ticks are cancelled and any response still in
    /// flight is discarded when it lands. Idempotent.
    pub async fn stop(&self) {
        let Some(run) = self.inner.run.lock().await.take() else {
            return;
        };
        run.cancel.cancel();
        let _ = run.task.await;

        let mut tracker = self.inner.shared.tracker.lock().await;
        tracker.floor = tracker.issued;
        tracker.in_flight = tracker.in_flight.saturating_sub(tracker.scheduled_in_flight);
        tracker.scheduled_in_flight = 0;
        self.inner.shared.publish_loading(tracker.in_flight > 0);
        info!("incident feed stopped");
    }

    /// Fetch once outside the schedule (manual refresh).
    ///
    /// Returns what the backend sent even if a newer fetch has already
    /// been applied, in which case the published state is left alone.
    pub async fn fetch_once(&self) -> Result<Snapshot, CoreError> {
        let shared = &self.inner.shared;
        let seq = shared.begin(Trigger::Manual).await;
        debug!(seq, "manual fetch");
        let result = shared.fetch().await;
        if matches!(
            shared.apply(seq, Trigger::Manual, result.clone()).await,
            Applied::Stale
        ) {
            debug!(seq, "manual fetch superseded by a newer one");
        }
        result
    }
}

impl std::fmt::Debug for IncidentFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentFeed")
            .field("interval", &self.interval())
            .field("auto_refresh", &self.inner.auto_refresh)
            .field("live", &self.inner.live.is_live())
            .finish_non_exhaustive()
    }
}

// ── Fetch bookkeeping ────────────────────────────────────────────

impl FeedShared {
    /// Hand out the next sequence number and mark the feed as loading.
    async fn begin(&self, trigger: Trigger) -> u64 {
        let mut tracker = self.tracker.lock().await;
        tracker.issued += 1;
        tracker.in_flight += 1;
        if trigger == Trigger::Scheduled {
            tracker.scheduled_in_flight += 1;
        }
        self.publish_loading(true);
        tracker.issued
    }

    async fn fetch(&self) -> Result<Snapshot, CoreError> {
        match tokio::time::timeout(self.timeout, self.source.fetch()).await {
            Ok(Ok(incidents)) => Ok(Arc::new(incidents.into_iter().map(Arc::new).collect())),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CoreError::timed_out(self.timeout)),
        }
    }

    /// Apply a completed fetch unless a newer one already landed.
    async fn apply(
        &self,
        seq: u64,
        trigger: Trigger,
        result: Result<Snapshot, CoreError>,
    ) -> Applied {
        let mut tracker = self.tracker.lock().await;
        tracker.in_flight = tracker.in_flight.saturating_sub(1);
        if trigger == Trigger::Scheduled {
            tracker.scheduled_in_flight = tracker.scheduled_in_flight.saturating_sub(1);
        }
        let loading = tracker.in_flight > 0;

        if seq <= tracker.floor || seq <= tracker.applied {
            debug!(
                seq,
                applied = tracker.applied,
                floor = tracker.floor,
                "discarding stale response"
            );
            self.publish_loading(loading);
            return Applied::Stale;
        }
        tracker.applied = seq;

        match result {
            Ok(incidents) => {
                let ids = id_set(&incidents);
                let new_count = tracker
                    .previous_ids
                    .as_ref()
                    .map_or(0, |previous| newly_arrived(previous, &ids));
                tracker.previous_ids = Some(ids);

                debug!(seq, total = incidents.len(), new_count, "snapshot applied");
                self.state.send_replace(Arc::new(FeedState {
                    incidents,
                    new_count,
                    error: None,
                    last_update: Some(Utc::now()),
                    sequence: seq,
                    loading,
                }));
            }
            Err(error) => {
                warn!(seq, error = %error, "incident fetch failed");
                self.state.send_modify(|state| {
                    let mut next = FeedState::clone(state);
                    next.error = Some(error);
                    next.loading = loading;
                    *state = Arc::new(next);
                });
            }
        }
        Applied::Fresh
    }

    fn publish_loading(&self, loading: bool) {
        self.state.send_if_modified(|state| {
            if state.loading == loading {
                return false;
            }
            let mut next = FeedState::clone(state);
            next.loading = loading;
            *state = Arc::new(next);
            true
        });
    }
}

// ── Background task ──────────────────────────────────────────────

/// Drives scheduled fetches until cancelled.
///
/// Fetches run on their own tasks so a slow response never delays the
/// next tick; the `JoinSet` aborts whatever is left on exit.
async fn poll_task(
    shared: Arc<FeedShared>,
    flag: LiveFlag,
    mut interval: watch::Receiver<Duration>,
    auto_refresh: bool,
    cancel: CancellationToken,
) {
    let mut fetches = JoinSet::new();
    let mut live = flag.subscribe();
    let mut period = *interval.borrow_and_update();
    let mut is_live = *live.borrow_and_update();
    let mut resumes = flag.resumes();

    spawn_fetch(&mut fetches, &shared, "initial");
    let mut ticker = (is_live && auto_refresh).then(|| new_ticker(period));

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = live.changed() => {
                if changed.is_err() {
                    debug!("live flag dropped -- exiting poll task");
                    break;
                }
                let now_live = *live.borrow_and_update();
                let now_resumes = flag.resumes();
                // An off/on pair between two wake-ups leaves the value
                // unchanged but still counts as a resume.
                let resumed = now_live && (!is_live || now_resumes != resumes);
                if resumed && auto_refresh {
                    spawn_fetch(&mut fetches, &shared, "resume");
                    ticker = Some(new_ticker(period));
                } else if !now_live && is_live {
                    debug!("live mode off -- pausing schedule");
                    ticker = None;
                }
                is_live = now_live;
                resumes = now_resumes;
            }
            changed = interval.changed() => {
                if changed.is_err() {
                    break;
                }
                period = *interval.borrow_and_update();
                if ticker.is_some() {
                    ticker = Some(new_ticker(period));
                }
            }
            () = next_tick(&mut ticker) => {
                spawn_fetch(&mut fetches, &shared, "tick");
            }
            Some(_) = fetches.join_next(), if !fetches.is_empty() => {}
        }
    }

    fetches.shutdown().await;
    debug!("poll task exited");
}

fn spawn_fetch(fetches: &mut JoinSet<()>, shared: &Arc<FeedShared>, reason: &'static str) {
    let shared = Arc::clone(shared);
    fetches.spawn(async move {
        let seq = shared.begin(Trigger::Scheduled).await;
        debug!(seq, reason, "scheduled fetch");
        let result = shared.fetch().await;
        shared.apply(seq, Trigger::Scheduled, result).await;
    });
}

/// First tick one full period from now; missed ticks are skipped.
fn new_ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_POLL_INTERVAL)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
