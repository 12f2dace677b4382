use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::sleep;

use super::*;
use crate::error::FeedErrorKind;
use crate::model::Severity;
use crate::notify::{NotificationQueue, NotificationSettings};
use crate::testing::{RecordingTone, ScriptedSource, incident};

const INTERVAL: Duration = Duration::from_secs(5);

fn feed_with(source: &Arc<ScriptedSource>, live: &LiveFlag, auto_refresh: bool) -> IncidentFeed {
    IncidentFeed::new(
        source.clone(),
        live.clone(),
        PollSettings {
            interval: INTERVAL,
            auto_refresh,
            timeout: Duration::from_secs(10),
        },
    )
}

fn feed(source: &Arc<ScriptedSource>) -> IncidentFeed {
    feed_with(source, &LiveFlag::default(), true)
}

fn ids(state: &FeedState) -> Vec<String> {
    state.incidents.iter().map(|i| i.id.to_string()).collect()
}

/// Wait until the published state satisfies `pred`.
async fn wait_for(feed: &IncidentFeed, pred: impl Fn(&FeedState) -> bool) -> Arc<FeedState> {
    let mut stream = feed.subscribe();
    tokio::time::timeout(Duration::from_secs(120), async {
        loop {
            let state = stream.latest();
            if pred(&state) {
                return state;
            }
            stream.changed().await.unwrap();
        }
    })
    .await
    .expect("feed state never matched")
}

async fn wait_for_sequence(feed: &IncidentFeed, seq: u64) -> Arc<FeedState> {
    wait_for(feed, |s| s.sequence >= seq && !s.loading).await
}

/// Let spawned tasks run without moving the clock meaningfully.
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

// ── Snapshot and delta ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn first_fetch_is_baseline() {
    let source = ScriptedSource::new();
    source.ok(&["3", "2", "1"]);
    let feed = feed(&source);

    feed.start().await;
    let state = wait_for_sequence(&feed, 1).await;

    assert_eq!(ids(&state), vec!["3", "2", "1"]);
    assert_eq!(state.new_count, 0);
    assert!(state.error.is_none());
    assert!(state.last_update.is_some());
}

#[tokio::test(start_paused = true)]
async fn delta_counts_ids_missing_from_previous_snapshot() {
    let source = ScriptedSource::new();
    source.ok(&["1", "2", "3"]).ok(&["5", "2", "4", "3"]);
    let feed = feed(&source);

    feed.start().await;
    wait_for_sequence(&feed, 1).await;
    let state = wait_for_sequence(&feed, 2).await;

    // Published exactly as fetched, in backend order.
    assert_eq!(ids(&state), vec!["5", "2", "4", "3"]);
    assert_eq!(state.new_count, 2);
}

#[tokio::test(start_paused = true)]
async fn snapshot_is_passed_through_unmodified() {
    let mut a = incident("a", Severity::High);
    a.message = Some("pressure spike".into());
    a.score = Some(0.97);
    a.values = Some(serde_json::json!({"pressure": 3.2}));
    let b = incident("b", Severity::Low);

    let source = ScriptedSource::new();
    source.ok_with(vec![a.clone(), b.clone()]);
    let feed = feed(&source);

    let fetched = feed.fetch_once().await.unwrap();
    let published = feed.state();

    assert_eq!(fetched.iter().map(|i| (**i).clone()).collect::<Vec<_>>(), vec![a, b]);
    assert!(Arc::ptr_eq(&fetched, &published.incidents));
}

// ── Failures ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn failure_keeps_snapshot_and_sets_error() {
    let source = ScriptedSource::new();
    source
        .ok(&["a"])
        .fail(CoreError::Server {
            status: 500,
            message: "Internal Server Error".into(),
        })
        .ok(&["b", "a"]);
    let feed = feed(&source);

    feed.start().await;
    let first = wait_for_sequence(&feed, 1).await;

    let failed = wait_for(&feed, |s| s.error.is_some()).await;
    assert!(Arc::ptr_eq(&first.incidents, &failed.incidents));
    assert_eq!(failed.sequence, 1);
    assert_eq!(failed.error.as_ref().map(CoreError::kind), Some(FeedErrorKind::Server));

    // The schedule keeps going and the next success clears the error.
    let recovered = wait_for_sequence(&feed, 3).await;
    assert!(recovered.error.is_none());
    assert_eq!(ids(&recovered), vec!["b", "a"]);
    assert_eq!(recovered.new_count, 1);
}

#[tokio::test(start_paused = true)]
async fn fetch_once_surfaces_errors() {
    let source = ScriptedSource::new();
    source.fail(CoreError::Parse {
        message: "expected a sequence".into(),
    });
    let feed = feed(&source);

    let err = feed.fetch_once().await.unwrap_err();
    assert_eq!(err.kind(), FeedErrorKind::Parse);
    assert_eq!(feed.state().error, Some(err));
    assert!(!feed.state().has_snapshot());
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_times_out_as_network_error() {
    let source = ScriptedSource::new();
    source.slow_ok(Duration::from_secs(60), &["a"]);
    let feed = feed(&source);

    let err = feed.fetch_once().await.unwrap_err();
    assert_eq!(err.kind(), FeedErrorKind::Network);
    assert!(!feed.state().loading);
}

// ── Live flag and scheduling ─────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn ticks_follow_interval() {
    let source = ScriptedSource::new();
    let feed = feed(&source);

    feed.start().await;
    settle().await;
    assert_eq!(source.calls(), 1);

    sleep(INTERVAL).await;
    assert_eq!(source.calls(), 2);

    sleep(INTERVAL * 2).await;
    assert_eq!(source.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn live_off_pauses_and_live_on_fetches_immediately() {
    let source = ScriptedSource::new();
    let live = LiveFlag::default();
    let feed = feed_with(&source, &live, true);

    feed.start().await;
    settle().await;
    assert_eq!(source.calls(), 1);

    live.set_live(false);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 1);

    live.toggle();
    settle().await;
    assert_eq!(source.calls(), 2);

    // Back on the regular schedule, one full interval after resuming.
    sleep(INTERVAL).await;
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn quick_off_on_still_resumes_immediately() {
    let source = ScriptedSource::new();
    let live = LiveFlag::default();
    let feed = feed_with(&source, &live, true);

    feed.start().await;
    settle().await;
    sleep(Duration::from_secs(2)).await;
    assert_eq!(source.calls(), 1);

    // Both writes land before the poll task wakes up.
    live.set_live(false);
    live.set_live(true);
    settle().await;
    assert_eq!(source.calls(), 2);

    // The schedule restarted from the resume, so the old 5 s tick is gone.
    sleep(INTERVAL - Duration::from_millis(100)).await;
    assert_eq!(source.calls(), 2);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn live_off_cancels_pending_tick() {
    let source = ScriptedSource::new();
    let live = LiveFlag::default();
    let feed = feed_with(&source, &live, true);

    feed.start().await;
    settle().await;
    sleep(INTERVAL - Duration::from_millis(100)).await;
    live.set_live(false);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_refresh_disabled_fetches_only_on_demand() {
    let source = ScriptedSource::new();
    let live = LiveFlag::default();
    let feed = feed_with(&source, &live, false);

    feed.start().await;
    sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 1);

    live.set_live(false);
    live.set_live(true);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 1);

    feed.fetch_once().await.unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn interval_change_reschedules_pending_tick() {
    let source = ScriptedSource::new();
    let feed = IncidentFeed::new(
        source.clone(),
        LiveFlag::default(),
        PollSettings {
            interval: Duration::from_secs(10),
            ..PollSettings::default()
        },
    );

    feed.start().await;
    settle().await;
    sleep(Duration::from_secs(2)).await;
    feed.set_interval(Duration::from_secs(3));
    settle().await;
    assert_eq!(source.calls(), 1);

    // The old tick (t=10s) is gone; the new one lands 3s after the change.
    sleep(Duration::from_millis(2_900)).await;
    assert_eq!(source.calls(), 1);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(source.calls(), 2);
    assert_eq!(feed.interval(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_clamped() {
    let source = ScriptedSource::new();
    let feed = feed(&source);
    feed.set_interval(Duration::ZERO);
    assert_eq!(feed.interval(), MIN_POLL_INTERVAL);
}

// ── Lifecycle ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn start_is_idempotent() {
    let source = ScriptedSource::new();
    let feed = feed(&source);

    feed.start().await;
    feed.start().await;
    settle().await;

    assert!(feed.is_running().await);
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_schedule_and_is_idempotent() {
    let source = ScriptedSource::new();
    source.ok(&["1"]).ok(&["2", "1"]);
    let feed = feed(&source);

    feed.start().await;
    wait_for_sequence(&feed, 1).await;
    feed.stop().await;
    feed.stop().await;
    assert!(!feed.is_running().await);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 1);

    // A restart fetches again and treats the result as a fresh baseline.
    feed.start().await;
    let state = wait_for_sequence(&feed, 2).await;
    assert_eq!(ids(&state), vec!["2", "1"]);
    assert_eq!(state.new_count, 0);
}

#[tokio::test(start_paused = true)]
async fn response_in_flight_at_stop_is_discarded() {
    let source = ScriptedSource::new();
    source.slow_ok(Duration::from_secs(3), &["late"]);
    let feed = feed(&source);

    let manual = tokio::spawn({
        let feed = feed.clone();
        async move { feed.fetch_once().await }
    });
    settle().await;
    feed.start().await;
    feed.stop().await;

    // The manual fetch still resolves for its caller...
    let fetched = manual.await.unwrap().unwrap();
    assert_eq!(fetched.len(), 1);
    // ...but was issued before stop(), so nothing is published.
    assert!(!feed.state().has_snapshot());
}

#[tokio::test(start_paused = true)]
async fn stop_keeps_loading_while_manual_fetch_is_pending() {
    let source = ScriptedSource::new();
    source.ok(&["a"]).slow_ok(Duration::from_secs(2), &["b", "a"]);
    let feed = feed(&source);

    feed.start().await;
    wait_for_sequence(&feed, 1).await;

    let manual = tokio::spawn({
        let feed = feed.clone();
        async move { feed.fetch_once().await }
    });
    settle().await;
    assert!(feed.state().loading);

    feed.stop().await;
    assert!(feed.state().loading);

    manual.await.unwrap().unwrap();
    assert!(!feed.state().loading);
}

#[tokio::test(start_paused = true)]
async fn dropping_last_handle_stops_polling() {
    let source = ScriptedSource::new();
    let feed = feed(&source);

    feed.start().await;
    settle().await;
    drop(feed);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 1);
}

// ── Races ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn late_response_does_not_overwrite_newer_one() {
    let source = ScriptedSource::new();
    source
        .slow_ok(Duration::from_secs(3), &["old"])
        .slow_ok(Duration::from_secs(1), &["new", "old"]);
    let feed = feed(&source);

    let (slow, fast) = tokio::join!(feed.fetch_once(), async {
        settle().await;
        feed.fetch_once().await
    });

    assert_eq!(fast.unwrap().len(), 2);
    assert_eq!(slow.unwrap().len(), 1);

    let state = feed.state();
    assert_eq!(state.sequence, 2);
    assert_eq!(ids(&state), vec!["new", "old"]);
    assert!(!state.loading);
}

#[tokio::test(start_paused = true)]
async fn loading_flag_tracks_in_flight_fetches() {
    let source = ScriptedSource::new();
    source.slow_ok(Duration::from_secs(2), &["a"]);
    let feed = feed(&source);

    feed.start().await;
    settle().await;
    assert!(feed.state().loading);

    let state = wait_for_sequence(&feed, 1).await;
    assert!(!state.loading);
}

// ── End to end with the notification queue ───────────────────────

#[tokio::test(start_paused = true)]
async fn new_critical_incident_raises_notification_and_tone() {
    let source = ScriptedSource::new();
    source
        .ok_with(vec![incident("a", Severity::Low)])
        .ok_with(vec![incident("b", Severity::Critical), incident("a", Severity::Low)]);
    let feed = feed(&source);

    let tone = Arc::new(RecordingTone::default());
    let queue = NotificationQueue::new(NotificationSettings::default(), tone.clone());
    let cancel = CancellationToken::new();
    let runner = tokio::spawn({
        let queue = queue.clone();
        let stream = feed.subscribe();
        let cancel = cancel.clone();
        async move { queue.run(stream, cancel).await }
    });

    assert!(!feed.state().has_snapshot());
    feed.start().await;

    let first = wait_for_sequence(&feed, 1).await;
    settle().await;
    assert_eq!(first.new_count, 0);
    assert!(queue.active().is_empty());
    assert!(tone.played().is_empty());

    let second = wait_for_sequence(&feed, 2).await;
    settle().await;
    assert_eq!(second.new_count, 1);
    let active = queue.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].incident.id.as_str(), "b");
    assert_eq!(tone.played(), vec!["b"]);

    cancel.cancel();
    runner.await.unwrap();
    feed.stop().await;
}
