//! Data bridge -- connects the feed and notification streams to TUI actions.
//!
//! Runs as a background task: pushes the current values so screens have
//! data immediately, then forwards every change as an [`Action`] through
//! the TUI's action channel until cancelled.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use sentinel_core::{FeedStream, LiveFlag, NotificationStream};

use crate::action::Action;

pub async fn spawn_data_bridge(
    mut feed: FeedStream,
    mut notifications: NotificationStream,
    live: LiveFlag,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut live_rx = live.subscribe();

    let _ = action_tx.send(Action::FeedUpdated(feed.current().clone()));
    let _ = action_tx.send(Action::NotificationsUpdated(notifications.current().clone()));
    let _ = action_tx.send(Action::LiveChanged(*live_rx.borrow_and_update()));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(state) = feed.changed() => {
                debug!(seq = state.sequence, new = state.new_count, "dispatching FeedUpdated");
                let _ = action_tx.send(Action::FeedUpdated(state));
            }
            Some(active) = notifications.changed() => {
                let _ = action_tx.send(Action::NotificationsUpdated(active));
            }
            Ok(()) = live_rx.changed() => {
                let on = *live_rx.borrow_and_update();
                let _ = action_tx.send(Action::LiveChanged(on));
            }
            else => break,
        }
    }

    debug!("data bridge shut down");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sentinel_core::{IncidentFeed, NotificationQueue, PollSettings, SilentTone};

    use super::*;
    use crate::testing::StaticSource;

    #[tokio::test]
    async fn forwards_initial_values_and_live_changes() {
        let live = LiveFlag::new(true);
        let feed = IncidentFeed::new(
            Arc::new(StaticSource::default()),
            live.clone(),
            PollSettings::default(),
        );
        let queue = NotificationQueue::new(Default::default(), Arc::new(SilentTone));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let bridge = tokio::spawn(spawn_data_bridge(
            feed.subscribe(),
            queue.subscribe(),
            live.clone(),
            tx,
            cancel.clone(),
        ));

        assert!(matches!(rx.recv().await, Some(Action::FeedUpdated(_))));
        assert!(matches!(rx.recv().await, Some(Action::NotificationsUpdated(_))));
        assert!(matches!(rx.recv().await, Some(Action::LiveChanged(true))));

        live.toggle();
        let next = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(matches!(next, Ok(Some(Action::LiveChanged(false)))));

        cancel.cancel();
        bridge.await.unwrap();
    }
}
