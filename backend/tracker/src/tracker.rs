use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use statuskeeper_core::{Clock, Component, Notifier, StatusChange, TrackerMessage};
use statuskeeper_store::RowStore;

use crate::messages::record_message;
use crate::reconcile::reconcile_members;
use crate::report::lookup_stats;
use crate::status::{transition_status, Transition};
use crate::voice::{voice_changed, VoiceTransition};

/// The Tracker component applies gateway events to the row store, one at a
/// time, and announces status changes.
pub struct Tracker<S, C, N> {
    store: S,
    clock: C,
    notifier: N,
}

impl<S, C, N> Tracker<S, C, N>
where
    S: RowStore,
    C: Clock,
    N: Notifier,
{
    pub fn new(store: S, clock: C, notifier: N) -> Self {
        Self { store, clock, notifier }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Apply one message. Storage failures are logged and dropped.
    pub async fn handle(&self, msg: TrackerMessage) {
        let now = self.clock.now();
        match msg {
            TrackerMessage::MessageSeen { user } => {
                if let Err(e) = record_message(&self.store, user) {
                    warn!(user_id = %user, error = %e, "Failed to count message");
                }
            }
            TrackerMessage::PresenceChanged { user, display_name, guild_id, status } => {
                match transition_status(&self.store, user, status, now) {
                    Ok(Transition::Changed(credited)) => {
                        info!(
                            user_id = %user,
                            from = %credited.status,
                            to = %status,
                            elapsed_secs = credited.elapsed_secs,
                            "Status changed"
                        );
                        let change = StatusChange {
                            user,
                            display_name,
                            guild_id,
                            previous: credited.status,
                            current: status,
                            elapsed_secs: credited.elapsed_secs,
                        };
                        self.notifier.status_changed(&change).await;
                    }
                    Ok(Transition::Opened) => {
                        debug!(user_id = %user, status = %status, "Status interval opened");
                    }
                    Ok(Transition::Unchanged) => {}
                    Err(e) => warn!(user_id = %user, error = %e, "Failed to apply status change"),
                }
            }
            TrackerMessage::VoiceChanged { user, old_channel, new_channel } => {
                match voice_changed(&self.store, user, old_channel, new_channel, now) {
                    Ok(VoiceTransition::Left { elapsed_secs }) => {
                        info!(user_id = %user, elapsed_secs, "Voice session ended");
                    }
                    Ok(VoiceTransition::Joined) => debug!(user_id = %user, "Voice session started"),
                    Ok(VoiceTransition::Moved) => debug!(user_id = %user, "Voice channel moved"),
                    Ok(VoiceTransition::Unchanged) => {}
                    Err(e) => warn!(user_id = %user, error = %e, "Failed to apply voice change"),
                }
            }
            TrackerMessage::Reconcile { members } => {
                reconcile_members(&self.store, &members, now);
            }
            TrackerMessage::QueryStats { user, reply } => {
                let record = lookup_stats(&self.store, user);
                if reply.send(record).is_err() {
                    debug!(user_id = %user, "Stats requester went away");
                }
            }
        }
    }
}

#[async_trait]
impl<S, C, N> Component for Tracker<S, C, N>
where
    S: RowStore + 'static,
    C: Clock + 'static,
    N: Notifier + 'static,
{
    fn name(&self) -> &str {
        "tracker"
    }

    async fn start(&self, mut rx: mpsc::Receiver<TrackerMessage>) -> Result<()> {
        info!("Tracker started");

        while let Some(msg) = rx.recv().await {
            debug!(kind = msg.kind(), "Tracker received message");
            self.handle(msg).await;
        }

        info!("Tracker channel closed, shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use statuskeeper_core::{ManualClock, PresenceStatus, StatusInterval, UserId};
    use statuskeeper_store::{InMemoryRowStore, SqliteRowStore};

    use crate::handle::TrackerHandle;
    use crate::report::StatsReport;

    #[derive(Default)]
    struct RecordingNotifier {
        changes: Mutex<Vec<StatusChange>>,
    }

    impl RecordingNotifier {
        fn changes(&self) -> Vec<StatusChange> {
            self.changes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn status_changed(&self, change: &StatusChange) {
            self.changes.lock().unwrap().push(change.clone());
        }
    }

    const GUILD: u64 = 900;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 20, 16, 0, 0).unwrap()
    }

    fn presence(user: UserId, status: PresenceStatus) -> TrackerMessage {
        TrackerMessage::PresenceChanged {
            user,
            display_name: format!("user{}", user),
            guild_id: GUILD,
            status,
        }
    }

    fn tracker() -> (
        Tracker<InMemoryRowStore, ManualClock, Arc<RecordingNotifier>>,
        ManualClock,
        Arc<RecordingNotifier>,
    ) {
        let clock = ManualClock::new(t0());
        let notifier = Arc::new(RecordingNotifier::default());
        let tracker = Tracker::new(InMemoryRowStore::new(), clock.clone(), Arc::clone(&notifier));
        (tracker, clock, notifier)
    }

    #[tokio::test]
    async fn status_change_is_credited_and_announced() {
        let (tracker, clock, notifier) = tracker();
        let user = UserId(1);

        tracker
            .handle(TrackerMessage::Reconcile { members: vec![(user, PresenceStatus::Online)] })
            .await;
        clock.advance(Duration::seconds(10));
        tracker.handle(presence(user, PresenceStatus::Idle)).await;

        let changes = notifier.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous, PresenceStatus::Online);
        assert_eq!(changes[0].current, PresenceStatus::Idle);
        assert_eq!(changes[0].elapsed_secs, 10);
        assert_eq!(changes[0].guild_id, GUILD);

        let row = tracker.store().get(user).unwrap().unwrap();
        assert_eq!(row.online_seconds, 10);
        assert_eq!(row.idle_seconds, 0);
    }

    #[tokio::test]
    async fn repeated_status_is_silent() {
        let (tracker, clock, notifier) = tracker();
        let user = UserId(2);

        tracker.handle(presence(user, PresenceStatus::Dnd)).await;
        clock.advance(Duration::seconds(30));
        tracker.handle(presence(user, PresenceStatus::Dnd)).await;

        assert!(notifier.changes().is_empty());
        let row = tracker.store().get(user).unwrap().unwrap();
        assert_eq!(row.total_status_seconds(), 0);
        assert_eq!(row.status, StatusInterval::open(PresenceStatus::Dnd, t0()));
    }

    #[tokio::test]
    async fn first_sighting_opens_without_announcement() {
        let (tracker, _clock, notifier) = tracker();
        let user = UserId(3);
        tracker.handle(presence(user, PresenceStatus::Online)).await;
        assert!(notifier.changes().is_empty());
        assert!(tracker.store().get(user).unwrap().unwrap().status.is_open());
    }

    #[tokio::test]
    async fn messages_and_voice_flow_through() {
        let (tracker, clock, _notifier) = tracker();
        let user = UserId(4);

        tracker.handle(TrackerMessage::MessageSeen { user }).await;
        tracker.handle(TrackerMessage::MessageSeen { user }).await;
        tracker
            .handle(TrackerMessage::VoiceChanged { user, old_channel: None, new_channel: Some(77) })
            .await;
        clock.advance(Duration::milliseconds(61_500));
        tracker
            .handle(TrackerMessage::VoiceChanged { user, old_channel: Some(77), new_channel: None })
            .await;

        let row = tracker.store().get(user).unwrap().unwrap();
        assert_eq!(row.messages, 2);
        assert_eq!(row.voice_seconds, 61);
    }

    #[tokio::test]
    async fn loop_applies_queued_events_before_exiting() {
        let (tracker, _clock, _notifier) = tracker();
        let (handle, rx) = TrackerHandle::channel();
        let user = UserId(9);

        for _ in 0..5 {
            handle.message_seen(user).await.unwrap();
        }
        drop(handle);

        // Started only after the senders are gone; the backlog must still land.
        tracker.start(rx).await.unwrap();
        assert_eq!(tracker.store().get(user).unwrap().unwrap().messages, 5);
    }

    #[tokio::test]
    async fn loop_answers_queries_after_prior_events() {
        let clock = ManualClock::new(t0());
        let notifier = Arc::new(RecordingNotifier::default());
        let tracker = Arc::new(Tracker::new(
            SqliteRowStore::in_memory().unwrap(),
            clock.clone(),
            Arc::clone(&notifier),
        ));
        let (handle, rx) = TrackerHandle::channel();

        let runner = Arc::clone(&tracker);
        let task = tokio::spawn(async move { runner.start(rx).await });

        let user = UserId(123456789012345678);
        assert!(handle.query_stats(user).await.unwrap().is_none());

        handle.reconcile(vec![(user, PresenceStatus::Online)]).await.unwrap();
        // Round-trip so the reconcile is applied before time moves.
        handle.query_stats(user).await.unwrap();
        clock.advance(Duration::seconds(10));
        handle
            .presence_changed(user, "alice#0001".into(), GUILD, PresenceStatus::Idle)
            .await
            .unwrap();

        let record = handle.query_stats(user).await.unwrap().unwrap();
        assert!(record.online_seconds >= 10);
        assert_eq!(record.idle_seconds, 0);
        assert_eq!(notifier.changes()[0].display_name, "alice#0001");

        let text = StatsReport::from_record(Some(&record)).render_plain("alice#0001");
        assert!(text.contains("10s"));

        drop(handle);
        task.await.unwrap().unwrap();
    }
}
