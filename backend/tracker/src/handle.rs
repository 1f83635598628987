use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use statuskeeper_core::{KeeperError, PresenceStatus, TrackerMessage, UserId, UserStatusRecord};

/// Default channel buffer size for tracker messages.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Cloneable sending side of the tracker loop.
///
/// Gateway handlers run concurrently; they only ever enqueue, so the tracker
/// stays the single writer of every row.
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<TrackerMessage>,
}

impl TrackerHandle {
    /// Create a handle and the receiver the tracker consumes.
    pub fn channel() -> (Self, mpsc::Receiver<TrackerMessage>) {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer: usize) -> (Self, mpsc::Receiver<TrackerMessage>) {
        let (tx, rx) = mpsc::channel(buffer);
        info!(buffer_size = buffer, "Tracker channel initialized");
        (Self { tx }, rx)
    }

    async fn send(&self, msg: TrackerMessage) -> Result<(), KeeperError> {
        let kind = msg.kind();
        self.tx.send(msg).await.map_err(|_| {
            warn!(kind, "Tracker channel closed; dropping event");
            KeeperError::ChannelClosed("tracker".to_string())
        })
    }

    pub async fn message_seen(&self, user: UserId) -> Result<(), KeeperError> {
        self.send(TrackerMessage::MessageSeen { user }).await
    }

    pub async fn presence_changed(
        &self,
        user: UserId,
        display_name: String,
        guild_id: u64,
        status: PresenceStatus,
    ) -> Result<(), KeeperError> {
        self.send(TrackerMessage::PresenceChanged { user, display_name, guild_id, status })
            .await
    }

    pub async fn voice_changed(
        &self,
        user: UserId,
        old_channel: Option<u64>,
        new_channel: Option<u64>,
    ) -> Result<(), KeeperError> {
        self.send(TrackerMessage::VoiceChanged { user, old_channel, new_channel })
            .await
    }

    pub async fn reconcile(&self, members: Vec<(UserId, PresenceStatus)>) -> Result<(), KeeperError> {
        self.send(TrackerMessage::Reconcile { members }).await
    }

    /// Ask the tracker for `user`'s totals.
    ///
    /// Resolves after every event enqueued before it has been applied.
    pub async fn query_stats(&self, user: UserId) -> Result<Option<UserStatusRecord>, KeeperError> {
        let (reply, rx) = oneshot::channel();
        self.send(TrackerMessage::QueryStats { user, reply }).await?;
        rx.await.map_err(|_| {
            debug!(user_id = %user, "Tracker dropped stats reply");
            KeeperError::ChannelClosed("tracker reply".to_string())
        })
    }
}
