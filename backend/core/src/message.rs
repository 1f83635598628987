use tokio::sync::oneshot;

use crate::types::{PresenceStatus, UserId, UserStatusRecord};

/// Messages consumed by the tracker loop.
///
/// Every gateway callback is turned into one of these, so the tracker is the
/// only writer of the row store.
#[derive(Debug)]
pub enum TrackerMessage {
    /// A non-bot message was posted by `user`.
    MessageSeen { user: UserId },

    /// A guild member's presence was observed with `status`.
    PresenceChanged {
        user: UserId,
        display_name: String,
        guild_id: u64,
        status: PresenceStatus,
    },

    /// A member's voice state changed.
    VoiceChanged {
        user: UserId,
        /// `None` when the user was not in a channel, or had no cached voice state.
        old_channel: Option<u64>,
        new_channel: Option<u64>,
    },

    /// Startup snapshot of guild members and their current presence.
    Reconcile { members: Vec<(UserId, PresenceStatus)> },

    /// Read a user's totals; answered on `reply`.
    QueryStats {
        user: UserId,
        reply: oneshot::Sender<Option<UserStatusRecord>>,
    },
}

impl TrackerMessage {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackerMessage::MessageSeen { .. } => "message_seen",
            TrackerMessage::PresenceChanged { .. } => "presence_changed",
            TrackerMessage::VoiceChanged { .. } => "voice_changed",
            TrackerMessage::Reconcile { .. } => "reconcile",
            TrackerMessage::QueryStats { .. } => "query_stats",
        }
    }
}
