use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};

use statuskeeper_core::{PresenceStatus, StatusInterval, UserId, UserStatusRecord, VoiceInterval};

/// A partial mutation of one user's row.
///
/// Counter fields are deltas added to the stored value; interval fields,
/// when present, replace the stored interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub credit: Option<(PresenceStatus, u64)>,
    pub add_messages: u64,
    pub add_voice_seconds: u64,
    pub status: Option<StatusInterval>,
    pub voice: Option<VoiceInterval>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `seconds` to the bucket for `status`.
    pub fn credit_status(mut self, status: PresenceStatus, seconds: u64) -> Self {
        self.credit = Some((status, seconds));
        self
    }

    pub fn add_messages(mut self, count: u64) -> Self {
        self.add_messages += count;
        self
    }

    pub fn add_voice_seconds(mut self, seconds: u64) -> Self {
        self.add_voice_seconds += seconds;
        self
    }

    pub fn set_status(mut self, interval: StatusInterval) -> Self {
        self.status = Some(interval);
        self
    }

    pub fn set_voice(mut self, interval: VoiceInterval) -> Self {
        self.voice = Some(interval);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.credit.is_none()
            && self.add_messages == 0
            && self.add_voice_seconds == 0
            && self.status.is_none()
            && self.voice.is_none()
    }

    /// Apply this patch to an in-memory record.
    pub fn apply_to(&self, record: &mut UserStatusRecord) {
        if let Some((status, seconds)) = self.credit {
            let bucket = match status {
                PresenceStatus::Online => &mut record.online_seconds,
                PresenceStatus::Idle => &mut record.idle_seconds,
                PresenceStatus::Dnd => &mut record.dnd_seconds,
                PresenceStatus::Offline => &mut record.offline_seconds,
            };
            *bucket = bucket.saturating_add(seconds);
        }
        record.messages = record.messages.saturating_add(self.add_messages);
        record.voice_seconds = record.voice_seconds.saturating_add(self.add_voice_seconds);
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(voice) = self.voice {
            record.voice = voice;
        }
    }
}

/// Keyed row store holding one [`UserStatusRecord`] per user.
///
/// Rows are never deleted through this interface.
pub trait RowStore: Send + Sync {
    /// Create a zeroed row for `user` if none exists.
    fn ensure(&self, user: UserId) -> Result<()>;

    /// Fetch a user's row.
    fn get(&self, user: UserId) -> Result<Option<UserStatusRecord>>;

    /// Apply a partial mutation to an existing row. Missing rows are left alone.
    fn update(&self, user: UserId, patch: &RecordPatch) -> Result<()>;

    /// Number of tracked users.
    fn count(&self) -> Result<usize>;
}

impl<S: RowStore + ?Sized> RowStore for Arc<S> {
    fn ensure(&self, user: UserId) -> Result<()> {
        (**self).ensure(user)
    }

    fn get(&self, user: UserId) -> Result<Option<UserStatusRecord>> {
        (**self).get(user)
    }

    fn update(&self, user: UserId, patch: &RecordPatch) -> Result<()> {
        (**self).update(user, patch)
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }
}

/// HashMap-backed store for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRowStore {
    rows: Arc<RwLock<HashMap<UserId, UserStatusRecord>>>,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowStore for InMemoryRowStore {
    fn ensure(&self, user: UserId) -> Result<()> {
        let mut rows = self.rows.write().map_err(|_| anyhow!("row store lock poisoned"))?;
        rows.entry(user).or_insert_with(|| UserStatusRecord::new(user));
        Ok(())
    }

    fn get(&self, user: UserId) -> Result<Option<UserStatusRecord>> {
        let rows = self.rows.read().map_err(|_| anyhow!("row store lock poisoned"))?;
        Ok(rows.get(&user).cloned())
    }

    fn update(&self, user: UserId, patch: &RecordPatch) -> Result<()> {
        let mut rows = self.rows.write().map_err(|_| anyhow!("row store lock poisoned"))?;
        if let Some(record) = rows.get_mut(&user) {
            patch.apply_to(record);
        }
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let rows = self.rows.read().map_err(|_| anyhow!("row store lock poisoned"))?;
        Ok(rows.len())
    }
}
