//! Message counter.

use anyhow::Result;

use statuskeeper_core::UserId;
use statuskeeper_store::{RecordPatch, RowStore};

/// Count one message for `user`.
pub fn record_message<S: RowStore + ?Sized>(store: &S, user: UserId) -> Result<()> {
    store.ensure(user)?;
    store.update(user, &RecordPatch::new().add_messages(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use statuskeeper_core::PresenceStatus;
    use statuskeeper_store::InMemoryRowStore;

    use crate::status::{start_status, transition_status};

    #[test]
    fn counts_each_message_once() {
        let store = InMemoryRowStore::new();
        let user = UserId(11);
        for _ in 0..3 {
            record_message(&store, user).unwrap();
        }
        assert_eq!(store.get(user).unwrap().unwrap().messages, 3);
    }

    #[test]
    fn status_changes_leave_message_count_alone() {
        let store = InMemoryRowStore::new();
        let user = UserId(12);
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        record_message(&store, user).unwrap();
        start_status(&store, user, PresenceStatus::Online, t0).unwrap();
        transition_status(&store, user, PresenceStatus::Idle, t0 + chrono::Duration::seconds(4)).unwrap();
        assert_eq!(store.get(user).unwrap().unwrap().messages, 1);
    }
}
