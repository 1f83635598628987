//! Startup reconciliation.
//!
//! Every known member gets a row and a fresh status interval seeded from the
//! presence observed at startup. Intervals left open by a previous run are
//! replaced, not credited.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use statuskeeper_core::{PresenceStatus, UserId};
use statuskeeper_store::RowStore;

use crate::status::start_status;

/// Seed `members` and return how many were written.
pub fn reconcile_members<S: RowStore + ?Sized>(
    store: &S,
    members: &[(UserId, PresenceStatus)],
    now: DateTime<Utc>,
) -> usize {
    let mut seeded = 0;
    for (user, status) in members {
        match start_status(store, *user, *status, now) {
            Ok(()) => seeded += 1,
            Err(e) => warn!(user_id = %user, error = %e, "Failed to seed status interval"),
        }
    }
    info!(seeded, total = members.len(), "Reconciled member status intervals");
    seeded
}
