use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::message::TrackerMessage;
use crate::types::{PresenceStatus, UserId};

/// Trait for long-running StatusKeeper components.
///
/// Each component receives messages from its channel and runs in its own Tokio task.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Human-readable name of this component.
    fn name(&self) -> &str;

    /// Start the component's event loop, consuming from the given receiver.
    async fn start(&self, rx: mpsc::Receiver<TrackerMessage>) -> Result<()>;
}

/// Source of "now" for interval accounting.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and replays.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = at;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// A completed presence transition, ready to be announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub user: UserId,
    pub display_name: String,
    pub guild_id: u64,
    pub previous: PresenceStatus,
    pub current: PresenceStatus,
    pub elapsed_secs: u64,
}

/// Outbound sink for status-change announcements.
///
/// Implementations swallow their own delivery failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn status_changed(&self, change: &StatusChange);
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn status_changed(&self, change: &StatusChange) {
        (**self).status_changed(change).await
    }
}

/// Notifier that drops everything (CLI paths, notifications disabled).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn status_changed(&self, _change: &StatusChange) {}
}
