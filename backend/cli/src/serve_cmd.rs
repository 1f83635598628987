//! `statuskeeper serve`: wire the store, tracker, and Discord gateway together.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use statuskeeper_channels::{DiscordAdapter, DiscordSettings};
use statuskeeper_config::StatusKeeperConfig;
use statuskeeper_core::{Component, KeeperError, NoopNotifier, Notifier, SystemClock};
use statuskeeper_store::{RowStore, SqliteRowStore};
use statuskeeper_tracker::{Tracker, TrackerHandle};

use crate::stats_cmd::db_path;

/// How long queued events may take to apply after the gateway stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(config: StatusKeeperConfig) -> Result<()> {
    let token = config
        .discord
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| KeeperError::Config("discord.token is required to serve (or set DISCORD_TOKEN)".into()))?;

    let db = db_path(&config);
    info!(db = %db, "Starting StatusKeeper");
    let store = SqliteRowStore::open(&db)?;
    info!(users = store.count()?, "Loaded tracked users");

    let (handle, rx) = TrackerHandle::channel();

    let adapter = DiscordAdapter::new(DiscordSettings {
        token,
        application_id: config.discord.application_id,
        log_channel_id: config.discord.log_channel_id,
    });
    let connection = adapter.connect(handle).await?;

    let notifier: Arc<dyn Notifier> = match connection.notifier() {
        Some(notifier) => Arc::new(notifier),
        None => {
            warn!("No log channel configured; status changes will not be announced");
            Arc::new(NoopNotifier)
        }
    };

    let tracker = Tracker::new(store, SystemClock, notifier);
    let tracker_task = tokio::spawn(async move {
        if let Err(e) = Component::start(&tracker, rx).await {
            error!(error = %e, "Tracker task failed");
        }
    });

    info!("All components started");

    let shutdown = connection.shutdown_handle();
    let gateway = connection.run();
    tokio::pin!(gateway);

    let result = tokio::select! {
        result = &mut gateway => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            shutdown.shutdown().await;
            gateway.await
        }
    };

    // The gateway has released its tracker senders; the loop ends once the queue is empty.
    match tokio::time::timeout(DRAIN_TIMEOUT, tracker_task).await {
        Ok(_) => info!("Tracker drained"),
        Err(_) => warn!("Tracker did not drain in time; queued events dropped"),
    }
    result
}
