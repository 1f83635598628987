//! `statuskeeper stats <user-id>`: read one user's totals straight from the database.

use anyhow::Result;

use statuskeeper_config::defaults::DEFAULT_DB_PATH;
use statuskeeper_config::StatusKeeperConfig;
use statuskeeper_core::UserId;
use statuskeeper_store::{RowStore, SqliteRowStore};
use statuskeeper_tracker::{lookup_stats, StatsReport};

pub fn db_path(config: &StatusKeeperConfig) -> String {
    config
        .storage
        .path
        .clone()
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
}

pub fn run(config: &StatusKeeperConfig, user: UserId) -> Result<()> {
    let store = SqliteRowStore::open(db_path(config))?;
    println!("{}", render(&store, user));
    Ok(())
}

fn render<S: RowStore + ?Sized>(store: &S, user: UserId) -> String {
    let record = lookup_stats(store, user);
    let report = StatsReport::from_record(record.as_ref());
    report.render_plain(&user.to_string()).trim_end().to_string()
}
