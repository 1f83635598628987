//! Stats report model shared by the slash command and the CLI.
//!
//! Totals are read as stored: time in a still-open interval is not included.

use tracing::warn;

use statuskeeper_core::{UserId, UserStatusRecord};
use statuskeeper_store::RowStore;

/// One labelled counter in a stats report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportField {
    pub label: &'static str,
    pub value: String,
}

/// Rendered view of a user's totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsReport {
    NoActivity,
    Totals(Vec<ReportField>),
}

impl StatsReport {
    pub fn from_record(record: Option<&UserStatusRecord>) -> Self {
        match record {
            Some(record) if !record.is_blank() => StatsReport::Totals(report_fields(record)),
            _ => StatsReport::NoActivity,
        }
    }

    /// Plain-text rendering for terminals and logs.
    pub fn render_plain(&self, display_name: &str) -> String {
        match self {
            StatsReport::NoActivity => no_activity_text(display_name),
            StatsReport::Totals(fields) => {
                let mut out = format!("Status Stats for {display_name}\n");
                for field in fields {
                    out.push_str(&format!("  {:<14} {}\n", field.label, field.value));
                }
                out
            }
        }
    }
}

pub fn no_activity_text(display_name: &str) -> String {
    format!("{display_name} has no recorded activity.")
}

/// The six cumulative counters in display order.
pub fn report_fields(record: &UserStatusRecord) -> Vec<ReportField> {
    vec![
        ReportField { label: "Online Time", value: format!("{}s", record.online_seconds) },
        ReportField { label: "Idle Time", value: format!("{}s", record.idle_seconds) },
        ReportField { label: "DND Time", value: format!("{}s", record.dnd_seconds) },
        ReportField { label: "Offline Time", value: format!("{}s", record.offline_seconds) },
        ReportField { label: "Messages Sent", value: record.messages.to_string() },
        ReportField { label: "Voice Time", value: format!("{}s", record.voice_seconds) },
    ]
}

/// Ensure and read `user`'s row for reporting.
///
/// Storage failures and never-active rows both come back as `None`.
pub fn lookup_stats<S: RowStore + ?Sized>(store: &S, user: UserId) -> Option<UserStatusRecord> {
    if let Err(e) = store.ensure(user) {
        warn!(user_id = %user, error = %e, "Failed to ensure status row for report");
    }
    match store.get(user) {
        Ok(Some(record)) if !record.is_blank() => Some(record),
        Ok(_) => None,
        Err(e) => {
            warn!(user_id = %user, error = %e, "Failed to read status row for report");
            None
        }
    }
}
