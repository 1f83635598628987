//! Presence, voice, and message accounting for StatusKeeper.
//!
//! The free functions in [`status`], [`voice`], [`messages`], and
//! [`reconcile`] operate on any [`statuskeeper_store::RowStore`] with an
//! explicit "now". [`Tracker`] drives them from a single message loop.

pub mod handle;
pub mod messages;
pub mod reconcile;
pub mod report;
pub mod status;
pub mod tracker;
pub mod voice;

pub use handle::TrackerHandle;
pub use messages::record_message;
pub use reconcile::reconcile_members;
pub use report::{lookup_stats, no_activity_text, report_fields, ReportField, StatsReport};
pub use status::{end_status, start_status, transition_status, CreditedInterval, Transition};
pub use tracker::Tracker;
pub use voice::{voice_changed, VoiceTransition};
