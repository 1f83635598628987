//! Structured logging for StatusKeeper.
//!
//! Handles console and rolling NDJSON file output, plus redaction of Discord credentials.

pub mod logger;
pub mod redact;

pub use logger::{LogGuard, init_logger};
pub use redact::redact_sensitive_data;
