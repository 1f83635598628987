//! Log Redaction Layer
//!
//! Scrubs Discord bot tokens and authorization headers from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

// Bot token shape: base64 user id, timestamp, HMAC.
static BOT_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[MNO][A-Za-z\d_-]{23,27}\.[A-Za-z\d_-]{6}\.[A-Za-z\d_-]{27,40}").unwrap()
});
static AUTH_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(Bot|Bearer)\s+[A-Za-z0-9\-\._~+/]{20,}=*").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = AUTH_HEADER_RE.replace_all(input, "$1 [REDACTED_TOKEN]");
    BOT_TOKEN_RE.replace_all(&redacted, "[REDACTED_TOKEN]").into_owned()
}
