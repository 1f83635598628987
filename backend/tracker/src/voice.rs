//! Voice accounting.
//!
//! Joining any channel opens a voice interval, leaving all channels closes it.
//! Moving between channels keeps the interval running.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use statuskeeper_core::{elapsed_seconds, UserId, VoiceInterval};
use statuskeeper_store::{RecordPatch, RowStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTransition {
    Joined,
    Left { elapsed_secs: u64 },
    Moved,
    Unchanged,
}

/// Apply a voice state change for `user`.
///
/// An uncached previous state arrives as `old_channel = None`, the same as
/// "not in a channel", so every join opens a fresh interval. An interval left
/// open across a restart is replaced on the next join rather than credited.
pub fn voice_changed<S: RowStore + ?Sized>(
    store: &S,
    user: UserId,
    old_channel: Option<u64>,
    new_channel: Option<u64>,
    now: DateTime<Utc>,
) -> Result<VoiceTransition> {
    store.ensure(user)?;
    let Some(record) = store.get(user)? else {
        return Ok(VoiceTransition::Unchanged);
    };

    match (old_channel, new_channel) {
        (None, Some(_)) => {
            if record.voice.is_open() {
                debug!(user_id = %user, "Replacing stale voice interval");
            }
            store.update(
                user,
                &RecordPatch::new().set_voice(VoiceInterval::Open { started_at: now }),
            )?;
            debug!(user_id = %user, "Voice interval opened");
            Ok(VoiceTransition::Joined)
        }
        (Some(_), None) => match record.voice {
            VoiceInterval::Open { started_at } => {
                let elapsed_secs = elapsed_seconds(started_at, now);
                store.update(
                    user,
                    &RecordPatch::new()
                        .add_voice_seconds(elapsed_secs)
                        .set_voice(VoiceInterval::NotInVoice),
                )?;
                debug!(user_id = %user, elapsed_secs, "Voice interval closed");
                Ok(VoiceTransition::Left { elapsed_secs })
            }
            VoiceInterval::NotInVoice => Ok(VoiceTransition::Unchanged),
        },
        (Some(old), Some(new)) if old != new => Ok(VoiceTransition::Moved),
        _ => Ok(VoiceTransition::Unchanged),
    }
}
