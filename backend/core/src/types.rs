use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KeeperError;

/// Stable platform identifier of a tracked user (a Discord snowflake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(UserId)
            .map_err(|_| KeeperError::InvalidUserId(s.to_string()))
    }
}

/// Presence status as tracked by the accounting buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Idle,
    Dnd,
    Offline,
}

impl PresenceStatus {
    pub const ALL: [PresenceStatus; 4] = [
        PresenceStatus::Online,
        PresenceStatus::Idle,
        PresenceStatus::Dnd,
        PresenceStatus::Offline,
    ];

    /// Persisted / displayed name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Idle => "idle",
            PresenceStatus::Dnd => "dnd",
            PresenceStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresenceStatus {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(PresenceStatus::Online),
            "idle" => Ok(PresenceStatus::Idle),
            "dnd" => Ok(PresenceStatus::Dnd),
            "offline" => Ok(PresenceStatus::Offline),
            other => Err(KeeperError::UnknownStatus(other.to_string())),
        }
    }
}

/// The status interval a user currently has open, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusInterval {
    #[default]
    NoInterval,
    Open {
        status: PresenceStatus,
        started_at: DateTime<Utc>,
    },
}

impl StatusInterval {
    pub fn open(status: PresenceStatus, started_at: DateTime<Utc>) -> Self {
        StatusInterval::Open { status, started_at }
    }

    pub fn status(&self) -> Option<PresenceStatus> {
        match self {
            StatusInterval::NoInterval => None,
            StatusInterval::Open { status, .. } => Some(*status),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, StatusInterval::Open { .. })
    }
}

/// The voice interval a user currently has open, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceInterval {
    #[default]
    NotInVoice,
    Open { started_at: DateTime<Utc> },
}

impl VoiceInterval {
    pub fn is_open(&self) -> bool {
        matches!(self, VoiceInterval::Open { .. })
    }
}

/// Cumulative per-user activity totals plus the currently open intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStatusRecord {
    pub user_id: UserId,
    pub online_seconds: u64,
    pub idle_seconds: u64,
    pub dnd_seconds: u64,
    pub offline_seconds: u64,
    pub messages: u64,
    pub voice_seconds: u64,
    pub status: StatusInterval,
    pub voice: VoiceInterval,
}

impl UserStatusRecord {
    /// A freshly observed user: zeroed counters, nothing open.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            online_seconds: 0,
            idle_seconds: 0,
            dnd_seconds: 0,
            offline_seconds: 0,
            messages: 0,
            voice_seconds: 0,
            status: StatusInterval::NoInterval,
            voice: VoiceInterval::NotInVoice,
        }
    }

    /// Seconds credited to one status bucket.
    pub fn seconds_in(&self, status: PresenceStatus) -> u64 {
        match status {
            PresenceStatus::Online => self.online_seconds,
            PresenceStatus::Idle => self.idle_seconds,
            PresenceStatus::Dnd => self.dnd_seconds,
            PresenceStatus::Offline => self.offline_seconds,
        }
    }

    /// Sum of all four status buckets.
    pub fn total_status_seconds(&self) -> u64 {
        PresenceStatus::ALL.iter().map(|s| self.seconds_in(*s)).sum()
    }

    /// True when nothing has ever been recorded for this user.
    pub fn is_blank(&self) -> bool {
        self.total_status_seconds() == 0
            && self.messages == 0
            && self.voice_seconds == 0
            && !self.status.is_open()
            && !self.voice.is_open()
    }
}

/// Whole seconds between `start` and `now`, sub-second remainder dropped.
///
/// A clock that moved backwards yields zero.
pub fn elapsed_seconds(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (now - start).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis / 1000) as u64
    }
}
