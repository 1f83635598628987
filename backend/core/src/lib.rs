pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use error::KeeperError;
pub use message::TrackerMessage;
pub use traits::{Clock, Component, ManualClock, NoopNotifier, Notifier, StatusChange, SystemClock};
pub use types::{
    elapsed_seconds, PresenceStatus, StatusInterval, UserId, UserStatusRecord, VoiceInterval,
};
