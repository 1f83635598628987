//! Discord gateway glue for StatusKeeper.
//!
//! Gateway callbacks are translated into tracker messages; the tracker's
//! status changes come back out through [`DiscordNotifier`].

pub mod discord;
pub mod discord_embeds;
pub mod discord_notify;
pub mod discord_slash;

pub use discord::{
    tracked_status, DiscordAdapter, DiscordConnection, DiscordSettings, ShutdownHandle,
};
pub use discord_embeds::DiscordEmbeds;
pub use discord_notify::DiscordNotifier;
pub use discord_slash::DiscordSlash;
