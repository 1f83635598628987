//! Status-change announcements posted to a configured log channel.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{Cache, ChannelId, CreateMessage, GuildId, Http};
use tracing::{debug, warn};

use statuskeeper_core::{Notifier, StatusChange};

use crate::discord_embeds::DiscordEmbeds;

pub struct DiscordNotifier {
    http: Arc<Http>,
    cache: Arc<Cache>,
    channel_id: ChannelId,
}

impl DiscordNotifier {
    /// Returns `None` for a zero channel id.
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, channel_id: u64) -> Option<Self> {
        (channel_id != 0).then(|| Self {
            http,
            cache,
            channel_id: ChannelId::new(channel_id),
        })
    }

    /// The log channel is only used for presences from the guild that owns it.
    fn channel_in_guild(&self, guild_id: u64) -> bool {
        if guild_id == 0 {
            return false;
        }
        self.cache
            .guild(GuildId::new(guild_id))
            .map(|guild| guild.channels.contains_key(&self.channel_id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn status_changed(&self, change: &StatusChange) {
        if !self.channel_in_guild(change.guild_id) {
            debug!(
                guild_id = change.guild_id,
                channel_id = %self.channel_id,
                "Log channel not found in guild; skipping notification"
            );
            return;
        }

        let message = CreateMessage::new().embed(DiscordEmbeds::status_change(change));
        if let Err(e) = self.channel_id.send_message(&self.http, message).await {
            warn!(user_id = %change.user, error = %e, "Failed to post status change");
        }
    }
}
