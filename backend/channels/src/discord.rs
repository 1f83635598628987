use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{
    ApplicationId, Client, Context, EventHandler, GatewayIntents, GuildId, Interaction, ShardManager,
    Message as DiscordMessage, OnlineStatus, Presence, Ready, User, UserId as DiscordUserId,
    VoiceState,
};
use tracing::{debug, error, info, warn};

use statuskeeper_core::{PresenceStatus, UserId};
use statuskeeper_tracker::TrackerHandle;

use crate::discord_notify::DiscordNotifier;
use crate::discord_slash::{DiscordSlash, STATUS_STATS_COMMAND};

/// Members fetched per REST page during reconciliation.
const MEMBER_PAGE_SIZE: u64 = 1000;

pub(crate) fn tracked_user(id: DiscordUserId) -> UserId {
    UserId(id.get())
}

/// Map a gateway status onto an accounting bucket. Invisible users look offline.
pub fn tracked_status(status: OnlineStatus) -> PresenceStatus {
    match status {
        OnlineStatus::Online => PresenceStatus::Online,
        OnlineStatus::Idle => PresenceStatus::Idle,
        OnlineStatus::DoNotDisturb => PresenceStatus::Dnd,
        _ => PresenceStatus::Offline,
    }
}

/// Messages from bot and system accounts are not counted.
fn counts_message(author: &User) -> bool {
    !author.bot && !author.system
}

/// Tracker fields for an observed presence. Presences from outside a guild are ignored.
fn presence_event(
    guild_id: Option<GuildId>,
    user: DiscordUserId,
    status: OnlineStatus,
) -> Option<(UserId, u64, PresenceStatus)> {
    let guild_id = guild_id?;
    Some((tracked_user(user), guild_id.get(), tracked_status(status)))
}

/// Connection settings for the Discord gateway.
#[derive(Clone)]
pub struct DiscordSettings {
    pub token: String,
    pub application_id: Option<u64>,
    pub log_channel_id: Option<u64>,
}

struct Handler {
    tracker: TrackerHandle,
    register_commands: bool,
}

impl Handler {
    fn display_name(ctx: &Context, presence: &Presence) -> String {
        let id = presence.user.id;
        ctx.cache
            .user(id)
            .map(|user| user.tag())
            .or_else(|| presence.user.to_user().map(|user| user.tag()))
            .unwrap_or_else(|| format!("<@{id}>"))
    }

    /// Page through every member of `guild_id`, pairing each with its cached presence.
    async fn guild_members(ctx: &Context, guild_id: GuildId) -> Result<Vec<(UserId, PresenceStatus)>> {
        let presences: HashMap<DiscordUserId, OnlineStatus> = ctx
            .cache
            .guild(guild_id)
            .map(|guild| guild.presences.iter().map(|(id, p)| (*id, p.status)).collect())
            .unwrap_or_default();

        let mut members = Vec::new();
        let mut after: Option<DiscordUserId> = None;
        loop {
            let page = guild_id
                .members(&ctx.http, Some(MEMBER_PAGE_SIZE), after)
                .await
                .with_context(|| format!("Failed to fetch members of guild {guild_id}"))?;
            let page_len = page.len();
            after = page.last().map(|member| member.user.id);

            members.extend(page.into_iter().map(|member| {
                let status = presences
                    .get(&member.user.id)
                    .copied()
                    .map(tracked_status)
                    .unwrap_or(PresenceStatus::Offline);
                (tracked_user(member.user.id), status)
            }));

            if (page_len as u64) < MEMBER_PAGE_SIZE {
                break;
            }
        }
        Ok(members)
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, msg: DiscordMessage) {
        if !counts_message(&msg.author) {
            return;
        }
        let _ = self.tracker.message_seen(tracked_user(msg.author.id)).await;
    }

    async fn presence_update(&self, ctx: Context, presence: Presence) {
        let Some((user, guild_id, status)) =
            presence_event(presence.guild_id, presence.user.id, presence.status)
        else {
            return;
        };
        let display_name = Self::display_name(&ctx, &presence);
        let _ = self
            .tracker
            .presence_changed(user, display_name, guild_id, status)
            .await;
    }

    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let old_channel = old.and_then(|state| state.channel_id).map(|c| c.get());
        let new_channel = new.channel_id.map(|c| c.get());
        let _ = self
            .tracker
            .voice_changed(tracked_user(new.user_id), old_channel, new_channel)
            .await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        if command.data.name != STATUS_STATS_COMMAND {
            return;
        }
        if let Err(e) = DiscordSlash::handle_statusstats(&ctx.http, &command, &self.tracker).await {
            error!(error = %e, "Error answering /statusstats");
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.tag());

        if self.register_commands {
            let http = ctx.http.clone();
            tokio::spawn(async move {
                if let Err(e) = DiscordSlash::register_commands(&http).await {
                    error!(error = %e, "Command registration failed");
                }
            });
        } else {
            warn!("No application id configured; skipping command registration");
        }
    }

    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        info!(guilds = guilds.len(), "Guild cache ready; reconciling members");
        for guild_id in guilds {
            match Self::guild_members(&ctx, guild_id).await {
                Ok(members) => {
                    debug!(guild_id = %guild_id, members = members.len(), "Fetched guild members");
                    let _ = self.tracker.reconcile(members).await;
                }
                Err(e) => warn!(guild_id = %guild_id, error = %e, "Skipping guild reconciliation"),
            }
        }
    }
}

pub struct DiscordAdapter {
    settings: DiscordSettings,
}

impl DiscordAdapter {
    pub fn new(settings: DiscordSettings) -> Self {
        Self { settings }
    }

    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_PRESENCES
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_VOICE_STATES
    }

    /// Build the gateway client, routing every event into `tracker`.
    pub async fn connect(&self, tracker: TrackerHandle) -> Result<DiscordConnection> {
        info!("Starting Discord adapter");

        let application_id = self.settings.application_id.filter(|id| *id != 0);
        let handler = Handler {
            tracker,
            register_commands: application_id.is_some(),
        };

        let client = Client::builder(&self.settings.token, Self::intents())
            .event_handler(handler)
            .await
            .context("Failed to build Discord client")?;
        if let Some(id) = application_id {
            client.http.set_application_id(ApplicationId::new(id));
        }

        Ok(DiscordConnection {
            client,
            log_channel_id: self.settings.log_channel_id,
        })
    }
}

/// A built but not yet started gateway client.
pub struct DiscordConnection {
    client: Client,
    log_channel_id: Option<u64>,
}

impl DiscordConnection {
    /// Notifier bound to this client's HTTP and cache, if a log channel is set.
    pub fn notifier(&self) -> Option<DiscordNotifier> {
        let channel_id = self.log_channel_id?;
        DiscordNotifier::new(self.client.http.clone(), self.client.cache.clone(), channel_id)
    }

    /// Handle for stopping the gateway from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shard_manager: Arc::clone(&self.client.shard_manager),
        }
    }

    /// Run the gateway until it stops. A login failure is returned as an error.
    ///
    /// The event handler, and with it every tracker sender it holds, is
    /// released when this returns.
    pub async fn run(mut self) -> Result<()> {
        if let Err(why) = self.client.start().await {
            error!("Client error: {:?}", why);
            anyhow::bail!("Discord client error: {:?}", why);
        }
        Ok(())
    }
}

/// Stops every shard, which makes [`DiscordConnection::run`] return.
#[derive(Clone)]
pub struct ShutdownHandle {
    shard_manager: Arc<ShardManager>,
}

impl ShutdownHandle {
    pub async fn shutdown(&self) {
        info!("Stopping Discord shards");
        self.shard_manager.shutdown_all().await;
    }
}
