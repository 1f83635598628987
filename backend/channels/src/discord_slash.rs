//! Discord Slash Commands
//!
//! Defines, registers, and answers the `/statusstats` application command.

use anyhow::{Context, Result};
use serenity::all::{
    Command, CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption,
    ApplicationId, CreateInteractionResponse, Http, ResolvedValue, User,
};
use tracing::{info, warn};

use statuskeeper_tracker::{StatsReport, TrackerHandle};

use crate::discord::tracked_user;
use crate::discord_embeds::DiscordEmbeds;

pub const STATUS_STATS_COMMAND: &str = "statusstats";
pub const TARGET_OPTION: &str = "target";

pub struct DiscordSlash;

impl DiscordSlash {
    /// Schema for `/statusstats [target]`.
    pub fn statusstats_command() -> CreateCommand {
        CreateCommand::new(STATUS_STATS_COMMAND)
            .description("Shows total status stats for a user")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, TARGET_OPTION, "User to check")
                    .required(false),
            )
    }

    /// Overwrite the global command set with ours. Safe to repeat.
    pub async fn register_commands(http: &Http) -> Result<usize> {
        let registered = Command::set_global_commands(http, vec![Self::statusstats_command()])
            .await
            .context("Failed to register global slash commands")?;
        info!(count = registered.len(), "Commands registered");
        Ok(registered.len())
    }

    /// Register over REST alone, without opening a gateway session.
    pub async fn register_with_token(token: &str, application_id: u64) -> Result<usize> {
        if application_id == 0 {
            anyhow::bail!("Application id must be non-zero");
        }
        let http = Http::new(token);
        http.set_application_id(ApplicationId::new(application_id));
        Self::register_commands(&http).await
    }

    /// The `target` option if given, otherwise the invoking user.
    pub fn resolve_target(command: &CommandInteraction) -> &User {
        command
            .data
            .options()
            .into_iter()
            .find_map(|option| match option.value {
                ResolvedValue::User(user, _) if option.name == TARGET_OPTION => Some(user),
                _ => None,
            })
            .unwrap_or(&command.user)
    }

    /// Answer a `/statusstats` invocation.
    pub async fn handle_statusstats(
        http: &Http,
        command: &CommandInteraction,
        tracker: &TrackerHandle,
    ) -> Result<()> {
        let target = Self::resolve_target(command);
        let display_name = target.tag();

        let record = match tracker.query_stats(tracked_user(target.id)).await {
            Ok(record) => record,
            Err(e) => {
                warn!(user_id = %target.id, error = %e, "Stats lookup failed");
                None
            }
        };
        let report = StatsReport::from_record(record.as_ref());

        command
            .create_response(
                http,
                CreateInteractionResponse::Message(DiscordEmbeds::stats_response(&display_name, &report)),
            )
            .await
            .context("Failed to reply to /statusstats")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statusstats_schema_has_optional_user_target() {
        let schema = serde_json::to_value(DiscordSlash::statusstats_command()).unwrap();
        assert_eq!(schema["name"], "statusstats");
        assert_eq!(schema["description"], "Shows total status stats for a user");

        let option = &schema["options"][0];
        assert_eq!(option["name"], "target");
        // Discord application command option type 6 is USER.
        assert_eq!(option["type"], 6);
        assert_ne!(option["required"], true);
    }
}
