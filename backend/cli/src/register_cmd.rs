//! `statuskeeper register-commands`

use anyhow::Result;
use tracing::info;

use statuskeeper_channels::DiscordSlash;
use statuskeeper_config::StatusKeeperConfig;
use statuskeeper_core::KeeperError;

pub async fn run(config: &StatusKeeperConfig) -> Result<()> {
    let token = config
        .discord
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| KeeperError::Config("discord.token is required to register commands".into()))?;
    let application_id = config
        .discord
        .application_id
        .filter(|id| *id != 0)
        .ok_or_else(|| {
            KeeperError::Config("discord.applicationId is required to register commands".into())
        })?;

    info!(application_id, "Registering slash commands");
    let count = DiscordSlash::register_with_token(token, application_id).await?;
    println!("Registered {count} command(s)");
    Ok(())
}
