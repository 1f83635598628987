//! Discord Embed Builder
//!
//! Renders status-change announcements and stats reports as Discord embeds.

use serenity::all::{Colour, CreateEmbed, CreateInteractionResponseMessage, Timestamp};

use statuskeeper_core::StatusChange;
use statuskeeper_tracker::{no_activity_text, StatsReport};

const STATUS_CHANGE_COLOUR: Colour = Colour::BLUE;
const STATS_COLOUR: Colour = Colour::new(0x57F287);

pub struct DiscordEmbeds;

impl DiscordEmbeds {
    /// Blue "Status Changed" card posted to the log channel.
    pub fn status_change(change: &StatusChange) -> CreateEmbed {
        CreateEmbed::new()
            .title("Status Changed")
            .description(status_change_description(change))
            .field("Time in previous status", format!("{} seconds", change.elapsed_secs), true)
            .colour(STATUS_CHANGE_COLOUR)
            .timestamp(Timestamp::now())
    }

    /// Green card with the six cumulative counters.
    pub fn stats(display_name: &str, report: &StatsReport) -> Option<CreateEmbed> {
        let StatsReport::Totals(fields) = report else {
            return None;
        };
        let embed = CreateEmbed::new()
            .title(format!("Status Stats for {display_name}"))
            .fields(fields.iter().map(|f| (f.label, f.value.clone(), true)))
            .colour(STATS_COLOUR)
            .timestamp(Timestamp::now());
        Some(embed)
    }

    /// Interaction reply for `/statusstats`: an embed, or the plain fallback text.
    pub fn stats_response(display_name: &str, report: &StatsReport) -> CreateInteractionResponseMessage {
        match Self::stats(display_name, report) {
            Some(embed) => CreateInteractionResponseMessage::new().embed(embed),
            None => CreateInteractionResponseMessage::new().content(no_activity_text(display_name)),
        }
    }
}

pub fn status_change_description(change: &StatusChange) -> String {
    format!(
        "{} changed from **{}** to **{}**",
        change.display_name, change.previous, change.current
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use statuskeeper_core::{PresenceStatus, UserId, UserStatusRecord};

    #[test]
    fn describes_transition() {
        let change = StatusChange {
            user: UserId(1),
            display_name: "alice#0001".to_string(),
            guild_id: 9,
            previous: PresenceStatus::Online,
            current: PresenceStatus::Idle,
            elapsed_secs: 10,
        };
        assert_eq!(
            status_change_description(&change),
            "alice#0001 changed from **online** to **idle**"
        );
    }

    #[test]
    fn status_change_embed_reports_elapsed_seconds() {
        let change = StatusChange {
            user: UserId(1),
            display_name: "alice#0001".to_string(),
            guild_id: 9,
            previous: PresenceStatus::Online,
            current: PresenceStatus::Idle,
            elapsed_secs: 10,
        };
        let embed = serde_json::to_value(DiscordEmbeds::status_change(&change)).unwrap();
        assert_eq!(embed["title"], "Status Changed");
        assert_eq!(embed["description"], "alice#0001 changed from **online** to **idle**");
        assert_eq!(embed["fields"][0]["name"], "Time in previous status");
        assert_eq!(embed["fields"][0]["value"], "10 seconds");
        assert_eq!(embed["fields"][0]["inline"], true);
    }

    #[test]
    fn no_activity_has_no_embed() {
        assert!(DiscordEmbeds::stats("bob", &StatsReport::NoActivity).is_none());

        let record = UserStatusRecord { messages: 1, ..UserStatusRecord::new(UserId(2)) };
        let report = StatsReport::from_record(Some(&record));
        assert!(DiscordEmbeds::stats("bob", &report).is_some());
    }
}
