//! Ereignisse zwischen Plattform und Bot
//!
//! `PlatformEvent` fliesst vom Connector in den Bot (Textnachrichten,
//! Verbindungsverlust, Benutzer verlaesst Kanal). `ModerationEvent` fliesst
//! in die Gegenrichtung und beschreibt einen Lautstaerke-Verstoss.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, GuildId, UserId};

/// Eine vom Connector bereits geparste Textnachricht in einem Server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
    pub guild_id: GuildId,
    /// Textkanal in dem die Nachricht geschrieben wurde (Ziel fuer Antworten)
    pub channel_id: ChannelId,
    pub author_id: UserId,
    /// Autor ist ein Bot-Account
    pub author_is_bot: bool,
    /// Unveraenderter Nachrichteninhalt
    pub content: String,
}

/// Ereignisse die der Connector an registrierte Handler liefert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlatformEvent {
    /// Neue Textnachricht in einem Server
    Message(TextMessage),
    /// Ein Benutzer hat den Voice-Kanal des Bots verlassen
    UserLeft { guild_id: GuildId, user_id: UserId },
    /// Die Audio-Verbindung eines Servers zu `channel_id` ist abgerissen
    ConnectionLost {
        guild_id: GuildId,
        channel_id: ChannelId,
    },
}

/// Ein erkannter Lautstaerke-Verstoss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationEvent {
    pub guild_id: GuildId,
    pub user_id: UserId,
    /// Hoechster geglaetteter Pegel in dBFS waehrend des Verstosses
    pub peak_db: f64,
    pub zeitpunkt: DateTime<Utc>,
}

impl ModerationEvent {
    /// Text der im Benachrichtigungskanal erscheint
    pub fn nachricht(&self) -> String {
        format!(
            "{} is too loud ({:.1} dBFS), please lower your volume!",
            self.user_id.erwaehnung(),
            self.peak_db
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_nachricht_erwaehnt_benutzer() {
        let event = ModerationEvent {
            guild_id: GuildId(1),
            user_id: UserId(77),
            peak_db: -3.04,
            zeitpunkt: Utc::now(),
        };
        assert_eq!(
            event.nachricht(),
            "<@77> is too loud (-3.0 dBFS), please lower your volume!"
        );
    }

    #[test]
    fn event_ist_serde_kompatibel() {
        let event = PlatformEvent::UserLeft {
            guild_id: GuildId(1),
            user_id: UserId(2),
        };
        let json = serde_json::to_string(&event).unwrap();
        let zurueck: PlatformEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, event);
    }
}
