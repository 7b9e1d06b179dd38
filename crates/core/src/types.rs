//! Gemeinsame Identifikationstypen fuer den Esportbot
//!
//! Die Plattform vergibt 64-Bit-Snowflakes. Alle IDs verwenden das
//! Newtype-Pattern um Verwechslungen zwischen Server-, Kanal- und
//! Benutzer-IDs zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Eindeutige Server-ID (Guild)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(pub u64);

impl GuildId {
    /// Gibt den inneren Snowflake zurueck
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "guild:{}", self.0)
    }
}

/// Eindeutige Kanal-ID (Voice- oder Textkanal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl ChannelId {
    /// Gibt den inneren Snowflake zurueck
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel:{}", self.0)
    }
}

/// Parst eine rein numerische Kanal-ID (z.B. aus einem Befehlsargument)
impl FromStr for ChannelId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(ChannelId)
    }
}

/// Eindeutige Benutzer-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl UserId {
    /// Gibt den inneren Snowflake zurueck
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Erwaehnung im Chat-Format der Plattform (`<@id>`)
    pub fn erwaehnung(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}
