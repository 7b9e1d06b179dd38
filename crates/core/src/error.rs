//! Fehlertypen fuer den Verbindungsaufbau zu Voice-Kanaelen
//!
//! `ConnectError` wird sowohl vom `PlatformConnector` als auch vom
//! Voice-Controller verwendet und landet am Ende als Textantwort beim Benutzer.

use thiserror::Error;

use crate::types::{ChannelId, GuildId};

/// Alle moeglichen Fehler beim Verbinden mit einem Voice-Kanal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// Der Connector kennt den angeforderten Kanal nicht
    #[error("Kanal nicht gefunden: {0}")]
    ChannelNotFound(ChannelId),

    /// Fuer diesen Server laeuft bereits ein Verbindungsaufbau
    #[error("Verbindungsaufbau fuer {0} laeuft bereits")]
    AlreadyConnecting(GuildId),

    /// Die Audio-Verbindung wurde vom Connector als verloren gemeldet
    #[error("Verbindung zu {0} verloren")]
    ConnectionLost(GuildId),

    /// Sonstiger Fehler des Connectors (z.B. fehlende Berechtigung)
    #[error("Connector-Fehler: {0}")]
    Connector(String),
}

impl ConnectError {
    /// Gibt true zurueck wenn ein erneuter Versuch sinnvoll ist
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(self, Self::AlreadyConnecting(_) | Self::ConnectionLost(_))
    }
}
