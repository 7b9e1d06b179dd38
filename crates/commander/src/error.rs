//! Fehlertypen fuer den Esportbot Commander

use esportbot_core::ConnectError;
use thiserror::Error;

/// Ziel-Bezeichnung wenn `!silence` ohne Argument aufgerufen wurde
pub const EIGENER_KANAL: &str = "your voice channel";

/// Alle moeglichen Fehler bei der Befehlsausfuehrung
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommanderError {
    /// Kein Voice-Kanal zum Argument (oder Mitglied in keinem Kanal)
    #[error("Kanal nicht gefunden: {ziel}")]
    KanalNichtGefunden { ziel: String },

    #[error("Verbindungsfehler: {0}")]
    Verbindung(#[from] ConnectError),

    #[error("Rate Limit ueberschritten: bitte warte {retry_after_secs} Sekunden")]
    RateLimitUeberschritten { retry_after_secs: u64 },
}

pub type CommanderResult<T> = Result<T, CommanderError>;

impl CommanderError {
    /// Antworttext fuer den Textkanal
    pub fn antwort(&self) -> String {
        match self {
            Self::KanalNichtGefunden { ziel } => {
                format!("Unable to connect to \"{ziel}\", no such channel!")
            }
            Self::Verbindung(ConnectError::AlreadyConnecting(_)) => {
                "Already connecting to a voice channel, please wait!".to_string()
            }
            Self::Verbindung(_) => {
                "Unable to connect to the voice channel, please try again!".to_string()
            }
            Self::RateLimitUeberschritten { retry_after_secs } => {
                format!("Slow down! Try again in {retry_after_secs} seconds.")
            }
        }
    }
}
