//! Fehlertypen fuer die Lautstaerke-Klassifikation

use thiserror::Error;

/// Alle moeglichen Fehler der Klassifikation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    /// Frame-Laenge ist kein Vielfaches von 4 Bytes (16 Bit Stereo) oder leer
    #[error("Fehlerhafter Frame: {laenge} Bytes")]
    MalformedFrame { laenge: usize },

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

pub type AudioResult<T> = Result<T, AudioError>;
