//! Konfiguration des Voice-Controllers

use esportbot_audio::LoudnessConfig;
use std::time::Duration;

/// Standard-Abklingzeit zwischen zwei Meldungen pro Benutzer
pub const STANDARD_COOLDOWN: Duration = Duration::from_secs(10);
/// Standard-Zeit ohne Frames bis ein Sprecher entfernt wird
pub const STANDARD_STILLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Einstellungen fuer Sessions und Klassifikatoren
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Einstellungen fuer jeden Klassifikator
    pub klassifikator: LoudnessConfig,
    /// Hoechstens eine Meldung pro Benutzer innerhalb dieses Fensters
    pub cooldown: Duration,
    /// Sprecher ohne Frames seit dieser Zeit werden entfernt
    pub stille_timeout: Duration,
    /// Intervall der Inaktivitaets-Pruefung
    pub sweep_intervall: Duration,
    /// Groesse der Frame-Queue pro Session (volle Queue = Frame verworfen)
    pub frame_queue: usize,
    /// Zeitbudget fuer die Verarbeitung eines Frames
    pub frame_budget: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            klassifikator: LoudnessConfig::default(),
            cooldown: STANDARD_COOLDOWN,
            stille_timeout: STANDARD_STILLE_TIMEOUT,
            sweep_intervall: Duration::from_millis(500),
            frame_queue: 64,
            frame_budget: Duration::from_millis(20),
        }
    }
}
