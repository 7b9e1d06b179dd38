//! Bot-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Bot ohne Konfigurationsdatei
//! lauffaehig ist.

use anyhow::Context;
use esportbot_audio::LoudnessConfig;
use esportbot_commander::RateLimitKonfig;
use esportbot_core::{ChannelId, GuildId, UserId};
use esportbot_observability::{log_filter_pruefen, LogFormat};
use esportbot_voice::VoiceConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Vollstaendige Bot-Konfiguration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Allgemeine Bot-Einstellungen
    pub bot: BotEinstellungen,
    /// Klassifikator-Einstellungen (Schwelle, Hysterese, Fenster)
    pub lautstaerke: LoudnessConfig,
    /// Voice-Session-Einstellungen
    pub voice: VoiceEinstellungen,
    /// Rate Limit fuer Textbefehle
    pub commander: RateLimitKonfig,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
    /// Startdaten fuer den lokalen Connector
    pub lokal: LokalEinstellungen,
}

/// Allgemeine Bot-Einstellungen
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotEinstellungen {
    /// Anzeigename des Bots
    pub name: String,
    /// Eigene Benutzer-ID (Nachrichten dieses Accounts werden ignoriert)
    pub user_id: UserId,
}

impl Default for BotEinstellungen {
    fn default() -> Self {
        Self {
            name: "Esportbot".into(),
            user_id: UserId(1),
        }
    }
}

/// Voice-Session-Einstellungen (Zeiten in Millisekunden)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceEinstellungen {
    /// Mindestabstand zwischen zwei Meldungen pro Benutzer
    pub cooldown_ms: u64,
    /// Sprecher ohne Frames seit dieser Zeit werden entfernt
    pub stille_timeout_ms: u64,
    /// Intervall der Inaktivitaets-Pruefung
    pub sweep_intervall_ms: u64,
    /// Frame-Queue pro Session
    pub frame_queue: usize,
}

impl Default for VoiceEinstellungen {
    fn default() -> Self {
        Self {
            cooldown_ms: 10_000,
            stille_timeout_ms: 2_000,
            sweep_intervall_ms: 500,
            frame_queue: 64,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level oder Filter-Direktive ("info", "esportbot_voice=debug,info")
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    pub bind_adresse: String,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            bind_adresse: "127.0.0.1".into(),
            port: 9300,
        }
    }
}

/// Ein Voice-Kanal des lokalen Connectors
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KanalEintrag {
    pub id: ChannelId,
    pub name: String,
}

/// Startdaten fuer den lokalen Connector (Konsolenbetrieb)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LokalEinstellungen {
    pub guild_id: GuildId,
    /// Benutzer, als der die Konsoleneingaben geschrieben werden
    pub user_id: UserId,
    /// Textkanal fuer Konsoleneingaben und Antworten
    pub text_kanal: ChannelId,
    pub kanaele: Vec<KanalEintrag>,
}

impl Default for LokalEinstellungen {
    fn default() -> Self {
        Self {
            guild_id: GuildId(1),
            user_id: UserId(100),
            text_kanal: ChannelId(99),
            kanaele: vec![
                KanalEintrag {
                    id: ChannelId(10),
                    name: "General".into(),
                },
                KanalEintrag {
                    id: ChannelId(11),
                    name: "Lobby".into(),
                },
            ],
        }
    }
}

impl BotConfig {
    /// Laedt und validiert die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        Ok(config)
    }

    /// Parst und validiert eine Konfiguration
    pub fn aus_toml(inhalt: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(inhalt)?;
        config.lautstaerke.validieren()?;
        if config.voice.sweep_intervall_ms == 0 {
            anyhow::bail!("voice.sweep_intervall_ms muss groesser als 0 sein");
        }
        log_filter_pruefen(&config.logging.level).map_err(anyhow::Error::msg)?;
        config
            .logging
            .format
            .parse::<LogFormat>()
            .map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Einstellungen fuer den Voice-Controller
    pub fn voice_config(&self) -> VoiceConfig {
        VoiceConfig {
            klassifikator: self.lautstaerke.clone(),
            cooldown: Duration::from_millis(self.voice.cooldown_ms),
            stille_timeout: Duration::from_millis(self.voice.stille_timeout_ms),
            sweep_intervall: Duration::from_millis(self.voice.sweep_intervall_ms),
            frame_queue: self.voice.frame_queue,
            ..VoiceConfig::default()
        }
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!(
            "{}:{}",
            self.observability.bind_adresse, self.observability.port
        );
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Observability-Adresse '{adresse}'"))
    }
}
