//! CommandRouter – von der Textnachricht zur Voice-Session
//!
//! Ablauf pro Nachricht:
//! 1. Nachrichten von Bots (inkl. dem eigenen Account) ignorieren
//! 2. Befehl parsen, unbekannte Nachrichten ignorieren
//! 3. Rate Limit pro Benutzer pruefen
//! 4. Kanal aufloesen und den Controller aufrufen
//! 5. Genau eine Antwort in den Textkanal der Nachricht senden

use std::sync::Arc;

use esportbot_core::{ChannelId, ConnectError, GuildId, PlatformConnector, TextMessage, UserId};
use esportbot_voice::VoiceSessionController;

use crate::error::{CommanderError, CommanderResult, EIGENER_KANAL};
use crate::parser::{kanal_id, parse_befehl, Befehl};
use crate::rate_limit::RateLimiter;

pub struct CommandRouter {
    connector: Arc<dyn PlatformConnector>,
    controller: VoiceSessionController,
    limiter: Arc<RateLimiter>,
    /// Eigener Account, dessen Nachrichten nie ausgewertet werden
    bot_user_id: UserId,
}

impl CommandRouter {
    pub fn neu(
        connector: Arc<dyn PlatformConnector>,
        controller: VoiceSessionController,
        limiter: Arc<RateLimiter>,
        bot_user_id: UserId,
    ) -> Self {
        Self {
            connector,
            controller,
            limiter,
            bot_user_id,
        }
    }

    /// Wertet eine Textnachricht aus.
    ///
    /// Gibt den ausgefuehrten Befehl zurueck, oder None wenn die Nachricht
    /// ignoriert wurde. Jeder erkannte Befehl erzeugt genau eine Antwort.
    pub async fn nachricht_verarbeiten(&self, nachricht: &TextMessage) -> Option<Befehl> {
        if nachricht.author_id == self.bot_user_id || nachricht.author_is_bot {
            return None;
        }
        let befehl = parse_befehl(&nachricht.content)?;

        tracing::debug!(
            guild_id = %nachricht.guild_id,
            author_id = %nachricht.author_id,
            befehl = befehl.name(),
            "Befehl empfangen"
        );

        let ergebnis = match self.limiter.pruefe_benutzer(nachricht.author_id) {
            Ok(()) => self.ausfuehren(&befehl, nachricht).await,
            Err(retry_after_secs) => {
                Err(CommanderError::RateLimitUeberschritten { retry_after_secs })
            }
        };

        let antwort = match ergebnis {
            Ok(text) => text,
            Err(e) => {
                tracing::info!(
                    guild_id = %nachricht.guild_id,
                    author_id = %nachricht.author_id,
                    befehl = befehl.name(),
                    fehler = %e,
                    "Befehl fehlgeschlagen"
                );
                e.antwort()
            }
        };
        self.connector
            .send_text_message(nachricht.channel_id, antwort);

        Some(befehl)
    }

    async fn ausfuehren(&self, befehl: &Befehl, nachricht: &TextMessage) -> CommanderResult<String> {
        match befehl {
            Befehl::Silence(ziel) => self.silence(nachricht, ziel.as_deref()).await,
            Befehl::Unsilence => Ok(self.unsilence(nachricht.guild_id).await),
        }
    }

    async fn silence(&self, nachricht: &TextMessage, ziel: Option<&str>) -> CommanderResult<String> {
        let guild_id = nachricht.guild_id;
        let kanal = self
            .kanal_aufloesen(guild_id, nachricht.author_id, ziel)
            .await?;

        match self
            .controller
            .connect(guild_id, kanal, nachricht.channel_id)
            .await
        {
            Ok(_) => {}
            // Kanal zwischen Suche und Verbindungsaufbau verschwunden
            Err(ConnectError::ChannelNotFound(_)) => {
                return Err(CommanderError::KanalNichtGefunden {
                    ziel: ziel.unwrap_or(EIGENER_KANAL).to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(
                    guild_id = %guild_id,
                    channel_id = %kanal,
                    wiederholbar = e.ist_wiederholbar(),
                    fehler = %e,
                    "Verbindungsaufbau fehlgeschlagen"
                );
                return Err(e.into());
            }
        }

        let name = self
            .connector
            .channel_name(guild_id, kanal)
            .await
            .unwrap_or_else(|| kanal.get().to_string());
        Ok(format!("Connecting to {name}"))
    }

    async fn unsilence(&self, guild_id: GuildId) -> String {
        if self.controller.aktive_session(guild_id).is_none() {
            return "Not connected to a voice channel".to_string();
        }
        self.controller.disconnect(guild_id).await;
        "Disconnected".to_string()
    }

    /// Ohne Argument: Voice-Kanal des Aufrufers.
    /// Mit Argument: erst als Kanal-ID (nur Ziffern), dann per Name
    /// (case-insensitiv, bei Duplikaten der erste Treffer des Connectors).
    async fn kanal_aufloesen(
        &self,
        guild_id: GuildId,
        author_id: UserId,
        ziel: Option<&str>,
    ) -> CommanderResult<ChannelId> {
        let Some(argument) = ziel else {
            return self
                .connector
                .find_voice_channel_of_member(guild_id, author_id)
                .await
                .ok_or_else(|| CommanderError::KanalNichtGefunden {
                    ziel: EIGENER_KANAL.to_string(),
                });
        };

        if let Some(id) = kanal_id(argument) {
            if let Some(kanal) = self.connector.find_voice_channel_by_id(guild_id, id).await {
                return Ok(kanal);
            }
        }

        self.connector
            .find_voice_channels_by_name(guild_id, argument, true)
            .await
            .into_iter()
            .next()
            .ok_or_else(|| CommanderError::KanalNichtGefunden {
                ziel: argument.to_string(),
            })
    }
}
