//! In-Process-Connector
//!
//! Haelt Kanaele, Voice-Zustaende der Mitglieder, offene Verbindungen und
//! registrierte Callbacks im Speicher. Callbacks werden nie unter dem
//! internen Lock aufgerufen.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use super::{AudioSink, EventHandler, PlatformConnector};
use crate::error::ConnectError;
use crate::event::{PlatformEvent, TextMessage};
use crate::frame::AudioFrame;
use crate::types::{ChannelId, GuildId, UserId};

#[derive(Default)]
struct LokalerZustand {
    /// Voice-Kanaele pro Server in Anlage-Reihenfolge
    kanaele: HashMap<GuildId, Vec<(ChannelId, String)>>,
    /// Aktueller Voice-Kanal pro Mitglied
    mitglieder: HashMap<(GuildId, UserId), ChannelId>,
    /// Offene Audio-Verbindungen
    verbindungen: HashMap<GuildId, ChannelId>,
    sinks: HashMap<GuildId, AudioSink>,
    handler: Vec<EventHandler>,
    /// Zugestellte Textnachrichten (Kanal, Text)
    gesendet: Vec<(ChannelId, String)>,
    /// Simulierte Dauer des Verbindungsaufbaus
    oeffnen_verzoegerung: Option<Duration>,
    /// Naechster Verbindungsaufbau schlaegt mit diesem Fehler fehl
    oeffnen_fehler: Option<ConnectError>,
}

/// Connector ohne Netzwerk, vollstaendig im Speicher
#[derive(Default)]
pub struct LocalConnector {
    zustand: Mutex<LokalerZustand>,
}

impl LocalConnector {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt einen Voice-Kanal an
    pub fn kanal_anlegen(&self, guild_id: GuildId, channel_id: ChannelId, name: impl Into<String>) {
        self.zustand
            .lock()
            .kanaele
            .entry(guild_id)
            .or_default()
            .push((channel_id, name.into()));
    }

    /// Setzt den Voice-Kanal eines Mitglieds (None = in keinem Kanal)
    pub fn mitglied_setzen(&self, guild_id: GuildId, user_id: UserId, kanal: Option<ChannelId>) {
        let mut z = self.zustand.lock();
        match kanal {
            Some(k) => {
                z.mitglieder.insert((guild_id, user_id), k);
            }
            None => {
                z.mitglieder.remove(&(guild_id, user_id));
            }
        }
    }

    /// Verzoegert jeden folgenden Verbindungsaufbau
    pub fn oeffnen_verzoegern(&self, dauer: Duration) {
        self.zustand.lock().oeffnen_verzoegerung = Some(dauer);
    }

    /// Laesst den naechsten Verbindungsaufbau fehlschlagen
    pub fn oeffnen_fehlschlagen_lassen(&self, fehler: ConnectError) {
        self.zustand.lock().oeffnen_fehler = Some(fehler);
    }

    /// Stellt einen Frame an den registrierten Sink zu.
    /// Gibt false zurueck wenn fuer den Server kein Sink registriert ist.
    pub fn audio_einspeisen(&self, guild_id: GuildId, user_id: UserId, frame: AudioFrame) -> bool {
        let sink = self.zustand.lock().sinks.get(&guild_id).cloned();
        match sink {
            Some(sink) => {
                sink(user_id, frame);
                true
            }
            None => false,
        }
    }

    /// Stellt ein Ereignis an alle registrierten Handler zu
    pub fn ereignis_einspeisen(&self, event: PlatformEvent) {
        let handler = self.zustand.lock().handler.clone();
        for h in handler {
            h(event.clone());
        }
    }

    /// Bequemlichkeit: Textnachricht als Ereignis zustellen
    pub fn nachricht_einspeisen(&self, nachricht: TextMessage) {
        self.ereignis_einspeisen(PlatformEvent::Message(nachricht));
    }

    /// Simuliert einen Verbindungsabbruch: Verbindung und Sink verschwinden,
    /// danach wird `ConnectionLost` gemeldet. Ohne offene Verbindung passiert nichts.
    pub fn verbindung_abbrechen(&self, guild_id: GuildId) {
        let channel_id = {
            let mut z = self.zustand.lock();
            z.sinks.remove(&guild_id);
            z.verbindungen.remove(&guild_id)
        };
        let Some(channel_id) = channel_id else {
            tracing::debug!(guild_id = %guild_id, "Keine offene Verbindung zum Abbrechen");
            return;
        };
        tracing::warn!(guild_id = %guild_id, channel_id = %channel_id, "Lokale Verbindung abgebrochen");
        self.ereignis_einspeisen(PlatformEvent::ConnectionLost {
            guild_id,
            channel_id,
        });
    }

    /// Alle bisher gesendeten Nachrichten
    pub fn gesendete_nachrichten(&self) -> Vec<(ChannelId, String)> {
        self.zustand.lock().gesendet.clone()
    }

    /// Kanal der offenen Audio-Verbindung eines Servers
    pub fn offene_verbindung(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.zustand.lock().verbindungen.get(&guild_id).copied()
    }

    /// Prueft ob fuer den Server ein Audio-Sink registriert ist
    pub fn sink_registriert(&self, guild_id: GuildId) -> bool {
        self.zustand.lock().sinks.contains_key(&guild_id)
    }
}

#[async_trait]
impl PlatformConnector for LocalConnector {
    async fn find_voice_channel_of_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Option<ChannelId> {
        self.zustand.lock().mitglieder.get(&(guild_id, user_id)).copied()
    }

    async fn find_voice_channel_by_id(
        &self,
        guild_id: GuildId,
        id: ChannelId,
    ) -> Option<ChannelId> {
        let z = self.zustand.lock();
        z.kanaele
            .get(&guild_id)
            .and_then(|k| k.iter().find(|(kid, _)| *kid == id))
            .map(|(kid, _)| *kid)
    }

    async fn find_voice_channels_by_name(
        &self,
        guild_id: GuildId,
        name: &str,
        ignore_case: bool,
    ) -> Vec<ChannelId> {
        let z = self.zustand.lock();
        z.kanaele
            .get(&guild_id)
            .map(|k| {
                k.iter()
                    .filter(|(_, n)| {
                        if ignore_case {
                            n.to_lowercase() == name.to_lowercase()
                        } else {
                            n == name
                        }
                    })
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn channel_name(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<String> {
        let z = self.zustand.lock();
        z.kanaele
            .get(&guild_id)
            .and_then(|k| k.iter().find(|(id, _)| *id == channel_id))
            .map(|(_, n)| n.clone())
    }

    async fn open_audio_connection(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<(), ConnectError> {
        let verzoegerung = self.zustand.lock().oeffnen_verzoegerung;
        if let Some(dauer) = verzoegerung {
            tokio::time::sleep(dauer).await;
        }

        let mut z = self.zustand.lock();
        if let Some(fehler) = z.oeffnen_fehler.take() {
            return Err(fehler);
        }
        let existiert = z
            .kanaele
            .get(&guild_id)
            .is_some_and(|k| k.iter().any(|(id, _)| *id == channel_id));
        if !existiert {
            return Err(ConnectError::ChannelNotFound(channel_id));
        }
        z.verbindungen.insert(guild_id, channel_id);
        tracing::debug!(guild_id = %guild_id, channel_id = %channel_id, "Lokale Verbindung geoeffnet");
        Ok(())
    }

    async fn close_audio_connection(&self, guild_id: GuildId) {
        if self.zustand.lock().verbindungen.remove(&guild_id).is_some() {
            tracing::debug!(guild_id = %guild_id, "Lokale Verbindung geschlossen");
        }
    }

    fn register_audio_sink(&self, guild_id: GuildId, sink: AudioSink) {
        self.zustand.lock().sinks.insert(guild_id, sink);
    }

    fn unregister_audio_sink(&self, guild_id: GuildId) {
        self.zustand.lock().sinks.remove(&guild_id);
    }

    fn register_event_handler(&self, handler: EventHandler) {
        self.zustand.lock().handler.push(handler);
    }

    fn send_text_message(&self, channel_id: ChannelId, text: String) {
        tracing::info!(channel_id = %channel_id, text = %text, "Nachricht gesendet");
        self.zustand.lock().gesendet.push((channel_id, text));
    }
}
