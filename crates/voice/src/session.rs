//! Voice-Session – Zustand einer aktiven Verbindung eines Servers
//!
//! Verwaltet pro Sprecher:
//! - Klassifikator (Glaettung, Hysterese)
//! - Zeitpunkt des letzten Frames (Inaktivitaets-Pruefung)
//!
//! Der Zeitpunkt der letzten Meldung (Cooldown) liegt getrennt davon in der
//! Session und ueberlebt das Entfernen inaktiver Sprecher.
//!
//! Die Session ist reiner Zustand ohne I/O und wird exklusiv vom Actor-Task
//! des Servers veraendert. Die aktuelle Zeit wird explizit uebergeben.

use chrono::{DateTime, Utc};
use esportbot_audio::{AudioResult, Decision, LoudnessClassifier, LoudnessConfig};
use esportbot_core::{AudioFrame, ChannelId, GuildId, ModerationEvent, UserId};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use crate::config::VoiceConfig;

// ---------------------------------------------------------------------------
// VoiceSessionHandle
// ---------------------------------------------------------------------------

/// Beschreibung einer aktiven Session (Rueckgabe von `connect`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSessionHandle {
    /// Eindeutige ID dieser Session (neu bei jedem Connect)
    pub session_id: Uuid,
    pub guild_id: GuildId,
    /// Voice-Kanal der Verbindung
    pub channel_id: ChannelId,
    /// Textkanal fuer Meldungen
    pub notify_channel: ChannelId,
    pub gestartet: DateTime<Utc>,
}

impl VoiceSessionHandle {
    pub fn neu(guild_id: GuildId, channel_id: ChannelId, notify_channel: ChannelId) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            guild_id,
            channel_id,
            notify_channel,
            gestartet: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoudnessState
// ---------------------------------------------------------------------------

/// Zustand eines einzelnen Sprechers
#[derive(Debug, Clone)]
pub struct LoudnessState {
    klassifikator: LoudnessClassifier,
    /// Zeitpunkt des letzten gueltigen Frames
    letzter_frame: Instant,
}

impl LoudnessState {
    pub fn neu(config: LoudnessConfig, jetzt: Instant) -> Self {
        Self {
            klassifikator: LoudnessClassifier::new(config),
            letzter_frame: jetzt,
        }
    }

    pub fn klassifikator(&self) -> &LoudnessClassifier {
        &self.klassifikator
    }

    /// Prueft ob der Sprecher seit `timeout` keinen Frame geliefert hat
    pub fn ist_inaktiv(&self, jetzt: Instant, timeout: std::time::Duration) -> bool {
        jetzt.saturating_duration_since(self.letzter_frame) >= timeout
    }
}

// ---------------------------------------------------------------------------
// VoiceSession
// ---------------------------------------------------------------------------

/// Zustand einer Voice-Session
pub struct VoiceSession {
    handle: VoiceSessionHandle,
    config: VoiceConfig,
    benutzer: HashMap<UserId, LoudnessState>,
    /// Letzte Meldung pro Sprecher, unabhaengig vom Klassifikator-Zustand
    letzte_meldungen: HashMap<UserId, Instant>,
}

impl VoiceSession {
    /// Erstellt eine Session mit leerer Sprecher-Tabelle
    pub fn neu(handle: VoiceSessionHandle, config: VoiceConfig) -> Self {
        Self {
            handle,
            config,
            benutzer: HashMap::new(),
            letzte_meldungen: HashMap::new(),
        }
    }

    pub fn handle(&self) -> &VoiceSessionHandle {
        &self.handle
    }

    pub fn notify_channel(&self) -> ChannelId {
        self.handle.notify_channel
    }

    /// Verarbeitet einen Frame eines Sprechers.
    ///
    /// Legt den Sprecher beim ersten Frame an. Gibt ein `ModerationEvent`
    /// zurueck wenn der Sprecher gerade in den Zustand "zu laut" wechselt und
    /// seine letzte Meldung laenger als der Cooldown zurueckliegt.
    /// Ein fehlerhafter Frame aendert keinen Zustand.
    pub fn on_user_audio(
        &mut self,
        user_id: UserId,
        frame: &AudioFrame,
        jetzt: Instant,
    ) -> AudioResult<Option<ModerationEvent>> {
        let state = self
            .benutzer
            .entry(user_id)
            .or_insert_with(|| LoudnessState::neu(self.config.klassifikator.clone(), jetzt));

        let vorher_markiert = state.klassifikator.ist_markiert();
        let entscheidung = state.klassifikator.update(frame)?;
        state.letzter_frame = jetzt;

        if vorher_markiert || entscheidung != Decision::TooLoud {
            return Ok(None);
        }

        if let Some(letzte) = self.letzte_meldungen.get(&user_id) {
            if jetzt.saturating_duration_since(*letzte) < self.config.cooldown {
                tracing::debug!(
                    guild_id = %self.handle.guild_id,
                    user_id = %user_id,
                    "Verstoss innerhalb des Cooldowns – keine Meldung"
                );
                return Ok(None);
            }
        }
        self.letzte_meldungen.insert(user_id, jetzt);

        Ok(Some(ModerationEvent {
            guild_id: self.handle.guild_id,
            user_id,
            peak_db: state.klassifikator.spitzen_db(),
            zeitpunkt: Utc::now(),
        }))
    }

    /// Entfernt einen Sprecher (z.B. hat den Kanal verlassen)
    pub fn benutzer_entfernen(&mut self, user_id: &UserId) -> bool {
        self.benutzer.remove(user_id).is_some()
    }

    /// Entfernt alle Sprecher ohne Frame seit `stille_timeout` sowie
    /// abgelaufene Cooldowns.
    ///
    /// Gibt die Liste der entfernten User-IDs zurueck.
    pub fn inaktive_entfernen(&mut self, jetzt: Instant) -> Vec<UserId> {
        let timeout = self.config.stille_timeout;
        let inaktive: Vec<UserId> = self
            .benutzer
            .iter()
            .filter(|(_, s)| s.ist_inaktiv(jetzt, timeout))
            .map(|(uid, _)| *uid)
            .collect();

        for uid in &inaktive {
            self.benutzer.remove(uid);
            tracing::debug!(
                guild_id = %self.handle.guild_id,
                user_id = %uid,
                "Inaktiver Sprecher entfernt"
            );
        }

        let cooldown = self.config.cooldown;
        self.letzte_meldungen
            .retain(|_, letzte| jetzt.saturating_duration_since(*letzte) < cooldown);

        inaktive
    }

    /// Zeitpunkt der letzten Meldung eines Sprechers
    pub fn letzte_meldung(&self, user_id: &UserId) -> Option<Instant> {
        self.letzte_meldungen.get(user_id).copied()
    }

    pub fn benutzer(&self, user_id: &UserId) -> Option<&LoudnessState> {
        self.benutzer.get(user_id)
    }

    pub fn benutzer_anzahl(&self) -> usize {
        self.benutzer.len()
    }

    /// Entfernt allen Sprecher-Zustand
    pub fn leeren(&mut self) {
        self.benutzer.clear();
        self.letzte_meldungen.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
