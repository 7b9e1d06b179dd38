//! Plattform-Schnittstelle
//!
//! Das `PlatformConnector`-Trait abstrahiert die Chat-Plattform (Gateway,
//! Kanal-Cache, Voice-Verbindung). Bot-Komponenten registrieren Callbacks
//! beim Connector statt von einer Listener-Basisklasse abzuleiten.
//!
//! [`LocalConnector`] ist eine vollstaendige In-Process-Implementierung fuer
//! den lokalen Betrieb (Konsole) und fuer Tests.

mod local;

pub use local::LocalConnector;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ConnectError;
use crate::event::PlatformEvent;
use crate::frame::AudioFrame;
use crate::types::{ChannelId, GuildId, UserId};

/// Empfaenger fuer dekodierte Audio-Frames eines Servers (pro Sprecher)
///
/// Wird von Zustell-Threads des Connectors aufgerufen und darf nicht blockieren.
pub type AudioSink = Arc<dyn Fn(UserId, AudioFrame) + Send + Sync>;

/// Empfaenger fuer Plattform-Ereignisse (Nachrichten, Verbindungsverlust, ...)
pub type EventHandler = Arc<dyn Fn(PlatformEvent) + Send + Sync>;

/// Vertrag zwischen Bot und Chat-Plattform
#[async_trait]
pub trait PlatformConnector: Send + Sync + 'static {
    /// Voice-Kanal in dem sich ein Mitglied gerade befindet
    async fn find_voice_channel_of_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Option<ChannelId>;

    /// Voice-Kanal anhand seiner ID (None wenn nicht vorhanden oder kein Voice-Kanal)
    async fn find_voice_channel_by_id(&self, guild_id: GuildId, id: ChannelId)
        -> Option<ChannelId>;

    /// Alle Voice-Kanaele mit exakt diesem Namen, in Plattform-Reihenfolge
    async fn find_voice_channels_by_name(
        &self,
        guild_id: GuildId,
        name: &str,
        ignore_case: bool,
    ) -> Vec<ChannelId>;

    /// Anzeigename eines Kanals
    async fn channel_name(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<String>;

    /// Baut die Audio-Verbindung zu einem Voice-Kanal auf
    async fn open_audio_connection(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<(), ConnectError>;

    /// Baut die Audio-Verbindung eines Servers ab (no-op ohne Verbindung)
    async fn close_audio_connection(&self, guild_id: GuildId);

    /// Registriert den Audio-Empfaenger eines Servers (ersetzt einen vorhandenen)
    fn register_audio_sink(&self, guild_id: GuildId, sink: AudioSink);

    /// Entfernt den Audio-Empfaenger eines Servers
    fn unregister_audio_sink(&self, guild_id: GuildId);

    /// Registriert einen Handler fuer Plattform-Ereignisse
    fn register_event_handler(&self, handler: EventHandler);

    /// Sendet eine Textnachricht (fire-and-forget, der Connector stellt zu)
    fn send_text_message(&self, channel_id: ChannelId, text: String);
}
