//! esportbot-core – Gemeinsame Typen, Fehlertypen und Plattform-Schnittstelle
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Esportbot-Crates gemeinsam genutzt werden:
//! - Snowflake-IDs fuer Server (Guilds), Kanaele und Benutzer
//! - `AudioFrame` (20ms PCM, 16 Bit, Stereo)
//! - Ereignisse (`ModerationEvent`, `PlatformEvent`)
//! - Das `PlatformConnector`-Trait und den lokalen In-Process-Connector

pub mod connector;
pub mod error;
pub mod event;
pub mod frame;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use connector::{AudioSink, EventHandler, LocalConnector, PlatformConnector};
pub use error::ConnectError;
pub use event::{ModerationEvent, PlatformEvent, TextMessage};
pub use frame::AudioFrame;
pub use types::{ChannelId, GuildId, UserId};
