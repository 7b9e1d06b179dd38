//! esportbot-voice – Voice-Sessions und Lautstaerke-Moderation
//!
//! Verwaltet hoechstens eine Voice-Session pro Server und leitet die
//! Audio-Frames jedes Sprechers an einen eigenen Klassifikator weiter.
//!
//! ## Module
//! - [`config`] – Zeitfenster, Queue-Groesse, Klassifikator-Einstellungen
//! - [`session`] – Zustand einer Session (rein, ohne I/O)
//! - [`controller`] – Lebenszyklus, Sperren, Actor-Task pro Server
//! - [`telemetry`] – Zaehler fuer Observability

pub mod config;
pub mod controller;
pub mod session;
pub mod telemetry;

pub use config::VoiceConfig;
pub use controller::VoiceSessionController;
pub use session::{LoudnessState, VoiceSession, VoiceSessionHandle};
pub use telemetry::{ControllerTelemetrie, TelemetrieSnapshot};
