//! Telemetrie des Voice-Controllers
//!
//! Atomare Zaehler die vom Audio-Pfad ohne Lock erhoeht werden.
//! Observability-Systeme lesen periodisch einen `TelemetrieSnapshot`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Momentaufnahme aller Zaehler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetrieSnapshot {
    /// Aktive Voice-Sessions
    pub aktive_sessions: usize,
    /// Klassifizierte Frames
    pub frames_verarbeitet: u64,
    /// Abgelehnte Frames (falsche Laenge)
    pub frames_fehlerhaft: u64,
    /// Verworfene Frames (Queue voll)
    pub frames_verworfen: u64,
    /// Gemeldete Lautstaerke-Verstoesse
    pub moderation_events: u64,
    /// Wegen Inaktivitaet oder Verlassen entfernte Sprecher
    pub benutzer_entfernt: u64,
}

impl TelemetrieSnapshot {
    /// Gibt eine lesbare Zusammenfassung zurueck
    pub fn zusammenfassung(&self) -> String {
        format!(
            "Sessions={} Frames={} Fehlerhaft={} Verworfen={} Meldungen={} Entfernt={}",
            self.aktive_sessions,
            self.frames_verarbeitet,
            self.frames_fehlerhaft,
            self.frames_verworfen,
            self.moderation_events,
            self.benutzer_entfernt,
        )
    }
}

#[derive(Debug, Default)]
pub struct ControllerTelemetrie {
    aktive_sessions: AtomicUsize,
    frames_verarbeitet: AtomicU64,
    frames_fehlerhaft: AtomicU64,
    frames_verworfen: AtomicU64,
    moderation_events: AtomicU64,
    benutzer_entfernt: AtomicU64,
}

impl ControllerTelemetrie {
    pub fn session_gestartet(&self) {
        self.aktive_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_beendet(&self) {
        // Nie unter 0
        let _ = self
            .aktive_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn frame_verarbeitet(&self) {
        self.frames_verarbeitet.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_fehlerhaft(&self) {
        self.frames_fehlerhaft.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_verworfen(&self) {
        self.frames_verworfen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn moderation_event(&self) {
        self.moderation_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn benutzer_entfernt(&self, anzahl: usize) {
        self.benutzer_entfernt
            .fetch_add(anzahl as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrieSnapshot {
        TelemetrieSnapshot {
            aktive_sessions: self.aktive_sessions.load(Ordering::Relaxed),
            frames_verarbeitet: self.frames_verarbeitet.load(Ordering::Relaxed),
            frames_fehlerhaft: self.frames_fehlerhaft.load(Ordering::Relaxed),
            frames_verworfen: self.frames_verworfen.load(Ordering::Relaxed),
            moderation_events: self.moderation_events.load(Ordering::Relaxed),
            benutzer_entfernt: self.benutzer_entfernt.load(Ordering::Relaxed),
        }
    }
}
