//! Prometheus-kompatible Metriken fuer den Esportbot
//!
//! Registrierte Metriken:
//! - `esportbot_voice_sessions_active` – Gauge: Aktive Voice-Sessions
//! - `esportbot_audio_frames_total` – Counter: Klassifizierte Frames
//! - `esportbot_audio_frames_malformed_total` – Counter: Abgelehnte Frames
//! - `esportbot_audio_frames_dropped_total` – Counter: Wegen voller Queue verworfene Frames
//! - `esportbot_moderation_events_total` – Counter: Gemeldete Verstoesse
//! - `esportbot_users_evicted_total` – Counter: Entfernte Sprecher
//! - `esportbot_commands_total` – Counter: Textbefehle (befehl)
//! - `esportbot_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `esportbot_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit
//! - `process_*` – Prozess-Metriken (nur Linux)

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use esportbot_voice::TelemetrieSnapshot;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Esportbot-Prometheus-Metriken
#[derive(Clone)]
pub struct BotMetrics {
    pub registry: Arc<Registry>,

    // Voice-Metriken
    pub voice_sessions_active: IntGauge,
    pub audio_frames_total: IntCounter,
    pub audio_frames_malformed_total: IntCounter,
    pub audio_frames_dropped_total: IntCounter,
    pub moderation_events_total: IntCounter,
    pub users_evicted_total: IntCounter,

    // Befehle
    pub commands_total: IntCounterVec,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl BotMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // Prozess-Metriken (CPU, Speicher, offene Dateien) aus /proc
        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        // --- Voice-Metriken ---
        let voice_sessions_active = IntGauge::with_opts(Opts::new(
            "esportbot_voice_sessions_active",
            "Anzahl aktiver Voice-Sessions",
        ))?;
        registry.register(Box::new(voice_sessions_active.clone()))?;

        let audio_frames_total = zaehler(
            &registry,
            "esportbot_audio_frames_total",
            "Gesamtanzahl klassifizierter Audio-Frames",
        )?;
        let audio_frames_malformed_total = zaehler(
            &registry,
            "esportbot_audio_frames_malformed_total",
            "Abgelehnte Audio-Frames (falsche Laenge)",
        )?;
        let audio_frames_dropped_total = zaehler(
            &registry,
            "esportbot_audio_frames_dropped_total",
            "Verworfene Audio-Frames (Queue voll)",
        )?;
        let moderation_events_total = zaehler(
            &registry,
            "esportbot_moderation_events_total",
            "Gemeldete Lautstaerke-Verstoesse",
        )?;
        let users_evicted_total = zaehler(
            &registry,
            "esportbot_users_evicted_total",
            "Wegen Inaktivitaet oder Verlassen entfernte Sprecher",
        )?;

        // --- Befehle ---
        let commands_total = IntCounterVec::new(
            Opts::new("esportbot_commands_total", "Ausgefuehrte Textbefehle"),
            &["befehl"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("esportbot_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "esportbot_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            voice_sessions_active,
            audio_frames_total,
            audio_frames_malformed_total,
            audio_frames_dropped_total,
            moderation_events_total,
            users_evicted_total,
            commands_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Uebernimmt einen Snapshot der Controller-Telemetrie.
    ///
    /// Die Snapshot-Zaehler sind kumulativ, die Counter werden nur um die
    /// Differenz erhoeht.
    pub fn telemetrie_uebernehmen(&self, snapshot: &TelemetrieSnapshot) {
        self.voice_sessions_active
            .set(snapshot.aktive_sessions as i64);
        angleichen(&self.audio_frames_total, snapshot.frames_verarbeitet);
        angleichen(&self.audio_frames_malformed_total, snapshot.frames_fehlerhaft);
        angleichen(&self.audio_frames_dropped_total, snapshot.frames_verworfen);
        angleichen(&self.moderation_events_total, snapshot.moderation_events);
        angleichen(&self.users_evicted_total, snapshot.benutzer_entfernt);
    }

    /// Zaehlt einen ausgefuehrten Textbefehl
    pub fn befehl_zaehlen(&self, befehl: &str) {
        self.commands_total.with_label_values(&[befehl]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn zaehler(registry: &Registry, name: &str, hilfe: &str) -> Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn angleichen(counter: &IntCounter, gesamt: u64) {
    let aktuell = counter.get();
    if gesamt > aktuell {
        counter.inc_by(gesamt - aktuell);
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: BotMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<BotMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = BotMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn snapshot_wird_als_differenz_uebernommen() {
        let metriken = BotMetrics::neu().unwrap();
        let mut snapshot = TelemetrieSnapshot {
            aktive_sessions: 2,
            frames_verarbeitet: 100,
            moderation_events: 1,
            ..Default::default()
        };
        metriken.telemetrie_uebernehmen(&snapshot);
        assert_eq!(metriken.voice_sessions_active.get(), 2);
        assert_eq!(metriken.audio_frames_total.get(), 100);

        snapshot.aktive_sessions = 1;
        snapshot.frames_verarbeitet = 150;
        metriken.telemetrie_uebernehmen(&snapshot);
        metriken.telemetrie_uebernehmen(&snapshot);
        assert_eq!(metriken.voice_sessions_active.get(), 1);
        assert_eq!(metriken.audio_frames_total.get(), 150);
        assert_eq!(metriken.moderation_events_total.get(), 1);
    }

    #[test]
    fn befehle_mit_labels() {
        let metriken = BotMetrics::neu().unwrap();
        metriken.befehl_zaehlen("silence");
        metriken.befehl_zaehlen("silence");
        metriken.befehl_zaehlen("unsilence");
        assert_eq!(
            metriken.commands_total.with_label_values(&["silence"]).get(),
            2
        );
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = BotMetrics::neu().unwrap();
        metriken.voice_sessions_active.set(1);
        metriken.audio_frames_total.inc();

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("esportbot_voice_sessions_active 1"));
        assert!(output.contains("esportbot_audio_frames_total 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn alle_metriken_in_registry_registriert() {
        let metriken = BotMetrics::neu().unwrap();

        // Vec-Metriken erscheinen in gather() erst nach dem ersten Label-Zugriff
        metriken.befehl_zaehlen("silence");
        metriken
            .http_requests_total
            .with_label_values(&["GET", "/health", "200"])
            .inc();
        metriken
            .http_request_duration_seconds
            .with_label_values(&["GET", "/health"])
            .observe(0.01);

        let families = metriken.registry.gather();
        let namen: Vec<&str> = families.iter().map(|f| f.get_name()).collect();

        for name in [
            "esportbot_voice_sessions_active",
            "esportbot_audio_frames_total",
            "esportbot_audio_frames_malformed_total",
            "esportbot_audio_frames_dropped_total",
            "esportbot_moderation_events_total",
            "esportbot_users_evicted_total",
            "esportbot_commands_total",
            "esportbot_http_requests_total",
            "esportbot_http_request_duration_seconds",
        ] {
            assert!(namen.contains(&name), "{name} fehlt");
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn prozess_metriken_werden_exportiert() {
        let metriken = BotMetrics::neu().unwrap();
        let output = metriken.exportieren().unwrap();
        assert!(output.contains("process_start_time_seconds"));
        assert!(output.contains("process_resident_memory_bytes"));
    }
}
