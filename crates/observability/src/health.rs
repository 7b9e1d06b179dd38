//! Health-Check-Endpunkt fuer den Esportbot
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime, Connector-Status und aktiven Sessions

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::BotMetrics;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub connector_connected: bool,
    pub active_sessions: i64,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    pub connector_connected: Arc<AtomicBool>,
    metriken: BotMetrics,
}

impl HealthState {
    pub fn neu(metriken: BotMetrics) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            connector_connected: Arc::new(AtomicBool::new(false)),
            metriken,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn connector_verbunden(&self) -> bool {
        self.connector_connected.load(Ordering::Relaxed)
    }

    pub fn connector_status_setzen(&self, verbunden: bool) {
        self.connector_connected.store(verbunden, Ordering::Relaxed);
    }

    /// Aktuelle Antwort des Health-Checks
    pub fn antwort(&self) -> HealthResponse {
        let connector_connected = self.connector_verbunden();
        HealthResponse {
            status: if connector_connected {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            connector_connected,
            active_sessions: self.metriken.voice_sessions_active.get(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – 200 auch bei degraded (Probe soll nicht failen)
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.antwort()))
}
