//! Structured Logging Setup via tracing-subscriber
//!
//! Level und Format kommen aus dem `[logging]`-Abschnitt der Konfiguration.
//! Umgebungsvariablen haben Vorrang:
//! - `EB_LOG_LEVEL`: Filter-Direktive (`debug`, `esportbot_voice=trace,info`, ...)
//! - `EB_LOG_FORMAT`: `text` oder `json`

use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "EB_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "EB_LOG_FORMAT";

/// Filter fuer ungueltige Direktiven
const FILTER_RUECKFALL: &str = "info";

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// Eine JSON-Zeile pro Ereignis, mit Thread-ID und aktuellem Span
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            andere => Err(format!("Unbekanntes Log-Format '{andere}' (text|json)")),
        }
    }
}

/// Prueft eine Filter-Direktive, wie sie `EnvFilter` akzeptiert
pub fn log_filter_pruefen(direktive: &str) -> Result<(), String> {
    EnvFilter::try_new(direktive)
        .map(|_| ())
        .map_err(|e| format!("Ungueltiger Log-Filter '{direktive}': {e}"))
}

/// Wirksame Logging-Einstellungen nach Anwendung der Umgebungsvariablen
#[derive(Debug, Clone, PartialEq, Eq)]
struct WirksameEinstellungen {
    filter: String,
    format: LogFormat,
    /// Eingaben die verworfen wurden (werden nach dem Init gewarnt)
    verworfen: Vec<String>,
}

fn einstellungen_aufloesen(
    level: &str,
    format: &str,
    umgebung: impl Fn(&str) -> Option<String>,
) -> WirksameEinstellungen {
    let mut verworfen = Vec::new();

    let filter_kandidat = umgebung(ENV_LOG_LEVEL).unwrap_or_else(|| level.to_string());
    let filter = match log_filter_pruefen(&filter_kandidat) {
        Ok(()) => filter_kandidat,
        Err(fehler) => {
            verworfen.push(fehler);
            FILTER_RUECKFALL.to_string()
        }
    };

    let format_kandidat = umgebung(ENV_LOG_FORMAT).unwrap_or_else(|| format.to_string());
    let format = format_kandidat.parse().unwrap_or_else(|fehler| {
        verworfen.push(fehler);
        LogFormat::Text
    });

    WirksameEinstellungen {
        filter,
        format,
        verworfen,
    }
}

/// Initialisiert das Logging-System.
///
/// Ungueltige Werte fallen auf `info` bzw. `text` zurueck und werden nach
/// der Initialisierung als Warnung gemeldet.
pub fn logging_initialisieren(level: &str, format: &str) {
    let einstellungen = einstellungen_aufloesen(level, format, |name| std::env::var(name).ok());
    let filter = EnvFilter::new(&einstellungen.filter);

    match einstellungen.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .init();
        }
        LogFormat::Text => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }

    for fehler in &einstellungen.verworfen {
        tracing::warn!("{fehler}");
    }
}
