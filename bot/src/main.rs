//! Esportbot – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Bot
//! mit dem lokalen Connector und dem Konsolen-Treiber.

use anyhow::Result;
use esportbot::{config::BotConfig, konsole, BotSession};
use esportbot_core::{LocalConnector, PlatformConnector};
use esportbot_observability::logging_initialisieren;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("ESPORTBOT_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = BotConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Esportbot wird initialisiert"
    );

    let connector = Arc::new(LocalConnector::neu());
    konsole::connector_vorbereiten(&connector, &config.lokal);

    let lokal = config.lokal.clone();
    let dyn_connector: Arc<dyn PlatformConnector> = connector.clone();
    let mut bot = BotSession::neu(config, dyn_connector)?;
    bot.starten()?;

    tracing::info!("Eingaben: !silence [kanal], !unsilence, /beitreten, /laut, /leise, /verlassen, /abbruch");

    tokio::select! {
        ergebnis = konsole::konsole_ausfuehren(connector, lokal) => {
            if let Err(e) = ergebnis {
                tracing::error!(fehler = %e, "Konsole fehlgeschlagen");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutdown-Signal empfangen");
        }
    }

    bot.beenden().await;
    Ok(())
}
