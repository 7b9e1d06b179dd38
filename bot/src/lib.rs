//! esportbot – Bibliotheks-Root
//!
//! Verdrahtet Connector, Voice-Controller, CommandRouter und Observability
//! zu einer lauffaehigen Bot-Instanz.

pub mod config;
pub mod konsole;

use anyhow::Result;
use config::BotConfig;
use esportbot_commander::{CommandRouter, RateLimiter};
use esportbot_core::{PlatformConnector, PlatformEvent};
use esportbot_observability::{observability_server_starten, BotMetrics, HealthState};
use esportbot_voice::VoiceSessionController;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Intervall fuer die Uebernahme der Controller-Telemetrie in Prometheus
pub const TELEMETRIE_INTERVALL: Duration = Duration::from_secs(5);

/// Haelt den laufenden Bot-Zustand zusammen
pub struct BotSession {
    config: BotConfig,
    connector: Arc<dyn PlatformConnector>,
    controller: VoiceSessionController,
    router: Arc<CommandRouter>,
    limiter: Arc<RateLimiter>,
    metriken: BotMetrics,
    health: HealthState,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl BotSession {
    /// Erstellt eine Bot-Instanz fuer den gegebenen Connector
    pub fn neu(config: BotConfig, connector: Arc<dyn PlatformConnector>) -> Result<Self> {
        let controller = VoiceSessionController::neu(Arc::clone(&connector), config.voice_config());
        let limiter = RateLimiter::neu(config.commander.clone());
        let router = Arc::new(CommandRouter::neu(
            Arc::clone(&connector),
            controller.clone(),
            Arc::clone(&limiter),
            config.bot.user_id,
        ));
        let metriken = BotMetrics::neu()?;
        let health = HealthState::neu(metriken.clone());
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            connector,
            controller,
            router,
            limiter,
            metriken,
            health,
            shutdown_tx,
            tasks: Vec::new(),
        })
    }

    /// Startet alle Bot-Subsysteme
    ///
    /// Reihenfolge:
    /// 1. Ereignis-Handler beim Connector registrieren
    /// 2. Telemetrie-Task starten
    /// 3. Observability-Server starten (falls aktiviert)
    ///
    /// Muss innerhalb einer Tokio-Runtime aufgerufen werden.
    pub fn starten(&mut self) -> Result<()> {
        tracing::info!(
            bot_name = %self.config.bot.name,
            user_id = %self.config.bot.user_id,
            "Bot startet"
        );

        self.ereignis_handler_registrieren();
        self.tasks.push(self.telemetrie_task_starten());

        if self.config.observability.aktiviert {
            let adresse = self.config.observability_bind_adresse()?;
            let metriken = self.metriken.clone();
            let health = self.health.clone();
            self.tasks.push(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(adresse, metriken, health).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }));
        }

        self.health.connector_status_setzen(true);
        tracing::info!("Bot laeuft");
        Ok(())
    }

    /// Trennt alle Voice-Sessions und beendet die Hintergrund-Tasks
    pub async fn beenden(self) {
        tracing::info!("Bot wird beendet");
        let _ = self.shutdown_tx.send(true);
        self.health.connector_status_setzen(false);

        self.controller.alle_trennen().await;
        for task in self.tasks {
            task.abort();
        }
        tracing::info!("Bot beendet");
    }

    pub fn controller(&self) -> &VoiceSessionController {
        &self.controller
    }

    pub fn metriken(&self) -> &BotMetrics {
        &self.metriken
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    /// Leitet Plattform-Ereignisse an Router und Controller weiter.
    ///
    /// Der Handler selbst blockiert nie: Befehle und Verbindungsverluste
    /// laufen als eigene Tasks auf der Runtime des Aufrufers von `starten`.
    fn ereignis_handler_registrieren(&self) {
        let runtime = tokio::runtime::Handle::current();
        let router = Arc::clone(&self.router);
        let controller = self.controller.clone();
        let metriken = self.metriken.clone();

        self.connector
            .register_event_handler(Arc::new(move |event: PlatformEvent| match event {
                PlatformEvent::Message(nachricht) => {
                    let router = Arc::clone(&router);
                    let metriken = metriken.clone();
                    runtime.spawn(async move {
                        if let Some(befehl) = router.nachricht_verarbeiten(&nachricht).await {
                            metriken.befehl_zaehlen(befehl.name());
                        }
                    });
                }
                PlatformEvent::UserLeft { guild_id, user_id } => {
                    controller.user_left(guild_id, user_id);
                }
                PlatformEvent::ConnectionLost {
                    guild_id,
                    channel_id,
                } => {
                    let controller = controller.clone();
                    runtime.spawn(async move { controller.connection_lost(guild_id, channel_id).await });
                }
            }));
    }

    /// Uebernimmt periodisch die Controller-Telemetrie in Prometheus und
    /// raeumt inaktive Rate-Limit-Buckets auf
    fn telemetrie_task_starten(&self) -> JoinHandle<()> {
        let controller = self.controller.clone();
        let metriken = self.metriken.clone();
        let limiter = Arc::clone(&self.limiter);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut intervall = tokio::time::interval(TELEMETRIE_INTERVALL);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = intervall.tick() => {
                        let snapshot = controller.telemetrie();
                        metriken.telemetrie_uebernehmen(&snapshot);
                        limiter.cleanup();
                        tracing::debug!(
                            telemetrie = %snapshot.zusammenfassung(),
                            rate_limit_buckets = limiter.bucket_anzahl(),
                            "Telemetrie uebernommen"
                        );
                    }
                }
            }
        })
    }
}
