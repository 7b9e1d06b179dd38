//! Voice-Session-Controller – Lebenszyklus der Sessions aller Server
//!
//! ## Design-Entscheidungen
//! - Ein Actor-Task pro Server serialisiert alle Frames dieses Servers,
//!   der Sprecher-Zustand braucht dadurch keine eigenen Locks
//! - Begrenzte mpsc-Queue zwischen Connector und Actor: volle Queue = Frame
//!   verworfen (Echtzeit-Semantik, nie unbegrenzt puffern)
//! - Pro Server eine async Sperre: `connect`/`disconnect` schliessen sich aus
//! - Hoechstens ein laufender Verbindungsaufbau pro Server
//!
//! `disconnect` kehrt erst zurueck wenn der Actor beendet ist; danach wird
//! fuer diesen Server kein Frame mehr klassifiziert.

use dashmap::{DashMap, DashSet};
use esportbot_core::{
    AudioFrame, AudioSink, ChannelId, ConnectError, GuildId, ModerationEvent, PlatformConnector,
    UserId,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::VoiceConfig;
use crate::session::{VoiceSession, VoiceSessionHandle};
use crate::telemetry::{ControllerTelemetrie, TelemetrieSnapshot};

/// Kapazitaet des Broadcast-Kanals fuer Moderations-Ereignisse
pub const EREIGNIS_PUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Nachrichten an den Actor
// ---------------------------------------------------------------------------

enum SessionNachricht {
    Audio { user_id: UserId, frame: AudioFrame },
    BenutzerVerlassen(UserId),
}

/// Alles was zum Abbau einer laufenden Session noetig ist
struct SessionEintrag {
    handle: VoiceSessionHandle,
    tx: mpsc::Sender<SessionNachricht>,
    /// false sobald der Abbau begonnen hat – Sink und `on_user_audio` verwerfen dann
    aktiv: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Entfernt die Markierung "Verbindungsaufbau laeuft" beim Verlassen von `connect`
struct VerbindungsaufbauGuard<'a> {
    laufend: &'a DashSet<GuildId>,
    guild_id: GuildId,
}

impl<'a> VerbindungsaufbauGuard<'a> {
    fn belegen(laufend: &'a DashSet<GuildId>, guild_id: GuildId) -> Option<Self> {
        if laufend.insert(guild_id) {
            Some(Self { laufend, guild_id })
        } else {
            None
        }
    }
}

impl Drop for VerbindungsaufbauGuard<'_> {
    fn drop(&mut self) {
        self.laufend.remove(&self.guild_id);
    }
}

// ---------------------------------------------------------------------------
// VoiceSessionController
// ---------------------------------------------------------------------------

/// Verwaltet hoechstens eine Voice-Session pro Server
///
/// Thread-safe und `Clone`-faehig (innerer Arc).
#[derive(Clone)]
pub struct VoiceSessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    connector: Arc<dyn PlatformConnector>,
    config: VoiceConfig,
    sessions: DashMap<GuildId, SessionEintrag>,
    /// Sperre pro Server fuer connect/disconnect
    sperren: DashMap<GuildId, Arc<Mutex<()>>>,
    /// Server mit laufendem Verbindungsaufbau
    verbindungsaufbau: DashSet<GuildId>,
    ereignisse: broadcast::Sender<ModerationEvent>,
    telemetrie: Arc<ControllerTelemetrie>,
}

impl VoiceSessionController {
    pub fn neu(connector: Arc<dyn PlatformConnector>, config: VoiceConfig) -> Self {
        let (ereignisse, _) = broadcast::channel(EREIGNIS_PUFFER);
        Self {
            inner: Arc::new(ControllerInner {
                connector,
                config,
                sessions: DashMap::new(),
                sperren: DashMap::new(),
                verbindungsaufbau: DashSet::new(),
                ereignisse,
                telemetrie: Arc::new(ControllerTelemetrie::default()),
            }),
        }
    }

    /// Verbindet mit einem Voice-Kanal und startet die Lautstaerke-Ueberwachung.
    ///
    /// Eine bestehende Session des Servers wird vorher vollstaendig abgebaut.
    /// Fehler: `AlreadyConnecting` wenn fuer den Server bereits ein
    /// Verbindungsaufbau laeuft, `ChannelNotFound` wenn der Connector den
    /// Kanal nicht kennt.
    pub async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        notify_channel: ChannelId,
    ) -> Result<VoiceSessionHandle, ConnectError> {
        let _aufbau = VerbindungsaufbauGuard::belegen(&self.inner.verbindungsaufbau, guild_id)
            .ok_or(ConnectError::AlreadyConnecting(guild_id))?;

        let sperre = self.sperre(guild_id);
        let _guard = sperre.lock().await;

        self.session_abbauen(guild_id, true).await;

        self.inner
            .connector
            .open_audio_connection(guild_id, channel_id)
            .await
            .map_err(|e| {
                tracing::warn!(
                    guild_id = %guild_id,
                    channel_id = %channel_id,
                    fehler = %e,
                    "Verbindungsaufbau fehlgeschlagen"
                );
                e
            })?;

        let handle = VoiceSessionHandle::neu(guild_id, channel_id, notify_channel);
        let session = VoiceSession::neu(handle.clone(), self.inner.config.clone());

        let (tx, rx) = mpsc::channel(self.inner.config.frame_queue.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let aktiv = Arc::new(AtomicBool::new(true));

        let aktor = SessionAktor {
            connector: Arc::clone(&self.inner.connector),
            ereignisse: self.inner.ereignisse.clone(),
            telemetrie: Arc::clone(&self.inner.telemetrie),
            config: self.inner.config.clone(),
        };
        let task = tokio::spawn(aktor.laufen(session, rx, shutdown_rx));

        let sink = self.sink_erstellen(tx.clone(), Arc::clone(&aktiv));
        self.inner.sessions.insert(
            guild_id,
            SessionEintrag {
                handle: handle.clone(),
                tx,
                aktiv,
                shutdown_tx,
                task,
            },
        );
        self.inner.connector.register_audio_sink(guild_id, sink);
        self.inner.telemetrie.session_gestartet();

        tracing::info!(
            guild_id = %guild_id,
            channel_id = %channel_id,
            notify_channel = %notify_channel,
            session_id = %handle.session_id,
            "Voice-Session gestartet"
        );

        Ok(handle)
    }

    /// Baut die Session eines Servers ab. No-op ohne aktive Session.
    pub async fn disconnect(&self, guild_id: GuildId) {
        let sperre = self.sperre(guild_id);
        let _guard = sperre.lock().await;
        if !self.session_abbauen(guild_id, true).await {
            tracing::debug!(guild_id = %guild_id, "Disconnect ohne aktive Session");
        }
    }

    /// Vom Connector gemeldeter Verbindungsverlust: Session-Zustand verwerfen,
    /// ohne die (bereits verlorene) Verbindung erneut zu schliessen.
    ///
    /// Meldungen fuer einen anderen Kanal als den der aktiven Session
    /// stammen von einer frueheren Verbindung und werden ignoriert.
    pub async fn connection_lost(&self, guild_id: GuildId, channel_id: ChannelId) {
        if self.inner.verbindungsaufbau.contains(&guild_id) {
            // Der laufende Connect ersetzt die alte Session ohnehin
            tracing::debug!(guild_id = %guild_id, "Verbindungsverlust waehrend Connect ignoriert");
            return;
        }
        let sperre = self.sperre(guild_id);
        let _guard = sperre.lock().await;
        let aktueller_kanal = self.inner.sessions.get(&guild_id).map(|e| e.handle.channel_id);
        if aktueller_kanal != Some(channel_id) {
            tracing::debug!(
                guild_id = %guild_id,
                channel_id = %channel_id,
                "Verbindungsverlust fuer fruehere Verbindung ignoriert"
            );
            return;
        }
        if self.session_abbauen(guild_id, false).await {
            tracing::warn!(guild_id = %guild_id, "Voice-Verbindung verloren, Session entfernt");
        }
    }

    /// Stellt einen Frame an die Session des Servers zu.
    ///
    /// Nicht-blockierend: ohne aktive Session oder bei voller Queue wird der
    /// Frame verworfen.
    pub fn on_user_audio(&self, guild_id: GuildId, user_id: UserId, frame: AudioFrame) {
        let Some(eintrag) = self.inner.sessions.get(&guild_id) else {
            tracing::trace!(guild_id = %guild_id, "Frame ohne aktive Session verworfen");
            return;
        };
        frame_zustellen(
            &eintrag.tx,
            &eintrag.aktiv,
            &self.inner.telemetrie,
            user_id,
            frame,
        );
    }

    /// Ein Sprecher hat den Voice-Kanal verlassen – Zustand sofort entfernen
    pub fn user_left(&self, guild_id: GuildId, user_id: UserId) {
        if let Some(eintrag) = self.inner.sessions.get(&guild_id) {
            if eintrag
                .tx
                .try_send(SessionNachricht::BenutzerVerlassen(user_id))
                .is_err()
            {
                // Die Inaktivitaets-Pruefung raeumt spaeter auf
                tracing::debug!(guild_id = %guild_id, user_id = %user_id, "Queue voll, Verlassen nicht zugestellt");
            }
        }
    }

    /// Baut alle Sessions ab (Shutdown)
    pub async fn alle_trennen(&self) {
        let guilds: Vec<GuildId> = self.inner.sessions.iter().map(|e| *e.key()).collect();
        for guild_id in guilds {
            self.disconnect(guild_id).await;
        }
    }

    /// Beschreibung der aktiven Session eines Servers
    pub fn aktive_session(&self, guild_id: GuildId) -> Option<VoiceSessionHandle> {
        self.inner.sessions.get(&guild_id).map(|e| e.handle.clone())
    }

    /// Anzahl aktiver Sessions
    pub fn session_anzahl(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Abonniert alle zukuenftigen Moderations-Ereignisse
    pub fn ereignisse_abonnieren(&self) -> broadcast::Receiver<ModerationEvent> {
        self.inner.ereignisse.subscribe()
    }

    pub fn telemetrie(&self) -> TelemetrieSnapshot {
        self.inner.telemetrie.snapshot()
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    fn sperre(&self, guild_id: GuildId) -> Arc<Mutex<()>> {
        Arc::clone(&self.inner.sperren.entry(guild_id).or_default())
    }

    fn sink_erstellen(
        &self,
        tx: mpsc::Sender<SessionNachricht>,
        aktiv: Arc<AtomicBool>,
    ) -> AudioSink {
        let telemetrie = Arc::clone(&self.inner.telemetrie);
        Arc::new(move |user_id, frame| {
            frame_zustellen(&tx, &aktiv, &telemetrie, user_id, frame);
        })
    }

    /// Baut die Session ab, falls vorhanden. Muss unter der Server-Sperre laufen.
    ///
    /// Reihenfolge: Zustellung stoppen, Sink abmelden, Actor beenden und auf
    /// ihn warten, zuletzt die Verbindung schliessen.
    async fn session_abbauen(&self, guild_id: GuildId, verbindung_schliessen: bool) -> bool {
        let Some((_, eintrag)) = self.inner.sessions.remove(&guild_id) else {
            return false;
        };

        eintrag.aktiv.store(false, Ordering::Release);
        self.inner.connector.unregister_audio_sink(guild_id);
        let _ = eintrag.shutdown_tx.send(true);
        if let Err(e) = eintrag.task.await {
            tracing::error!(guild_id = %guild_id, fehler = %e, "Session-Task abgebrochen");
        }

        if verbindung_schliessen {
            self.inner.connector.close_audio_connection(guild_id).await;
        }
        self.inner.telemetrie.session_beendet();

        tracing::info!(
            guild_id = %guild_id,
            session_id = %eintrag.handle.session_id,
            "Voice-Session beendet"
        );
        true
    }
}

/// Gemeinsamer Zustellpfad fuer Sink und `on_user_audio`
fn frame_zustellen(
    tx: &mpsc::Sender<SessionNachricht>,
    aktiv: &AtomicBool,
    telemetrie: &ControllerTelemetrie,
    user_id: UserId,
    frame: AudioFrame,
) {
    if !aktiv.load(Ordering::Acquire) {
        return;
    }
    match tx.try_send(SessionNachricht::Audio { user_id, frame }) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            telemetrie.frame_verworfen();
            tracing::trace!(user_id = %user_id, "Frame-Queue voll – Frame verworfen");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::trace!(user_id = %user_id, "Session beendet – Frame verworfen");
        }
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Actor-Task einer Session: einziger Besitzer des Sprecher-Zustands
struct SessionAktor {
    connector: Arc<dyn PlatformConnector>,
    ereignisse: broadcast::Sender<ModerationEvent>,
    telemetrie: Arc<ControllerTelemetrie>,
    config: VoiceConfig,
}

impl SessionAktor {
    async fn laufen(
        self,
        mut session: VoiceSession,
        mut rx: mpsc::Receiver<SessionNachricht>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut sweep = tokio::time::interval(self.config.sweep_intervall);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                nachricht = rx.recv() => match nachricht {
                    Some(SessionNachricht::Audio { user_id, frame }) => {
                        self.frame_verarbeiten(&mut session, user_id, &frame);
                    }
                    Some(SessionNachricht::BenutzerVerlassen(user_id)) => {
                        if session.benutzer_entfernen(&user_id) {
                            self.telemetrie.benutzer_entfernt(1);
                            tracing::debug!(user_id = %user_id, "Sprecher hat den Kanal verlassen");
                        }
                    }
                    None => break,
                },
                _ = sweep.tick() => {
                    let entfernt = session.inaktive_entfernen(Instant::now());
                    if !entfernt.is_empty() {
                        self.telemetrie.benutzer_entfernt(entfernt.len());
                    }
                }
            }
        }

        session.leeren();
        tracing::debug!(guild_id = %session.handle().guild_id, "Session-Actor beendet");
    }

    fn frame_verarbeiten(&self, session: &mut VoiceSession, user_id: UserId, frame: &AudioFrame) {
        let start = Instant::now();

        match session.on_user_audio(user_id, frame, start) {
            Ok(Some(event)) => {
                self.telemetrie.moderation_event();
                tracing::info!(
                    guild_id = %event.guild_id,
                    user_id = %event.user_id,
                    peak_db = event.peak_db,
                    "Sprecher zu laut"
                );
                self.connector
                    .send_text_message(session.notify_channel(), event.nachricht());
                // Keine Abonnenten ist kein Fehler
                let _ = self.ereignisse.send(event);
            }
            Ok(None) => {}
            Err(e) => {
                self.telemetrie.frame_fehlerhaft();
                tracing::warn!(
                    guild_id = %session.handle().guild_id,
                    user_id = %user_id,
                    fehler = %e,
                    "Fehlerhafter Frame verworfen"
                );
            }
        }
        self.telemetrie.frame_verarbeitet();

        let dauer = start.elapsed();
        if dauer > self.config.frame_budget {
            tracing::warn!(
                user_id = %user_id,
                dauer_us = dauer.as_micros() as u64,
                "Frame-Verarbeitung ueber Zeitbudget"
            );
        }
    }
}
