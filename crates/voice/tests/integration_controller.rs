//! Integration-Tests fuer VoiceSessionController (LocalConnector)

use esportbot_core::{
    AudioFrame, ChannelId, ConnectError, GuildId, LocalConnector, PlatformConnector, UserId,
};
use esportbot_voice::{VoiceConfig, VoiceSessionController};
use std::sync::Arc;
use std::time::Duration;

const G: GuildId = GuildId(1);
const GENERAL: ChannelId = ChannelId(10);
const LOBBY: ChannelId = ChannelId(11);
const TEXT: ChannelId = ChannelId(99);
const ALICE: UserId = UserId(100);

fn aufbauen(config: VoiceConfig) -> (Arc<LocalConnector>, VoiceSessionController) {
    let connector = Arc::new(LocalConnector::neu());
    connector.kanal_anlegen(G, GENERAL, "General");
    connector.kanal_anlegen(G, LOBBY, "Lobby");
    let dyn_connector: Arc<dyn PlatformConnector> = connector.clone();
    let controller = VoiceSessionController::neu(dyn_connector, config);
    (connector, controller)
}

/// Wartet bis die Bedingung erfuellt ist (hoechstens 2s)
async fn warten_bis(mut bedingung: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if bedingung() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    bedingung()
}

fn laut_einspeisen(connector: &LocalConnector, user: UserId, anzahl: usize) {
    for _ in 0..anzahl {
        connector.audio_einspeisen(G, user, AudioFrame::konstant(32767));
    }
}

#[tokio::test]
async fn connect_registriert_sink_und_oeffnet_verbindung() {
    let (connector, controller) = aufbauen(VoiceConfig::default());

    let handle = controller.connect(G, GENERAL, TEXT).await.unwrap();
    assert_eq!(handle.guild_id, G);
    assert_eq!(handle.channel_id, GENERAL);
    assert_eq!(handle.notify_channel, TEXT);

    assert!(connector.sink_registriert(G));
    assert_eq!(connector.offene_verbindung(G), Some(GENERAL));
    assert_eq!(controller.session_anzahl(), 1);
    assert_eq!(controller.aktive_session(G), Some(handle));
    assert_eq!(controller.telemetrie().aktive_sessions, 1);
}

#[tokio::test]
async fn lauter_sprecher_wird_einmal_gemeldet() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    controller.connect(G, GENERAL, TEXT).await.unwrap();

    laut_einspeisen(&connector, ALICE, 20);
    assert!(warten_bis(|| connector.gesendete_nachrichten().len() == 1).await);

    // Weitere laute Frames innerhalb derselben Phase erzeugen keine Meldung
    laut_einspeisen(&connector, ALICE, 20);
    assert!(warten_bis(|| controller.telemetrie().frames_verarbeitet == 40).await);

    let gesendet = connector.gesendete_nachrichten();
    assert_eq!(gesendet.len(), 1);
    assert_eq!(gesendet[0].0, TEXT);
    assert!(gesendet[0].1.starts_with("<@100> is too loud ("));
    assert!(gesendet[0].1.ends_with("dBFS), please lower your volume!"));
    assert_eq!(controller.telemetrie().moderation_events, 1);
}

#[tokio::test]
async fn ereignisse_werden_verteilt() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    let mut empfaenger = controller.ereignisse_abonnieren();
    controller.connect(G, GENERAL, TEXT).await.unwrap();

    laut_einspeisen(&connector, ALICE, 10);
    let event = tokio::time::timeout(Duration::from_secs(2), empfaenger.recv())
        .await
        .expect("kein Ereignis empfangen")
        .unwrap();
    assert_eq!(event.guild_id, G);
    assert_eq!(event.user_id, ALICE);
    assert!(event.peak_db > -1.0);
}

#[tokio::test]
async fn disconnect_ohne_session_ist_noop() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    controller.disconnect(G).await;
    controller.disconnect(G).await;
    assert_eq!(controller.session_anzahl(), 0);
    assert!(connector.offene_verbindung(G).is_none());
}

#[tokio::test]
async fn nach_disconnect_keine_klassifikation() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    controller.connect(G, GENERAL, TEXT).await.unwrap();
    controller.disconnect(G).await;

    assert!(!connector.sink_registriert(G));
    assert!(connector.offene_verbindung(G).is_none());
    assert_eq!(controller.telemetrie().aktive_sessions, 0);

    controller.on_user_audio(G, ALICE, AudioFrame::konstant(32767));
    assert!(!connector.audio_einspeisen(G, ALICE, AudioFrame::konstant(32767)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(controller.telemetrie().frames_verarbeitet, 0);
    assert!(connector.gesendete_nachrichten().is_empty());
}

#[tokio::test]
async fn neuer_connect_ersetzt_session() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    let erste = controller.connect(G, GENERAL, TEXT).await.unwrap();
    let zweite = controller.connect(G, LOBBY, ChannelId(98)).await.unwrap();

    assert_ne!(erste.session_id, zweite.session_id);
    assert_eq!(controller.session_anzahl(), 1);
    assert_eq!(controller.telemetrie().aktive_sessions, 1);
    assert_eq!(connector.offene_verbindung(G), Some(LOBBY));

    laut_einspeisen(&connector, ALICE, 10);
    assert!(warten_bis(|| !connector.gesendete_nachrichten().is_empty()).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Genau ein Sink aktiv: nur eine Meldung, im neuen Kanal
    let gesendet = connector.gesendete_nachrichten();
    assert_eq!(gesendet.len(), 1);
    assert_eq!(gesendet[0].0, ChannelId(98));
}

#[tokio::test]
async fn gleichzeitiger_connect_wird_abgelehnt() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    connector.oeffnen_verzoegern(Duration::from_millis(200));

    let c = controller.clone();
    let erster = tokio::spawn(async move { c.connect(G, GENERAL, TEXT).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let zweiter = controller.connect(G, LOBBY, TEXT).await;
    assert_eq!(zweiter, Err(ConnectError::AlreadyConnecting(G)));

    let handle = erster.await.unwrap().unwrap();
    assert_eq!(handle.channel_id, GENERAL);
    assert_eq!(connector.offene_verbindung(G), Some(GENERAL));
}

#[tokio::test]
async fn unbekannter_kanal_ergibt_fehler() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    let ergebnis = controller.connect(G, ChannelId(404), TEXT).await;

    assert_eq!(ergebnis, Err(ConnectError::ChannelNotFound(ChannelId(404))));
    assert_eq!(controller.session_anzahl(), 0);
    assert!(!connector.sink_registriert(G));
}

#[tokio::test]
async fn fehlgeschlagener_connect_baut_alte_session_ab() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    controller.connect(G, GENERAL, TEXT).await.unwrap();

    let ergebnis = controller.connect(G, ChannelId(404), TEXT).await;
    assert!(ergebnis.is_err());
    assert_eq!(controller.session_anzahl(), 0);
    assert!(connector.offene_verbindung(G).is_none());
    assert!(!connector.sink_registriert(G));
}

#[tokio::test]
async fn verbindungsverlust_und_neuer_connect() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    controller.connect(G, GENERAL, TEXT).await.unwrap();

    connector.verbindung_abbrechen(G);
    controller.connection_lost(G, GENERAL).await;
    assert_eq!(controller.session_anzahl(), 0);
    assert_eq!(controller.telemetrie().aktive_sessions, 0);

    let handle = controller.connect(G, GENERAL, TEXT).await.unwrap();
    assert_eq!(controller.aktive_session(G), Some(handle));
    assert!(connector.sink_registriert(G));
}

#[tokio::test]
async fn veralteter_verbindungsverlust_laesst_neue_session_bestehen() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    controller.connect(G, GENERAL, TEXT).await.unwrap();
    let neu = controller.connect(G, LOBBY, TEXT).await.unwrap();

    // Verlust der alten Verbindung trifft erst nach dem Reconnect ein
    controller.connection_lost(G, GENERAL).await;
    assert_eq!(controller.aktive_session(G), Some(neu));
    assert!(connector.sink_registriert(G));
    assert_eq!(connector.offene_verbindung(G), Some(LOBBY));

    laut_einspeisen(&connector, ALICE, 10);
    assert!(warten_bis(|| connector.gesendete_nachrichten().len() == 1).await);

    // Verlust der aktuellen Verbindung entfernt die Session
    controller.connection_lost(G, LOBBY).await;
    assert_eq!(controller.session_anzahl(), 0);
}

#[tokio::test]
async fn cooldown_gilt_ueber_entfernen_inaktiver_sprecher_hinaus() {
    let config = VoiceConfig {
        stille_timeout: Duration::from_millis(100),
        sweep_intervall: Duration::from_millis(20),
        cooldown: Duration::from_secs(10),
        ..VoiceConfig::default()
    };
    let (connector, controller) = aufbauen(config);
    controller.connect(G, GENERAL, TEXT).await.unwrap();

    laut_einspeisen(&connector, ALICE, 10);
    assert!(warten_bis(|| connector.gesendete_nachrichten().len() == 1).await);

    // Pause ohne Frames: der Sweep entfernt den Sprecher
    assert!(warten_bis(|| controller.telemetrie().benutzer_entfernt == 1).await);

    // Erneut laut innerhalb des Cooldowns: keine zweite Meldung
    laut_einspeisen(&connector, ALICE, 10);
    assert!(warten_bis(|| controller.telemetrie().frames_verarbeitet == 20).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connector.gesendete_nachrichten().len(), 1);
    assert_eq!(controller.telemetrie().moderation_events, 1);
}

#[tokio::test]
async fn inaktive_sprecher_werden_entfernt() {
    let config = VoiceConfig {
        stille_timeout: Duration::from_millis(100),
        sweep_intervall: Duration::from_millis(20),
        ..VoiceConfig::default()
    };
    let (connector, controller) = aufbauen(config);
    controller.connect(G, GENERAL, TEXT).await.unwrap();

    connector.audio_einspeisen(G, ALICE, AudioFrame::stille());
    assert!(warten_bis(|| controller.telemetrie().benutzer_entfernt == 1).await);
}

#[tokio::test]
async fn verlassender_sprecher_wird_sofort_entfernt() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    controller.connect(G, GENERAL, TEXT).await.unwrap();

    connector.audio_einspeisen(G, ALICE, AudioFrame::stille());
    assert!(warten_bis(|| controller.telemetrie().frames_verarbeitet == 1).await);
    controller.user_left(G, ALICE);
    assert!(warten_bis(|| controller.telemetrie().benutzer_entfernt == 1).await);
}

#[tokio::test]
async fn fehlerhafter_frame_beendet_session_nicht() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    controller.connect(G, GENERAL, TEXT).await.unwrap();

    connector.audio_einspeisen(G, ALICE, AudioFrame::neu(vec![0u8; 5]));
    laut_einspeisen(&connector, ALICE, 10);

    assert!(warten_bis(|| connector.gesendete_nachrichten().len() == 1).await);
    assert_eq!(controller.telemetrie().frames_fehlerhaft, 1);
    assert_eq!(controller.session_anzahl(), 1);
}

#[tokio::test]
async fn volle_queue_verwirft_frames() {
    let config = VoiceConfig {
        frame_queue: 2,
        ..VoiceConfig::default()
    };
    let (connector, controller) = aufbauen(config);
    controller.connect(G, GENERAL, TEXT).await.unwrap();

    // Ohne await dazwischen kommt der Actor nicht zum Zug
    for _ in 0..10 {
        connector.audio_einspeisen(G, ALICE, AudioFrame::stille());
    }
    assert_eq!(controller.telemetrie().frames_verworfen, 8);
    assert!(warten_bis(|| controller.telemetrie().frames_verarbeitet == 2).await);
}

#[tokio::test]
async fn alle_trennen_beendet_jede_session() {
    let (connector, controller) = aufbauen(VoiceConfig::default());
    connector.kanal_anlegen(GuildId(2), ChannelId(20), "Arena");
    controller.connect(G, GENERAL, TEXT).await.unwrap();
    controller.connect(GuildId(2), ChannelId(20), TEXT).await.unwrap();
    assert_eq!(controller.session_anzahl(), 2);

    controller.alle_trennen().await;
    assert_eq!(controller.session_anzahl(), 0);
    assert!(connector.offene_verbindung(G).is_none());
    assert!(connector.offene_verbindung(GuildId(2)).is_none());
}
