//! Integration-Tests fuer BotSession (LocalConnector, ohne HTTP-Server)

use esportbot::config::BotConfig;
use esportbot::konsole;
use esportbot::BotSession;
use esportbot_core::{
    AudioFrame, ChannelId, GuildId, LocalConnector, PlatformConnector, PlatformEvent, TextMessage,
    UserId,
};
use std::sync::Arc;
use std::time::Duration;

const G: GuildId = GuildId(1);
const TEXT: ChannelId = ChannelId(99);
const ALICE: UserId = UserId(100);
const BOB: UserId = UserId(200);

fn bot_starten() -> (Arc<LocalConnector>, BotSession) {
    let mut config = BotConfig::default();
    config.observability.aktiviert = false;

    let connector = Arc::new(LocalConnector::neu());
    konsole::connector_vorbereiten(&connector, &config.lokal);

    let dyn_connector: Arc<dyn PlatformConnector> = connector.clone();
    let mut bot = BotSession::neu(config, dyn_connector).unwrap();
    bot.starten().unwrap();
    (connector, bot)
}

fn befehl(content: &str) -> TextMessage {
    TextMessage {
        guild_id: G,
        channel_id: TEXT,
        author_id: ALICE,
        author_is_bot: false,
        content: content.to_string(),
    }
}

async fn warten_bis(mut bedingung: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if bedingung() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    bedingung()
}

#[tokio::test]
async fn befehl_startet_session_und_meldet_lauten_sprecher() {
    let (connector, bot) = bot_starten();
    assert!(bot.health().connector_verbunden());

    connector.nachricht_einspeisen(befehl("!silence General"));
    assert!(warten_bis(|| bot.controller().aktive_session(G).is_some()).await);
    assert!(warten_bis(|| !connector.gesendete_nachrichten().is_empty()).await);
    assert_eq!(
        connector.gesendete_nachrichten()[0],
        (TEXT, "Connecting to General".to_string())
    );
    assert_eq!(
        bot.metriken()
            .commands_total
            .with_label_values(&["silence"])
            .get(),
        1
    );

    for _ in 0..10 {
        connector.audio_einspeisen(G, BOB, AudioFrame::konstant(32767));
    }
    assert!(warten_bis(|| connector.gesendete_nachrichten().len() == 2).await);
    assert!(connector.gesendete_nachrichten()[1]
        .1
        .starts_with("<@200> is too loud"));

    bot.beenden().await;
    assert!(connector.offene_verbindung(G).is_none());
}

#[tokio::test]
async fn verbindungsverlust_entfernt_session() {
    let (connector, bot) = bot_starten();
    connector.nachricht_einspeisen(befehl("!silence 10"));
    assert!(warten_bis(|| bot.controller().aktive_session(G).is_some()).await);

    connector.verbindung_abbrechen(G);
    assert!(warten_bis(|| bot.controller().aktive_session(G).is_none()).await);

    // Neuer Connect nach Verbindungsverlust moeglich
    connector.nachricht_einspeisen(befehl("!silence Lobby"));
    assert!(warten_bis(|| bot
        .controller()
        .aktive_session(G)
        .is_some_and(|s| s.channel_id == ChannelId(11)))
    .await);

    bot.beenden().await;
}

#[tokio::test]
async fn verlassender_sprecher_wird_entfernt() {
    let (connector, bot) = bot_starten();
    connector.nachricht_einspeisen(befehl("!silence General"));
    assert!(warten_bis(|| bot.controller().aktive_session(G).is_some()).await);

    connector.audio_einspeisen(G, BOB, AudioFrame::stille());
    assert!(warten_bis(|| bot.controller().telemetrie().frames_verarbeitet == 1).await);

    connector.ereignis_einspeisen(PlatformEvent::UserLeft {
        guild_id: G,
        user_id: BOB,
    });
    assert!(warten_bis(|| bot.controller().telemetrie().benutzer_entfernt == 1).await);

    bot.beenden().await;
}

#[tokio::test]
async fn beenden_trennt_alle_sessions() {
    let (connector, bot) = bot_starten();
    connector.nachricht_einspeisen(befehl("!silence General"));
    assert!(warten_bis(|| bot.controller().session_anzahl() == 1).await);

    bot.beenden().await;
    assert!(connector.offene_verbindung(G).is_none());
    assert!(!connector.sink_registriert(G));
}
