//! Konsolen-Treiber fuer den lokalen Connector
//!
//! Jede Zeile von stdin ist entweder ein Textbefehl des lokalen Benutzers
//! (z.B. `!silence General`) oder ein Steuerbefehl, der Plattform-Ereignisse
//! simuliert:
//!
//! | Eingabe | Wirkung |
//! |---|---|
//! | `/beitreten <kanal-id>` | lokaler Benutzer betritt einen Voice-Kanal |
//! | `/laut <user-id> [frames]` | Sprecher liefert laute Frames (Standard 50) |
//! | `/leise <user-id> [frames]` | Sprecher liefert stille Frames (Standard 50) |
//! | `/verlassen <user-id>` | Sprecher verlaesst den Voice-Kanal |
//! | `/abbruch` | Audio-Verbindung bricht ab |
//!
//! Antworten des Bots erscheinen im Log (`Nachricht gesendet`).

use esportbot_core::{
    AudioFrame, ChannelId, GuildId, LocalConnector, PlatformEvent, TextMessage, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::LokalEinstellungen;

/// Standard-Anzahl simulierter Frames (1 Sekunde)
pub const STANDARD_FRAMES: u32 = 50;
/// Abstand zwischen zwei simulierten Frames
pub const FRAME_TAKT: Duration = Duration::from_millis(20);
/// Amplitude fuer `/laut` (nahe Vollaussteuerung)
pub const LAUT_AMPLITUDE: i16 = 30_000;

/// Eine geparste Konsolenzeile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KonsolenEingabe {
    Beitreten(ChannelId),
    Laut { user_id: UserId, frames: u32 },
    Leise { user_id: UserId, frames: u32 },
    Verlassen(UserId),
    Abbruch,
    /// Alles andere geht als Textnachricht an den Bot
    Text(String),
}

/// Parst eine Konsolenzeile. Leere Zeilen und fehlerhafte Steuerbefehle
/// liefern einen Fehlertext.
pub fn zeile_parsen(zeile: &str) -> Result<KonsolenEingabe, String> {
    let zeile = zeile.trim();
    if zeile.is_empty() {
        return Err("Leere Eingabe".into());
    }
    let Some(steuerung) = zeile.strip_prefix('/') else {
        return Ok(KonsolenEingabe::Text(zeile.to_string()));
    };

    let mut teile = steuerung.split_whitespace();
    let befehl = teile.next().unwrap_or_default();
    let erstes = teile.next();
    let zweites = teile.next();

    let zahl = |wert: Option<&str>, name: &str| -> Result<u64, String> {
        wert.ok_or_else(|| format!("/{befehl}: {name} fehlt"))?
            .parse::<u64>()
            .map_err(|_| format!("/{befehl}: ungueltige Zahl fuer {name}"))
    };
    let frames = |wert: Option<&str>| -> Result<u32, String> {
        match wert {
            None => Ok(STANDARD_FRAMES),
            Some(w) => w
                .parse::<u32>()
                .map_err(|_| format!("/{befehl}: ungueltige Frame-Anzahl")),
        }
    };

    match befehl {
        "beitreten" => Ok(KonsolenEingabe::Beitreten(ChannelId(zahl(erstes, "kanal-id")?))),
        "laut" => Ok(KonsolenEingabe::Laut {
            user_id: UserId(zahl(erstes, "user-id")?),
            frames: frames(zweites)?,
        }),
        "leise" => Ok(KonsolenEingabe::Leise {
            user_id: UserId(zahl(erstes, "user-id")?),
            frames: frames(zweites)?,
        }),
        "verlassen" => Ok(KonsolenEingabe::Verlassen(UserId(zahl(erstes, "user-id")?))),
        "abbruch" => Ok(KonsolenEingabe::Abbruch),
        andere => Err(format!("Unbekannter Steuerbefehl: /{andere}")),
    }
}

/// Legt Kanaele aus der Konfiguration im lokalen Connector an
pub fn connector_vorbereiten(connector: &LocalConnector, lokal: &LokalEinstellungen) {
    for kanal in &lokal.kanaele {
        connector.kanal_anlegen(lokal.guild_id, kanal.id, kanal.name.clone());
    }
    tracing::info!(
        guild_id = %lokal.guild_id,
        kanaele = lokal.kanaele.len(),
        "Lokaler Connector vorbereitet"
    );
}

/// Fuehrt eine geparste Eingabe gegen den lokalen Connector aus
pub fn eingabe_ausfuehren(
    connector: &Arc<LocalConnector>,
    lokal: &LokalEinstellungen,
    eingabe: KonsolenEingabe,
) {
    let guild_id = lokal.guild_id;
    match eingabe {
        KonsolenEingabe::Text(content) => connector.nachricht_einspeisen(TextMessage {
            guild_id,
            channel_id: lokal.text_kanal,
            author_id: lokal.user_id,
            author_is_bot: false,
            content,
        }),
        KonsolenEingabe::Beitreten(kanal) => {
            connector.mitglied_setzen(guild_id, lokal.user_id, Some(kanal));
        }
        KonsolenEingabe::Laut { user_id, frames } => {
            frames_abspielen(connector, guild_id, user_id, AudioFrame::konstant(LAUT_AMPLITUDE), frames);
        }
        KonsolenEingabe::Leise { user_id, frames } => {
            frames_abspielen(connector, guild_id, user_id, AudioFrame::stille(), frames);
        }
        KonsolenEingabe::Verlassen(user_id) => {
            connector.ereignis_einspeisen(PlatformEvent::UserLeft { guild_id, user_id });
        }
        KonsolenEingabe::Abbruch => connector.verbindung_abbrechen(guild_id),
    }
}

/// Liefert Frames im 20ms-Takt in einem eigenen Task
fn frames_abspielen(
    connector: &Arc<LocalConnector>,
    guild_id: GuildId,
    user_id: UserId,
    frame: AudioFrame,
    anzahl: u32,
) {
    let connector = Arc::clone(connector);
    tokio::spawn(async move {
        let mut takt = tokio::time::interval(FRAME_TAKT);
        for _ in 0..anzahl {
            takt.tick().await;
            if !connector.audio_einspeisen(guild_id, user_id, frame.clone()) {
                tracing::warn!(guild_id = %guild_id, "Keine aktive Voice-Verbindung fuer Frames");
                break;
            }
        }
    });
}

/// Liest stdin zeilenweise bis EOF
pub async fn konsole_ausfuehren(
    connector: Arc<LocalConnector>,
    lokal: LokalEinstellungen,
) -> std::io::Result<()> {
    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
    while let Some(zeile) = zeilen.next_line().await? {
        match zeile_parsen(&zeile) {
            Ok(eingabe) => eingabe_ausfuehren(&connector, &lokal, eingabe),
            Err(fehler) => tracing::warn!("{fehler}"),
        }
    }
    tracing::info!("Konsole beendet (EOF)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_wird_durchgereicht() {
        assert_eq!(
            zeile_parsen("!silence General"),
            Ok(KonsolenEingabe::Text("!silence General".into()))
        );
    }

    #[test]
    fn steuerbefehle() {
        assert_eq!(
            zeile_parsen("/beitreten 10"),
            Ok(KonsolenEingabe::Beitreten(ChannelId(10)))
        );
        assert_eq!(
            zeile_parsen("/laut 200"),
            Ok(KonsolenEingabe::Laut {
                user_id: UserId(200),
                frames: STANDARD_FRAMES
            })
        );
        assert_eq!(
            zeile_parsen("/leise 200 5"),
            Ok(KonsolenEingabe::Leise {
                user_id: UserId(200),
                frames: 5
            })
        );
        assert_eq!(
            zeile_parsen("/verlassen 200"),
            Ok(KonsolenEingabe::Verlassen(UserId(200)))
        );
        assert_eq!(zeile_parsen("/abbruch"), Ok(KonsolenEingabe::Abbruch));
    }

    #[test]
    fn fehlerhafte_eingaben() {
        assert!(zeile_parsen("   ").is_err());
        assert!(zeile_parsen("/beitreten").is_err());
        assert!(zeile_parsen("/laut abc").is_err());
        assert!(zeile_parsen("/laut 5 viele").is_err());
        assert!(zeile_parsen("/tanzen").is_err());
    }

    #[tokio::test]
    async fn beitreten_setzt_voice_kanal() {
        use esportbot_core::PlatformConnector;

        let connector = Arc::new(LocalConnector::neu());
        let lokal = LokalEinstellungen::default();
        connector_vorbereiten(&connector, &lokal);

        eingabe_ausfuehren(&connector, &lokal, KonsolenEingabe::Beitreten(ChannelId(11)));
        assert_eq!(
            connector
                .find_voice_channel_of_member(lokal.guild_id, lokal.user_id)
                .await,
            Some(ChannelId(11))
        );
        assert_eq!(
            connector
                .find_voice_channels_by_name(lokal.guild_id, "general", true)
                .await,
            vec![ChannelId(10)]
        );
    }
}
