//! Befehlsparser fuer Textnachrichten
//!
//! Erkennt Befehle im Format:
//!   !silence
//!   !silence <kanal-id oder kanalname>
//!   !unsilence
//!
//! Der Befehlsname ist case-insensitiv, das Argument ist der unveraenderte
//! Rest der Zeile (Kanalnamen duerfen Leerzeichen enthalten). Umschliessende
//! Anfuehrungszeichen werden entfernt.

use esportbot_core::ChannelId;

/// Praefix aller Befehle
pub const PRAEFIX: char = '!';

/// Ein erkannter Befehl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Befehl {
    /// Voice-Kanal betreten und ueberwachen (None = Kanal des Aufrufers)
    Silence(Option<String>),
    /// Voice-Kanal verlassen
    Unsilence,
}

impl Befehl {
    /// Befehlsname fuer Logging und Metriken
    pub fn name(&self) -> &'static str {
        match self {
            Self::Silence(_) => "silence",
            Self::Unsilence => "unsilence",
        }
    }
}

/// Parst eine Textnachricht. Gibt None fuer alles zurueck, das kein
/// bekannter Befehl ist.
pub fn parse_befehl(text: &str) -> Option<Befehl> {
    let text = text.trim();
    let rest = text.strip_prefix(PRAEFIX)?;

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument_bereinigen(argument)),
        None => (rest, None),
    };

    match name.to_lowercase().as_str() {
        "silence" => Some(Befehl::Silence(argument)),
        // Argumente werden ignoriert
        "unsilence" => Some(Befehl::Unsilence),
        _ => None,
    }
}

/// Interpretiert ein Argument aus Ziffern als Kanal-ID
pub fn kanal_id(argument: &str) -> Option<ChannelId> {
    if argument.is_empty() || !argument.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // Ueberlauf (mehr als 20 Ziffern) zaehlt als Name
    argument.parse().ok()
}

fn argument_bereinigen(argument: &str) -> Option<String> {
    let argument = argument.trim();
    let argument = argument
        .strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .unwrap_or(argument)
        .trim();
    if argument.is_empty() {
        None
    } else {
        Some(argument.to_string())
    }
}
