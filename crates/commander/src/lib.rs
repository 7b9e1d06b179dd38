//! esportbot-commander – Textbefehle fuer den Esportbot
//!
//! Wertet Textnachrichten aus die der Connector liefert:
//! - `!silence` – Voice-Kanal des Aufrufers betreten und ueberwachen
//! - `!silence <id|name>` – bestimmten Voice-Kanal betreten
//! - `!unsilence` – Voice-Kanal verlassen
//!
//! Jeder Befehl wird pro Benutzer ueber einen Token-Bucket begrenzt.

pub mod error;
pub mod parser;
pub mod rate_limit;
pub mod router;

pub use error::{CommanderError, CommanderResult};
pub use parser::{parse_befehl, Befehl};
pub use rate_limit::{RateLimitKonfig, RateLimiter};
pub use router::CommandRouter;
