//! esportbot-audio – Lautstaerke-Klassifikation
//!
//! Bewertet bereits dekodierte PCM-Frames (16 Bit, Stereo, 20ms) eines
//! Sprechers:
//! - Pegelberechnung (RMS, dBFS mit Boden-Wert)
//! - Exponentielle Glaettung ueber K Frames
//! - Entscheidung "zu laut" mit Sustain- und Release-Hysterese
//!
//! Keine I/O, kein Zugriff auf lokale Audio-Geraete.

pub mod error;
pub mod level;
pub mod loudness;

// Bequeme Re-Exporte der wichtigsten Typen
pub use error::{AudioError, AudioResult};
pub use level::{frame_pegel_db, pegel_db, rms, DB_BODEN};
pub use loudness::{Decision, LoudnessClassifier, LoudnessConfig};
