//! Lautstaerke-Klassifikator pro Sprecher
//!
//! Pro 20ms-Frame:
//! 1. Pegel in dBFS (RMS ueber alle Samples, Boden fuer Stille)
//! 2. Exponentielle Glaettung ueber `glaettung_frames` Frames
//! 3. Hysterese: Markierung nach `sustain_frames` Frames ueber `max_db`,
//!    Freigabe erst nach `release_frames` Frames unter `max_db - hysterese_db`
//!
//! Ein fehlerhafter Frame wird abgelehnt ohne den Zustand anzufassen.

use esportbot_core::AudioFrame;
use serde::{Deserialize, Serialize};

use crate::error::{AudioError, AudioResult};
use crate::level::{frame_pegel_db, DB_BODEN};

/// Konfiguration fuer den Klassifikator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessConfig {
    /// Schwellenwert in dBFS ab dem ein Sprecher als zu laut gilt
    pub max_db: f64,
    /// Abstand in dB unter `max_db` fuer die Freigabe
    pub hysterese_db: f64,
    /// Fensterlaenge K der exponentiellen Glaettung (1 = keine Glaettung)
    pub glaettung_frames: u32,
    /// Aufeinanderfolgende Frames ueber `max_db` bis zur Markierung
    pub sustain_frames: u32,
    /// Aufeinanderfolgende Frames unter der Freigabe-Schwelle bis zur Freigabe
    pub release_frames: u32,
    /// Pegel fuer Stille in dBFS
    pub boden_db: f64,
}

impl Default for LoudnessConfig {
    fn default() -> Self {
        Self {
            max_db: -10.0,
            hysterese_db: 6.0,
            glaettung_frames: 5,
            sustain_frames: 3,
            release_frames: 5,
            boden_db: DB_BODEN,
        }
    }
}

impl LoudnessConfig {
    /// Prueft die Konfiguration auf Plausibilitaet
    pub fn validieren(&self) -> AudioResult<()> {
        if self.glaettung_frames == 0 || self.sustain_frames == 0 || self.release_frames == 0 {
            return Err(AudioError::Konfiguration(
                "glaettung_frames, sustain_frames und release_frames muessen > 0 sein".into(),
            ));
        }
        if self.hysterese_db <= 0.0 {
            return Err(AudioError::Konfiguration(format!(
                "hysterese_db muss > 0 sein: {}",
                self.hysterese_db
            )));
        }
        if self.max_db > 0.0 {
            return Err(AudioError::Konfiguration(format!(
                "max_db ueber Vollaussteuerung: {}",
                self.max_db
            )));
        }
        if self.boden_db >= self.max_db - self.hysterese_db {
            return Err(AudioError::Konfiguration(format!(
                "boden_db ({}) muss unter der Freigabe-Schwelle ({}) liegen",
                self.boden_db,
                self.release_schwelle_db()
            )));
        }
        Ok(())
    }

    /// Schwelle unter die der geglaettete Pegel fuer eine Freigabe fallen muss
    pub fn release_schwelle_db(&self) -> f64 {
        self.max_db - self.hysterese_db
    }

    /// Glaettungsfaktor der EMA: 2 / (K + 1)
    fn alpha(&self) -> f64 {
        2.0 / (self.glaettung_frames.max(1) as f64 + 1.0)
    }
}

/// Ergebnis einer Klassifikation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Normal,
    TooLoud,
}

/// Klassifikator fuer genau einen Sprecher
#[derive(Debug, Clone)]
pub struct LoudnessClassifier {
    config: LoudnessConfig,
    alpha: f64,
    /// Geglaetteter Pegel (None vor dem ersten Frame)
    geglaettet_db: Option<f64>,
    laut_serie: u32,
    leise_serie: u32,
    markiert: bool,
    /// Hoechster geglaetteter Pegel der aktuellen lauten Phase
    spitze_db: f64,
}

impl LoudnessClassifier {
    /// Erstellt einen neuen Klassifikator
    pub fn new(config: LoudnessConfig) -> Self {
        let alpha = config.alpha();
        let boden = config.boden_db;
        Self {
            config,
            alpha,
            geglaettet_db: None,
            laut_serie: 0,
            leise_serie: 0,
            markiert: false,
            spitze_db: boden,
        }
    }

    /// Bewertet den naechsten Frame.
    ///
    /// Gibt `MalformedFrame` zurueck wenn die Frame-Laenge kein Vielfaches
    /// von 4 Bytes ist; der Zustand bleibt dann unveraendert.
    pub fn update(&mut self, frame: &AudioFrame) -> AudioResult<Decision> {
        let db = frame_pegel_db(frame, self.config.boden_db)?;

        let geglaettet = match self.geglaettet_db {
            None => db,
            Some(vorher) => vorher + self.alpha * (db - vorher),
        };
        self.geglaettet_db = Some(geglaettet);

        if self.markiert {
            self.spitze_db = self.spitze_db.max(geglaettet);
            if geglaettet < self.config.release_schwelle_db() {
                self.leise_serie += 1;
                if self.leise_serie >= self.config.release_frames {
                    self.markiert = false;
                    self.leise_serie = 0;
                    self.laut_serie = 0;
                    tracing::trace!(pegel_db = geglaettet, "Sprecher wieder normal");
                }
            } else {
                self.leise_serie = 0;
            }
        } else if geglaettet > self.config.max_db {
            self.spitze_db = if self.laut_serie == 0 {
                geglaettet
            } else {
                self.spitze_db.max(geglaettet)
            };
            self.laut_serie += 1;
            if self.laut_serie >= self.config.sustain_frames {
                self.markiert = true;
                self.leise_serie = 0;
                tracing::trace!(spitze_db = self.spitze_db, "Sprecher zu laut");
            }
        } else {
            self.laut_serie = 0;
        }

        Ok(self.entscheidung())
    }

    /// Aktuelle Entscheidung ohne neuen Frame
    pub fn entscheidung(&self) -> Decision {
        if self.markiert {
            Decision::TooLoud
        } else {
            Decision::Normal
        }
    }

    /// Gibt zurueck ob der Sprecher aktuell als zu laut markiert ist
    pub fn ist_markiert(&self) -> bool {
        self.markiert
    }

    /// Geglaetteter Pegel in dBFS (Boden vor dem ersten Frame)
    pub fn geglaetteter_db(&self) -> f64 {
        self.geglaettet_db.unwrap_or(self.config.boden_db)
    }

    /// Hoechster geglaetteter Pegel der aktuellen (oder letzten) lauten Phase
    pub fn spitzen_db(&self) -> f64 {
        self.spitze_db
    }

    pub fn config(&self) -> &LoudnessConfig {
        &self.config
    }
}
