//! Pegelberechnung fuer 16-Bit-PCM
//!
//! RMS ueber alle Samples eines Frames (beide Kanaele gemeinsam) und
//! Umrechnung in dBFS relativ zu 32768.

use esportbot_core::AudioFrame;

use crate::error::{AudioError, AudioResult};

/// Vollaussteuerung fuer 16-Bit-Samples
pub const VOLLAUSSTEUERUNG: f64 = 32768.0;

/// Boden-Wert fuer Stille (16-Bit-Dynamikumfang)
pub const DB_BODEN: f64 = -96.0;

/// Berechnet den RMS-Wert einer Sample-Folge (0.0 fuer leere Folgen)
pub fn rms(samples: impl IntoIterator<Item = i16>) -> f64 {
    let (summe, anzahl) = samples
        .into_iter()
        .fold((0.0f64, 0usize), |(summe, n), s| {
            let s = s as f64;
            (summe + s * s, n + 1)
        });
    if anzahl == 0 {
        return 0.0;
    }
    (summe / anzahl as f64).sqrt()
}

/// Wandelt einen RMS-Wert in dBFS um.
///
/// `20 * log10(rms / 32768)`, nach unten auf `boden_db` begrenzt.
/// RMS = 0 (-unendlich) liefert genau `boden_db`.
pub fn pegel_db(rms: f64, boden_db: f64) -> f64 {
    if rms <= 0.0 {
        return boden_db;
    }
    (20.0 * (rms / VOLLAUSSTEUERUNG).log10()).max(boden_db)
}

/// Validiert einen Frame und berechnet seinen Pegel in dBFS
pub fn frame_pegel_db(frame: &AudioFrame, boden_db: f64) -> AudioResult<f64> {
    if !frame.ist_wohlgeformt() {
        return Err(AudioError::MalformedFrame {
            laenge: frame.laenge(),
        });
    }
    Ok(pegel_db(rms(frame.samples()), boden_db))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_null_fuer_stille() {
        assert_eq!(rms([0i16; 480]), 0.0);
        assert_eq!(rms(std::iter::empty()), 0.0);
    }

    #[test]
    fn rms_korrekt() {
        // RMS von [3, -4, 3, -4] = sqrt((9 + 16 + 9 + 16) / 4) = sqrt(12.5)
        let wert = rms([3i16, -4, 3, -4]);
        assert!((wert - 12.5f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn stille_ist_boden() {
        let db = frame_pegel_db(&AudioFrame::stille(), DB_BODEN).unwrap();
        assert_eq!(db, DB_BODEN);
    }

    #[test]
    fn vollaussteuerung_nahe_null_db() {
        let db = frame_pegel_db(&AudioFrame::konstant(32767), DB_BODEN).unwrap();
        assert!(db.abs() < 0.01, "Vollaussteuerung sollte ~0 dBFS sein: {db}");
        assert!(db <= 0.0);
    }

    #[test]
    fn halbe_amplitude_minus_sechs_db() {
        let db = frame_pegel_db(&AudioFrame::konstant(16384), DB_BODEN).unwrap();
        assert!((db - (-6.0206)).abs() < 0.001, "erwartet ~-6.02 dB, erhalten {db}");
    }

    #[test]
    fn sehr_leise_wird_auf_boden_begrenzt() {
        // RMS 0.5 liegt rechnerisch bei ~-96.3 dB
        assert_eq!(pegel_db(0.5, DB_BODEN), DB_BODEN);
        assert!(pegel_db(1.0, DB_BODEN) > DB_BODEN);
    }

    #[test]
    fn fehlerhafter_frame_abgelehnt() {
        let frame = AudioFrame::neu(vec![0u8; 7679]);
        assert_eq!(
            frame_pegel_db(&frame, DB_BODEN),
            Err(AudioError::MalformedFrame { laenge: 7679 })
        );
    }
}
