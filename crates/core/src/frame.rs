//! PCM-Audio-Frames wie sie der Connector pro Sprecher liefert
//!
//! Format: 48 kHz, 16 Bit signed little-endian, 2 Kanaele interleaved.
//! Ein regulaerer Frame umfasst 20ms = 1920 Samples pro Kanal = 7680 Bytes.
//! Der Frame selbst validiert nicht – die Pruefung erfolgt beim Verarbeiten,
//! damit ein defekter Frame verworfen werden kann ohne Zustand zu aendern.

use bytes::Bytes;

/// Abtastrate in Hz
pub const SAMPLE_RATE: u32 = 48_000;
/// Anzahl der Kanaele (Stereo)
pub const KANAELE: usize = 2;
/// Bytes pro Sample (16 Bit)
pub const BYTES_PRO_SAMPLE: usize = 2;
/// Samples pro Kanal in einem 20ms-Frame
pub const SAMPLES_PRO_KANAL: usize = 1920;
/// Bytegroesse eines vollstaendigen 20ms-Frames
pub const FRAME_BYTES: usize = SAMPLES_PRO_KANAL * KANAELE * BYTES_PRO_SAMPLE;

/// Ein roher PCM-Frame (geteilter Puffer, Clone ist billig)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    daten: Bytes,
}

impl AudioFrame {
    /// Erstellt einen Frame aus rohen Bytes
    pub fn neu(daten: impl Into<Bytes>) -> Self {
        Self {
            daten: daten.into(),
        }
    }

    /// Erstellt einen Frame aus bereits interleavten Samples
    pub fn aus_samples(samples: &[i16]) -> Self {
        let mut daten = Vec::with_capacity(samples.len() * BYTES_PRO_SAMPLE);
        for s in samples {
            daten.extend_from_slice(&s.to_le_bytes());
        }
        Self::neu(daten)
    }

    /// Erstellt einen vollstaendigen 20ms-Frame mit konstanter Amplitude,
    /// abwechselnd positiv und negativ (Rechteck bei Nyquist)
    pub fn konstant(amplitude: i16) -> Self {
        let samples: Vec<i16> = (0..SAMPLES_PRO_KANAL * KANAELE)
            .map(|i| if i % 2 == 0 { amplitude } else { amplitude.saturating_neg() })
            .collect();
        Self::aus_samples(&samples)
    }

    /// Vollstaendiger 20ms-Frame Stille
    pub fn stille() -> Self {
        Self::neu(vec![0u8; FRAME_BYTES])
    }

    /// Rohe Bytes
    pub fn bytes(&self) -> &Bytes {
        &self.daten
    }

    /// Laenge in Bytes
    pub fn laenge(&self) -> usize {
        self.daten.len()
    }

    /// Prueft ob die Laenge ein Vielfaches von Kanaele × 2 Bytes ist und
    /// der Frame mindestens ein Stereo-Sample enthaelt
    pub fn ist_wohlgeformt(&self) -> bool {
        let block = KANAELE * BYTES_PRO_SAMPLE;
        !self.daten.is_empty() && self.daten.len() % block == 0
    }

    /// Iteriert ueber alle dekodierten Samples (interleaved)
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.daten
            .chunks_exact(BYTES_PRO_SAMPLE)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regulaerer_frame_groesse() {
        assert_eq!(FRAME_BYTES, 7680);
        let frame = AudioFrame::stille();
        assert!(frame.ist_wohlgeformt());
        assert_eq!(frame.samples().count(), 3840);
    }

    #[test]
    fn samples_little_endian() {
        let frame = AudioFrame::neu(vec![0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80, 0xFF, 0x7F]);
        let samples: Vec<i16> = frame.samples().collect();
        assert_eq!(samples, vec![1, -1, i16::MIN, i16::MAX]);
    }

    #[test]
    fn ungerade_laenge_nicht_wohlgeformt() {
        assert!(!AudioFrame::neu(vec![0u8; 7679]).ist_wohlgeformt());
        // Gerade, aber kein ganzes Stereo-Sample
        assert!(!AudioFrame::neu(vec![0u8; 6]).ist_wohlgeformt());
        assert!(!AudioFrame::neu(Vec::<u8>::new()).ist_wohlgeformt());
    }

    #[test]
    fn konstant_wechselt_vorzeichen() {
        let frame = AudioFrame::konstant(1000);
        let samples: Vec<i16> = frame.samples().take(4).collect();
        assert_eq!(samples, vec![1000, -1000, 1000, -1000]);
        assert_eq!(frame.laenge(), FRAME_BYTES);
    }
}
