//! Sprachaktivitaets-Erkennung (VAD)
//!
//! Bewertet jeden Chunk ueber drei unabhaengige Merkmale: RMS-Energie,
//! Zero-Crossing-Rate und eine Grundfrequenz-Schaetzung. Stimmen
//! mindestens zwei Merkmale fuer Sprache, zaehlt der Chunk als
//! Sprach-Chunk. Ein gleitendes Fenster ueber die letzten Chunk-Voten
//! plus eine Karenzzeit nach dem letzten Sprach-Chunk verhindern, dass
//! kurze Pausen mitten im Satz die Uebertragung abschneiden.

use std::collections::VecDeque;

use super::{rms, AudioProcessor};

/// RMS-Pegel, ab dem ein Chunk als energiereich gilt.
const ENERGIE_SCHWELLE: f32 = 0.02;

/// ZCR oberhalb dieses Werts spricht fuer Rauschen statt Sprache.
const ZCR_SCHWELLE: f32 = 0.25;

/// Untergrenze des Sprachbands in Hz.
const SPRACHE_MIN_HZ: f32 = 80.0;

/// Obergrenze des Sprachbands in Hz.
const SPRACHE_MAX_HZ: f32 = 2000.0;

/// Anzahl Chunk-Voten im gleitenden Fenster.
const FENSTER_GROESSE: usize = 5;

/// Chunks, die nach dem letzten Sprach-Chunk noch als aktiv gelten.
const KARENZ_CHUNKS: u32 = 8;

/// Sprachaktivitaets-Detektor
#[derive(Debug, Clone)]
pub struct VoiceDetector {
    sample_rate: f32,
    fenster: VecDeque<bool>,
    karenz: u32,
    aktiv: bool,
    enabled: bool,
}

impl VoiceDetector {
    pub fn neu(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            fenster: VecDeque::with_capacity(FENSTER_GROESSE),
            karenz: 0,
            aktiv: false,
            enabled: true,
        }
    }

    /// Gibt zurueck, ob der letzte Chunk als Sprache bewertet wurde.
    pub fn ist_aktiv(&self) -> bool {
        self.aktiv
    }

    /// Bewertet einen Chunk und gibt zurueck, ob er uebertragen werden soll.
    ///
    /// Deaktiviert laesst der Detektor alles durch. Die Samples werden
    /// nicht veraendert.
    pub fn chunk_bewerten(&mut self, samples: &[f32]) -> bool {
        if !self.enabled {
            return true;
        }
        if samples.is_empty() {
            return self.aktiv;
        }

        let energie = rms(samples) > ENERGIE_SCHWELLE;
        let zcr = zero_crossing_rate(samples) < ZCR_SCHWELLE;
        let frequenz = {
            let f = frequenz_schaetzen(samples, self.sample_rate);
            (SPRACHE_MIN_HZ..=SPRACHE_MAX_HZ).contains(&f)
        };

        let stimmen = [energie, zcr, frequenz].iter().filter(|&&v| v).count();
        let chunk_votum = stimmen >= 2;

        if self.fenster.len() == FENSTER_GROESSE {
            self.fenster.pop_front();
        }
        self.fenster.push_back(chunk_votum);

        let dafuer = self.fenster.iter().filter(|&&v| v).count();
        if dafuer * 2 > self.fenster.len() {
            self.aktiv = true;
            self.karenz = KARENZ_CHUNKS;
        } else if self.karenz > 0 {
            self.karenz -= 1;
            self.aktiv = true;
        } else {
            self.aktiv = false;
        }

        self.aktiv
    }
}

impl AudioProcessor for VoiceDetector {
    /// Aktualisiert nur den internen Zustand, die Samples bleiben unveraendert.
    fn process(&mut self, samples: &mut [f32]) {
        self.chunk_bewerten(samples);
    }

    fn reset(&mut self) {
        self.fenster.clear();
        self.karenz = 0;
        self.aktiv = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Normalisierte Zero-Crossing-Rate eines Chunks.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let durchgaenge = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    durchgaenge as f32 / (samples.len() - 1) as f32
}

/// Schaetzt die dominante Frequenz aus dem Verhaeltnis der mittleren
/// Differenz-Amplitude zur mittleren Signal-Amplitude.
///
/// Fuer einen reinen Sinus liefert die Schaetzung exakt dessen Frequenz,
/// fuer Gemische einen energie-gewichteten Mittelwert. Das reicht, um
/// Sprachband von breitbandigem Rauschen zu trennen.
pub fn frequenz_schaetzen(samples: &[f32], sample_rate: f32) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let mittel_abs = samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32;
    if mittel_abs <= 1e-9 {
        return 0.0;
    }
    let mittel_diff = samples
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .sum::<f32>()
        / (samples.len() - 1) as f32;

    let verhaeltnis = (mittel_diff / (2.0 * mittel_abs)).clamp(0.0, 1.0);
    sample_rate / std::f32::consts::PI * verhaeltnis.asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 16_000.0;
    const CHUNK: usize = 1024;

    fn sinus(frequenz: f32, amplitude: f32) -> Vec<f32> {
        (0..CHUNK)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * frequenz * i as f32 / SAMPLE_RATE).sin()
            })
            .collect()
    }

    /// Deterministisches Pseudo-Rauschen ueber einen linearen
    /// Kongruenz-Generator.
    fn rauschen(seed: &mut u32, amplitude: f32) -> Vec<f32> {
        (0..CHUNK)
            .map(|_| {
                *seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let wert = (*seed >> 8) as f32 / (1 << 24) as f32;
                (wert * 2.0 - 1.0) * amplitude
            })
            .collect()
    }

    #[test]
    fn vad_stille_ist_keine_sprache() {
        let mut vad = VoiceDetector::neu(SAMPLE_RATE);
        let stille = vec![0.0f32; CHUNK];
        assert!(!vad.chunk_bewerten(&stille));
        assert!(!vad.ist_aktiv());
    }

    #[test]
    fn vad_sprachton_wird_erkannt() {
        let mut vad = VoiceDetector::neu(SAMPLE_RATE);
        // 300 Hz liegt mitten im Sprachband
        let ton = sinus(300.0, 0.3);
        assert!(vad.chunk_bewerten(&ton));
    }

    #[test]
    fn vad_breitband_rauschen_wird_verworfen() {
        let mut vad = VoiceDetector::neu(SAMPLE_RATE);
        let mut seed = 0x1234_5678u32;
        // Rauschen mit RMS ueber der Energie-Schwelle, aber ZCR und
        // Frequenz-Schaetzung ausserhalb des Sprachbands
        for _ in 0..6 {
            let chunk = rauschen(&mut seed, 0.085);
            assert!(!vad.chunk_bewerten(&chunk));
        }
    }

    #[test]
    fn vad_hochfrequenter_ton_ist_keine_sprache() {
        let mut vad = VoiceDetector::neu(SAMPLE_RATE);
        let pfeifen = sinus(7_000.0, 0.3);
        assert!(!vad.chunk_bewerten(&pfeifen));
    }

    #[test]
    fn vad_karenz_ueberbrueckt_kurze_pausen() {
        let mut vad = VoiceDetector::neu(SAMPLE_RATE);
        let ton = sinus(300.0, 0.3);
        let stille = vec![0.0f32; CHUNK];

        for _ in 0..FENSTER_GROESSE {
            assert!(vad.chunk_bewerten(&ton));
        }

        // Fenster-Mehrheit plus Karenz halten noch zehn stille Chunks aktiv
        for i in 0..10 {
            assert!(vad.chunk_bewerten(&stille), "Chunk {} sollte aktiv sein", i);
        }
        assert!(!vad.chunk_bewerten(&stille));
    }

    #[test]
    fn vad_deaktiviert_laesst_alles_durch() {
        let mut vad = VoiceDetector::neu(SAMPLE_RATE);
        vad.set_enabled(false);
        let stille = vec![0.0f32; CHUNK];
        assert!(vad.chunk_bewerten(&stille));
    }

    #[test]
    fn vad_reset_loescht_zustand() {
        let mut vad = VoiceDetector::neu(SAMPLE_RATE);
        let ton = sinus(300.0, 0.3);
        vad.chunk_bewerten(&ton);
        assert!(vad.ist_aktiv());
        vad.reset();
        assert!(!vad.ist_aktiv());
    }

    #[test]
    fn frequenz_schaetzung_trifft_reinen_sinus() {
        let f300 = frequenz_schaetzen(&sinus(300.0, 0.3), SAMPLE_RATE);
        assert!((250.0..350.0).contains(&f300), "f300={}", f300);

        let f1000 = frequenz_schaetzen(&sinus(1_000.0, 0.3), SAMPLE_RATE);
        assert!((900.0..1100.0).contains(&f1000), "f1000={}", f1000);
    }

    #[test]
    fn frequenz_schaetzung_stille_ist_null() {
        assert_eq!(frequenz_schaetzen(&vec![0.0f32; CHUNK], SAMPLE_RATE), 0.0);
    }

    #[test]
    fn zcr_niederfrequenter_sinus_ist_niedrig() {
        let zcr = zero_crossing_rate(&sinus(300.0, 0.3));
        assert!(zcr < 0.1, "zcr={}", zcr);
    }

    #[test]
    fn zcr_alternierendes_signal_ist_hoch() {
        let samples: Vec<f32> = (0..CHUNK)
            .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let zcr = zero_crossing_rate(&samples);
        assert!(zcr > 0.9, "zcr={}", zcr);
    }
}
