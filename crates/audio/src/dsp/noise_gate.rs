//! Noise Gate auf Chunk-Basis
//!
//! Bewertet jeden Chunk ueber seine RMS-Energie. Liegt die Energie unter
//! dem Schwellenwert, wird der Chunk stark abgeschwaecht statt hart auf
//! Null gesetzt. Das vermeidet hoerbares Pumpen an Wortgrenzen und laesst
//! sehr leise Sprachanteile als Restpegel durch.

use super::{rms, AudioProcessor};

/// Abschwaechungsfaktor fuer Chunks unterhalb der Schwelle.
const GATE_ABSCHWAECHUNG: f32 = 0.1;

/// Noise Gate Prozessor
#[derive(Debug, Clone)]
pub struct NoiseGate {
    schwelle: f32,
    enabled: bool,
}

impl NoiseGate {
    /// Erstellt ein Gate mit dem angegebenen RMS-Schwellenwert.
    pub fn neu(schwelle: f32) -> Self {
        Self {
            schwelle,
            enabled: true,
        }
    }

    /// Setzt den Schwellenwert zur Laufzeit.
    pub fn schwelle_setzen(&mut self, schwelle: f32) {
        self.schwelle = schwelle;
    }

    /// Gibt den aktuellen Schwellenwert zurueck.
    pub fn schwelle(&self) -> f32 {
        self.schwelle
    }
}

impl AudioProcessor for NoiseGate {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled || samples.is_empty() {
            return;
        }

        if rms(samples) < self.schwelle {
            for sample in samples.iter_mut() {
                *sample *= GATE_ABSCHWAECHUNG;
            }
        }
    }

    fn reset(&mut self) {}

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_gate_stille_bleibt_stille() {
        let mut gate = NoiseGate::neu(0.01);
        let mut samples = vec![0.0f32; 1024];
        gate.process(&mut samples);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn noise_gate_leises_rauschen_wird_abgeschwaecht() {
        let mut gate = NoiseGate::neu(0.01);
        // Pegel 0.005 liegt unter der Schwelle 0.01
        let mut samples = vec![0.005f32; 1024];
        gate.process(&mut samples);
        for sample in &samples {
            assert!((sample - 0.0005).abs() < 1e-6, "sample={}", sample);
        }
    }

    #[test]
    fn noise_gate_lautes_signal_passiert_unveraendert() {
        let mut gate = NoiseGate::neu(0.01);
        let original: Vec<f32> = (0..1024)
            .map(|i| 0.3 * (i as f32 * 0.1).sin())
            .collect();
        let mut samples = original.clone();
        gate.process(&mut samples);
        assert_eq!(original, samples);
    }

    #[test]
    fn noise_gate_deaktiviert_passiert_alles() {
        let mut gate = NoiseGate::neu(0.01);
        gate.set_enabled(false);
        let original = vec![0.001f32; 1024];
        let mut samples = original.clone();
        gate.process(&mut samples);
        assert_eq!(original, samples);
    }

    #[test]
    fn noise_gate_schwelle_aenderbar() {
        let mut gate = NoiseGate::neu(0.01);
        gate.schwelle_setzen(0.05);
        assert!((gate.schwelle() - 0.05).abs() < f32::EPSILON);

        // Pegel 0.03 liegt jetzt unter der neuen Schwelle
        let mut samples = vec![0.03f32; 1024];
        gate.process(&mut samples);
        assert!(samples[0] < 0.004);
    }
}
