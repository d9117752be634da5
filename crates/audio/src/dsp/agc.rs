//! Automatische Verstaerkungsregelung (AGC)
//!
//! Zieht den RMS-Pegel jedes Chunks in Richtung eines festen Zielwerts.
//! Der Verstaerkungsfaktor ist eng begrenzt, damit Stille nicht zu
//! Rauschen aufgeblasen und laute Passagen nicht abrupt gedrueckt werden.
//! Nach der Verstaerkung werden die Samples hart auf [-1, 1] begrenzt.

use super::{rms, AudioProcessor};

/// Ziel-RMS-Pegel, entspricht etwa -20 dBFS.
const ZIEL_RMS: f32 = 0.1;

/// Untere Grenze des Verstaerkungsfaktors.
const MIN_VERSTAERKUNG: f32 = 0.5;

/// Obere Grenze des Verstaerkungsfaktors.
const MAX_VERSTAERKUNG: f32 = 2.0;

/// AGC Prozessor
#[derive(Debug, Clone)]
pub struct Agc {
    letzte_verstaerkung: f32,
    enabled: bool,
}

impl Agc {
    pub fn neu() -> Self {
        Self {
            letzte_verstaerkung: 1.0,
            enabled: true,
        }
    }

    /// Gibt den zuletzt angewandten Verstaerkungsfaktor zurueck.
    pub fn letzte_verstaerkung(&self) -> f32 {
        self.letzte_verstaerkung
    }
}

impl Default for Agc {
    fn default() -> Self {
        Self::neu()
    }
}

impl AudioProcessor for Agc {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled || samples.is_empty() {
            return;
        }

        let pegel = rms(samples);
        // Stille nicht aufblasen
        if pegel <= 1e-6 {
            return;
        }

        let verstaerkung = (ZIEL_RMS / pegel).clamp(MIN_VERSTAERKUNG, MAX_VERSTAERKUNG);
        self.letzte_verstaerkung = verstaerkung;

        for sample in samples.iter_mut() {
            *sample = (*sample * verstaerkung).clamp(-1.0, 1.0);
        }
    }

    fn reset(&mut self) {
        self.letzte_verstaerkung = 1.0;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
