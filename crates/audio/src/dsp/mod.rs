//! DSP-Bausteine der Sende-Pipeline
//!
//! Alle Stufen implementieren das `AudioProcessor` Trait fuer
//! einheitliches Aktivieren, Zuruecksetzen und In-Place-Verarbeiten.

pub mod agc;
pub mod echo_suppress;
pub mod noise_gate;
pub mod vad;

/// Gemeinsames Trait fuer alle Audio-Prozessoren
///
/// Alle DSP-Bausteine verarbeiten Samples in-place und sind
/// Send + Sync fuer Thread-sichere Pipeline-Nutzung.
pub trait AudioProcessor: Send + Sync {
    /// Verarbeitet einen Puffer von Samples in-place
    fn process(&mut self, samples: &mut [f32]);

    /// Setzt den internen Zustand zurueck
    fn reset(&mut self);

    /// Gibt zurueck ob der Prozessor aktiv ist
    fn is_enabled(&self) -> bool;

    /// Aktiviert oder deaktiviert den Prozessor
    fn set_enabled(&mut self, enabled: bool);
}

/// Berechnet die RMS-Energie eines Sample-Puffers
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let quadratsumme: f32 = samples.iter().map(|s| s * s).sum();
    (quadratsumme / samples.len() as f32).sqrt()
}
