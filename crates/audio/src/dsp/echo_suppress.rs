//! Korrelationsbasierte Echo-Unterdrueckung
//!
//! Vergleicht den Mikrofon-Chunk mit den zuletzt wiedergegebenen
//! Ausgabe-Chunks. Eine hohe Pearson-Korrelation zu einem der
//! Referenz-Chunks deutet auf ein Echo der Gegenstelle hin; der Chunk
//! wird dann abgeschwaecht statt entfernt, damit Doppelsprechen
//! verstaendlich bleibt.
//!
//! Bei leisem Eingangssignal hebt der adaptive Modus die Schwelle an,
//! weil Korrelationswerte auf Restrauschen unzuverlaessig sind.

use super::rms;

/// Unterhalb dieses RMS-Pegels wird keine Unterdrueckung versucht.
const ENERGIE_UNTERGRENZE: f32 = 0.01;

/// Pegel, ab dem die adaptive Schwellen-Anhebung einsetzt.
const ADAPTIV_PEGEL: f32 = 0.05;

/// Maximale Anhebung der Schwelle im adaptiven Modus.
const ADAPTIV_ANHEBUNG: f32 = 0.2;

/// Obergrenze der effektiven Schwelle.
const SCHWELLE_MAXIMUM: f32 = 0.95;

/// Anteil des Originalsignals, der immer beigemischt bleibt.
const RESTSIGNAL_ANTEIL: f32 = 0.1;

/// Echo-Unterdrueckung ueber Ausgabe-Referenzen
#[derive(Debug, Clone)]
pub struct EchoSuppressor {
    schwelle: f32,
    faktor: f32,
    min_unterdrueckung: f32,
    adaptiv: bool,
    enabled: bool,
}

impl EchoSuppressor {
    pub fn neu(schwelle: f32, faktor: f32, min_unterdrueckung: f32, adaptiv: bool) -> Self {
        Self {
            schwelle,
            faktor,
            min_unterdrueckung,
            adaptiv,
            enabled: true,
        }
    }

    /// Uebernimmt neue Parameter zur Laufzeit.
    pub fn konfigurieren(
        &mut self,
        schwelle: f32,
        faktor: f32,
        min_unterdrueckung: f32,
        adaptiv: bool,
    ) {
        self.schwelle = schwelle;
        self.faktor = faktor;
        self.min_unterdrueckung = min_unterdrueckung;
        self.adaptiv = adaptiv;
    }

    /// Daempft `samples`, wenn sie mit einem der Referenz-Chunks korrelieren.
    ///
    /// Referenzen abweichender Laenge werden uebersprungen. Ohne brauchbare
    /// Referenz oder unterhalb der Energie-Untergrenze bleibt der Chunk
    /// unveraendert.
    pub fn verarbeiten(&mut self, samples: &mut [f32], referenzen: &[Vec<f32>]) {
        if !self.enabled || samples.is_empty() || referenzen.is_empty() {
            return;
        }

        let pegel = rms(samples);
        if pegel <= ENERGIE_UNTERGRENZE {
            return;
        }

        let mut spitze = 0.0f32;
        for referenz in referenzen {
            if referenz.len() != samples.len() {
                continue;
            }
            let r = korrelation(samples, referenz).abs();
            if r > spitze {
                spitze = r;
            }
        }

        if spitze <= self.effektive_schwelle(pegel) {
            return;
        }

        let skala = (1.0 - self.faktor * spitze).max(self.min_unterdrueckung);
        let final_skala = skala + RESTSIGNAL_ANTEIL * (1.0 - skala);
        for sample in samples.iter_mut() {
            *sample *= final_skala;
        }
    }

    /// Schwelle fuer den aktuellen Eingangspegel.
    fn effektive_schwelle(&self, pegel: f32) -> f32 {
        if self.adaptiv && pegel < ADAPTIV_PEGEL {
            let anhebung = (ADAPTIV_PEGEL - pegel) / ADAPTIV_PEGEL * ADAPTIV_ANHEBUNG;
            (self.schwelle + anhebung).min(SCHWELLE_MAXIMUM)
        } else {
            self.schwelle
        }
    }

    pub fn reset(&mut self) {}

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Pearson-Korrelationskoeffizient zweier gleich langer Signale.
///
/// Liefert 0.0, wenn eines der Signale praktisch konstant ist.
fn korrelation(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len() as f32;
    let mittel_a = a.iter().sum::<f32>() / n;
    let mittel_b = b.iter().sum::<f32>() / n;

    let mut zaehler = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mittel_a;
        let dy = y - mittel_b;
        zaehler += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a <= 1e-6 || var_b <= 1e-6 {
        return 0.0;
    }
    zaehler / (var_a.sqrt() * var_b.sqrt())
}
