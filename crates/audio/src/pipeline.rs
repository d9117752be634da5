//! Audio-Verarbeitungs-Pipeline
//!
//! Buendelt die DSP-Stufen fuer beide Richtungen eines Gespraechs.
//! Sende-Richtung (Mikrofon zum Netz):
//!
//! ```text
//! Mikrofon-Chunk
//!    |> Noise Gate           (noise_suppression)
//!    |> Echo-Unterdrueckung  (echo_cancellation, gegen Ausgabe-Historie)
//!    |> AGC                  (auto_gain_control)
//!    |> Eingangs-Lautstaerke
//!    |> VAD                  (voice_activity_detection) -> senden ja/nein
//! ```
//!
//! Empfangs-Richtung skaliert nur die Ausgabe-Lautstaerke und legt den
//! Chunk in der Historie ab, gegen die die Echo-Unterdrueckung der
//! Gegenrichtung vergleicht.
//!
//! Degenerierte Chunks (leer oder mit NaN) passieren die Kette
//! unveraendert. Lieber ein unverarbeiteter Chunk auf der Leitung als
//! ein stummer Gespraechsabbruch.

use tracing::debug;

use crate::dsp::agc::Agc;
use crate::dsp::echo_suppress::EchoSuppressor;
use crate::dsp::noise_gate::NoiseGate;
use crate::dsp::vad::VoiceDetector;
use crate::dsp::AudioProcessor;
use crate::history::OutputHistory;
use crate::settings::AudioSettings;
use crate::SAMPLE_RATE;

/// Verarbeitungskette fuer eine Gespraechsrichtung
pub struct AudioPipeline {
    einstellungen: AudioSettings,
    gate: NoiseGate,
    echo: EchoSuppressor,
    agc: Agc,
    vad: VoiceDetector,
    historie: OutputHistory,
}

impl AudioPipeline {
    /// Erstellt eine Pipeline aus den Einstellungen.
    ///
    /// Die Historie wird geteilt, damit Empfangs-Chunks als
    /// Echo-Referenz der Sende-Richtung dienen.
    pub fn neu(einstellungen: AudioSettings, historie: OutputHistory) -> Self {
        let gate = NoiseGate::neu(einstellungen.noise_gate_threshold);
        let echo = EchoSuppressor::neu(
            einstellungen.echo_threshold,
            einstellungen.echo_suppression_factor,
            einstellungen.min_suppression,
            einstellungen.adaptive_threshold,
        );
        Self {
            einstellungen,
            gate,
            echo,
            agc: Agc::neu(),
            vad: VoiceDetector::neu(SAMPLE_RATE as f32),
            historie,
        }
    }

    /// Verarbeitet einen Mikrofon-Chunk und entscheidet, ob er gesendet wird.
    pub fn senden_verarbeiten(&mut self, samples: &mut [f32]) -> bool {
        if samples.is_empty() || samples.iter().any(|s| !s.is_finite()) {
            debug!("Degenerierter Chunk, Verarbeitung uebersprungen");
            return true;
        }

        if self.einstellungen.noise_suppression {
            self.gate.process(samples);
        }

        if self.einstellungen.echo_cancellation {
            let referenzen = self.historie.momentaufnahme();
            self.echo.verarbeiten(samples, &referenzen);
        }

        if self.einstellungen.auto_gain_control {
            self.agc.process(samples);
        }

        lautstaerke_anwenden(samples, self.einstellungen.input_volume);

        if self.einstellungen.voice_activity_detection {
            self.vad.chunk_bewerten(samples)
        } else {
            true
        }
    }

    /// Verarbeitet einen empfangenen Chunk vor der Wiedergabe.
    pub fn empfangen_verarbeiten(&mut self, samples: &mut [f32]) {
        if samples.is_empty() || samples.iter().any(|s| !s.is_finite()) {
            debug!("Degenerierter Empfangs-Chunk, Verarbeitung uebersprungen");
            return;
        }

        lautstaerke_anwenden(samples, self.einstellungen.output_volume);
        self.historie.anhaengen(samples.to_vec());
    }

    /// Gibt die aktiven Einstellungen zurueck.
    pub fn einstellungen(&self) -> &AudioSettings {
        &self.einstellungen
    }

    /// Uebernimmt neue Einstellungen und verdrahtet die Stufen um.
    pub fn einstellungen_setzen(&mut self, neue: AudioSettings) {
        self.gate.schwelle_setzen(neue.noise_gate_threshold);
        self.echo.konfigurieren(
            neue.echo_threshold,
            neue.echo_suppression_factor,
            neue.min_suppression,
            neue.adaptive_threshold,
        );
        self.einstellungen = neue;
    }

    /// Setzt alle Stufen und die geteilte Historie zurueck.
    ///
    /// Wird beim Gespraechsende gerufen, damit das naechste Gespraech
    /// nicht gegen fremde Referenz-Chunks vergleicht.
    pub fn zuruecksetzen(&mut self) {
        self.gate.reset();
        self.echo.reset();
        self.agc.reset();
        self.vad.reset();
        self.historie.leeren();
    }
}

/// Skaliert Samples mit dem Lautstaerke-Faktor und begrenzt auf [-1, 1].
pub fn lautstaerke_anwenden(samples: &mut [f32], faktor: f32) {
    for sample in samples.iter_mut() {
        *sample = (*sample * faktor).clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::rms;
    use crate::CHUNK_SAMPLES;

    const TEST_RATE: f32 = SAMPLE_RATE as f32;

    fn sinus(frequenz: f32, amplitude: f32) -> Vec<f32> {
        (0..CHUNK_SAMPLES)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * frequenz * i as f32 / TEST_RATE).sin()
            })
            .collect()
    }

    fn pipeline_mit(einstellungen: AudioSettings) -> AudioPipeline {
        AudioPipeline::neu(einstellungen, OutputHistory::neu())
    }

    #[test]
    fn stille_bleibt_stille_und_wird_nicht_gesendet() {
        let mut pipeline = pipeline_mit(AudioSettings::default());
        let mut samples = vec![0.0f32; CHUNK_SAMPLES];
        let senden = pipeline.senden_verarbeiten(&mut samples);
        assert!(samples.iter().all(|&s| s == 0.0));
        assert!(!senden, "Stille sollte die VAD nicht passieren");
    }

    #[test]
    fn sprachton_wird_gesendet() {
        let mut pipeline = pipeline_mit(AudioSettings::default());
        let mut samples = sinus(300.0, 0.3);
        assert!(pipeline.senden_verarbeiten(&mut samples));
    }

    #[test]
    fn nan_chunk_passiert_unveraendert() {
        let mut pipeline = pipeline_mit(AudioSettings::default());
        let mut samples = sinus(300.0, 0.3);
        samples[10] = f32::NAN;
        let kopie = samples.clone();
        let senden = pipeline.senden_verarbeiten(&mut samples);
        assert!(senden);
        assert!(samples[10].is_nan());
        for (i, (a, b)) in samples.iter().zip(kopie.iter()).enumerate() {
            if i != 10 {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn leerer_chunk_passiert_unveraendert() {
        let mut pipeline = pipeline_mit(AudioSettings::default());
        let mut samples: Vec<f32> = Vec::new();
        assert!(pipeline.senden_verarbeiten(&mut samples));
    }

    #[test]
    fn eingangs_lautstaerke_skaliert_und_begrenzt() {
        let einstellungen = AudioSettings {
            input_volume: 1.5,
            noise_suppression: false,
            echo_cancellation: false,
            auto_gain_control: false,
            voice_activity_detection: false,
            ..AudioSettings::default()
        };
        let mut pipeline = pipeline_mit(einstellungen);
        let mut samples = vec![0.9f32, 0.4, -0.9];
        pipeline.senden_verarbeiten(&mut samples);
        assert!((samples[0] - 1.0).abs() < 1e-6);
        assert!((samples[1] - 0.6).abs() < 1e-6);
        assert!((samples[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn empfangen_skaliert_und_fuellt_historie() {
        let historie = OutputHistory::neu();
        let mut pipeline = AudioPipeline::neu(AudioSettings::default(), historie.clone());
        let mut samples = sinus(300.0, 0.3);
        let vorher = rms(&samples);
        pipeline.empfangen_verarbeiten(&mut samples);

        // output_volume 0.8 aus den Defaults
        assert!((rms(&samples) - vorher * 0.8).abs() < 1e-3);
        assert_eq!(historie.laenge(), 1);
    }

    #[test]
    fn echo_aus_der_historie_wird_unterdrueckt() {
        let einstellungen = AudioSettings {
            auto_gain_control: false,
            voice_activity_detection: false,
            ..AudioSettings::default()
        };
        let mut pipeline = pipeline_mit(einstellungen);

        // Erster Durchlauf ohne Referenz bleibt ungedaempft
        let mut ohne_referenz = sinus(300.0, 0.3);
        pipeline.senden_verarbeiten(&mut ohne_referenz);
        let pegel_ohne = rms(&ohne_referenz);

        // Empfangener Chunk landet in der Historie
        let mut empfangen = sinus(300.0, 0.3);
        pipeline.empfangen_verarbeiten(&mut empfangen);

        // Gleicher Chunk am Mikrofon korreliert jetzt mit der Historie
        let mut mit_referenz = sinus(300.0, 0.3);
        pipeline.senden_verarbeiten(&mut mit_referenz);
        let pegel_mit = rms(&mit_referenz);

        assert!(
            pegel_mit < pegel_ohne * 0.6,
            "ohne={} mit={}",
            pegel_ohne,
            pegel_mit
        );
    }

    #[test]
    fn einstellungen_setzen_verdrahtet_gate_um() {
        let einstellungen = AudioSettings {
            echo_cancellation: false,
            auto_gain_control: false,
            voice_activity_detection: false,
            input_volume: 1.0,
            ..AudioSettings::default()
        };
        let mut pipeline = pipeline_mit(einstellungen.clone());

        // Pegel 0.03 liegt ueber der Default-Schwelle 0.01
        let mut samples = vec![0.03f32; CHUNK_SAMPLES];
        pipeline.senden_verarbeiten(&mut samples);
        assert!((samples[0] - 0.03).abs() < 1e-6);

        pipeline.einstellungen_setzen(AudioSettings {
            noise_gate_threshold: 0.05,
            ..einstellungen
        });
        let mut samples = vec![0.03f32; CHUNK_SAMPLES];
        pipeline.senden_verarbeiten(&mut samples);
        assert!(samples[0] < 0.004, "samples[0]={}", samples[0]);
    }

    #[test]
    fn zuruecksetzen_leert_historie() {
        let historie = OutputHistory::neu();
        let mut pipeline = AudioPipeline::neu(AudioSettings::default(), historie.clone());
        let mut samples = sinus(300.0, 0.3);
        pipeline.empfangen_verarbeiten(&mut samples);
        assert_eq!(historie.laenge(), 1);

        pipeline.zuruecksetzen();
        assert_eq!(historie.laenge(), 0);
    }

    #[test]
    fn chunk_laenge_bleibt_erhalten() {
        let mut pipeline = pipeline_mit(AudioSettings::default());
        let mut samples = sinus(300.0, 0.3);
        pipeline.senden_verarbeiten(&mut samples);
        assert_eq!(samples.len(), CHUNK_SAMPLES);
    }
}
