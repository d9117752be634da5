//! Audio-Einstellungen – serialisierbare Pipeline-Tunables
//!
//! Alle Regler der Sende- und Empfangskette in einer flachen Struktur,
//! als JSON persistierbar. Jedes Feld hat einen eigenen serde-Default,
//! damit auch eine unvollstaendige Datei eine lauffaehige Konfiguration
//! ergibt.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Einstellungen der Audio-Pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Echo-Unterdrueckung auf dem Sendepfad
    pub echo_cancellation: bool,
    /// Noise Gate auf dem Sendepfad
    pub noise_suppression: bool,
    /// Automatische Verstaerkungsregelung auf dem Sendepfad
    pub auto_gain_control: bool,
    /// Sprach-Erkennung: Chunks ohne Sprache werden nicht gesendet
    pub voice_activity_detection: bool,
    /// Eingangslautstaerke in `[0, 1]`
    pub input_volume: f32,
    /// Ausgangslautstaerke in `[0, 1]`
    pub output_volume: f32,
    /// RMS-Schwelle unter der das Noise Gate abschwaecht
    pub noise_gate_threshold: f32,
    /// Korrelations-Schwelle ab der ein Chunk als Echo gilt
    pub echo_threshold: f32,
    /// Staerke der Echo-Abschwaechung (hoeher = staerker)
    pub echo_suppression_factor: f32,
    /// Untergrenze der Echo-Abschwaechung (nie komplett stumm)
    pub min_suppression: f32,
    /// Hebt die Echo-Schwelle fuer leise Chunks an
    pub adaptive_threshold: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            voice_activity_detection: true,
            input_volume: 0.7,
            output_volume: 0.8,
            noise_gate_threshold: 0.01,
            echo_threshold: 0.6,
            echo_suppression_factor: 0.7,
            min_suppression: 0.3,
            adaptive_threshold: true,
        }
    }
}

impl AudioSettings {
    /// Konservatives Preset: Hoerbarkeit vor Filterung
    ///
    /// Echo-Unterdrueckung und Sprach-Erkennung aus, niedrige Gate-Schwelle,
    /// beide Lautstaerken angehoben.
    pub fn konservativ() -> Self {
        Self {
            echo_cancellation: false,
            voice_activity_detection: false,
            noise_gate_threshold: 0.005,
            input_volume: 0.8,
            output_volume: 0.8,
            ..Self::default()
        }
    }

    /// Ausgewogenes Preset: alle Filter an, entschaerfte Echo-Parameter
    pub fn optimal() -> Self {
        Self {
            echo_threshold: 0.5,
            echo_suppression_factor: 0.65,
            min_suppression: 0.35,
            ..Self::default()
        }
    }

    /// Laedt Einstellungen aus einer JSON-Datei
    ///
    /// Eine fehlende Datei ist kein Fehler: dann gelten die Defaults.
    pub fn laden(pfad: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let settings: Self = serde_json::from_str(&inhalt).map_err(|e| {
                    anyhow::anyhow!("Audio-Einstellungen in '{}' ungueltig: {}", pfad.display(), e)
                })?;
                tracing::info!(pfad = %pfad.display(), "Audio-Einstellungen geladen");
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = %pfad.display(),
                    "Keine Audio-Einstellungen gefunden, verwende Defaults"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Audio-Einstellungen '{}' nicht lesbar: {}",
                pfad.display(),
                e
            )),
        }
    }

    /// Speichert die Einstellungen als JSON-Datei
    pub fn speichern(&self, pfad: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(pfad, json).map_err(|e| {
            anyhow::anyhow!("Audio-Einstellungen '{}' nicht schreibbar: {}", pfad.display(), e)
        })?;
        tracing::info!(pfad = %pfad.display(), "Audio-Einstellungen gespeichert");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
