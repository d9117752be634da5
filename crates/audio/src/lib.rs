//! fernruf-audio – Client Audio-Pipeline
//!
//! DSP-Kette fuer Fernruf-Gespraeche:
//! - Noise Gate auf Chunk-Basis
//! - Korrelationsbasierte Echo-Unterdrueckung gegen die Ausgabe-Historie
//! - Automatische Verstaerkungsregelung (AGC)
//! - Sprachaktivitaets-Erkennung (VAD) als Sende-Entscheidung
//! - Sample-Konvertierung zwischen Wire-Format (i16 LE) und f32
//! - Persistierbare Einstellungen mit Presets
//!
//! Die Pipeline arbeitet auf 16-kHz-Mono-Chunks fester Groesse und ist
//! bewusst unabhaengig von Netz und Geraete-IO gehalten.

pub mod convert;
pub mod dsp;
pub mod history;
pub mod pipeline;
pub mod settings;

/// Abtastrate der gesamten Pipeline in Hz.
pub const SAMPLE_RATE: u32 = 16_000;

/// Chunk-Groesse in Samples (64 ms bei 16 kHz).
pub const CHUNK_SAMPLES: usize = 1024;

// Bequeme Re-Exporte der wichtigsten Typen
pub use convert::{bytes_zu_samples, samples_zu_bytes};
pub use dsp::AudioProcessor;
pub use history::{OutputHistory, HISTORIE_TIEFE};
pub use pipeline::{lautstaerke_anwenden, AudioPipeline};
pub use settings::AudioSettings;
