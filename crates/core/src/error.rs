//! Fehlertypen fuer Fernruf
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Fernruf
pub type Result<T> = std::result::Result<T, FernrufError>;

/// Alle moeglichen Fehler im Fernruf-System
#[derive(Debug, Error)]
pub enum FernrufError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Frame zu gross: {laenge} Bytes (Maximum: {maximum} Bytes)")]
    FrameZuGross { laenge: usize, maximum: usize },

    // --- Ressourcen ---
    #[error("Client nicht gefunden: {0}")]
    ClientNichtGefunden(String),

    #[error("Anruf nicht gefunden: {0}")]
    AnrufNichtGefunden(String),

    #[error("Client ist nicht online: {0}")]
    ClientOffline(String),

    #[error("Bereits in einem Anruf: {0}")]
    BereitsImAnruf(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Audio ---
    #[error("Audiofehler: {0}")]
    Audio(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl FernrufError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Zeitlimit(_) | Self::Verbindung(_) | Self::Getrennt(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = FernrufError::ClientOffline("bob".into());
        assert_eq!(e.to_string(), "Client ist nicht online: bob");
    }

    #[test]
    fn wiederholbar_erkennung() {
        assert!(FernrufError::Zeitlimit("test".into()).ist_wiederholbar());
        assert!(!FernrufError::ClientNichtGefunden("test".into()).ist_wiederholbar());
    }

    #[test]
    fn frame_zu_gross_fehler() {
        let e = FernrufError::FrameZuGross {
            laenge: 2_000_000,
            maximum: 1_048_576,
        };
        assert!(e.to_string().contains("2000000"));
        assert!(e.to_string().contains("1048576"));
    }
}
