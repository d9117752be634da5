//! Fehlertypen fuer den Signaling-Service

use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Verbindung wurde getrennt
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    /// Protokollfehler (ungueltiges Frame, falscher Zustand)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),
}

impl SignalingError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
