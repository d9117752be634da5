//! Relay-Zaehler – beobachtbare Drop-Gruende ohne Rueckkanal
//!
//! Verworfene Datagramme werden nie an die Endpunkte gemeldet; sie sind
//! ausschliesslich ueber diese Zaehler und die Logs sichtbar.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomare Zaehler des Audio-Relays
#[derive(Debug, Default)]
pub struct RelayZaehler {
    /// Empfangene Datagramme (inklusive spaeter verworfener)
    pub empfangen: AtomicU64,
    /// Erfolgreich weitergeleitete Datagramme
    pub weitergeleitet: AtomicU64,
    /// Verworfen: zu kurz oder ungueltiger Header
    pub ungueltig: AtomicU64,
    /// Verworfen: Absender und Ziel fuehren keinen aktiven Anruf
    pub nicht_autorisiert: AtomicU64,
    /// Verworfen: Ziel-Adresse nicht aufloesbar
    pub nicht_aufloesbar: AtomicU64,
}

impl RelayZaehler {
    /// Erstellt einen neuen Zaehlersatz (alle Null)
    pub fn neu() -> Self {
        Self::default()
    }

    /// Liest alle Zaehler als konsistenzfreien Schnappschuss
    pub fn stand(&self) -> ZaehlerStand {
        ZaehlerStand {
            empfangen: self.empfangen.load(Ordering::Relaxed),
            weitergeleitet: self.weitergeleitet.load(Ordering::Relaxed),
            ungueltig: self.ungueltig.load(Ordering::Relaxed),
            nicht_autorisiert: self.nicht_autorisiert.load(Ordering::Relaxed),
            nicht_aufloesbar: self.nicht_aufloesbar.load(Ordering::Relaxed),
        }
    }
}

/// Momentaufnahme der Relay-Zaehler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZaehlerStand {
    pub empfangen: u64,
    pub weitergeleitet: u64,
    pub ungueltig: u64,
    pub nicht_autorisiert: u64,
    pub nicht_aufloesbar: u64,
}
