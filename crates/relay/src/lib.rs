//! fernruf-relay – UDP-Audio-Weiterleitung
//!
//! Der Server mischt kein Audio: er lernt Absenderadressen, prueft die
//! Anruf-Zugehoerigkeit und leitet Datagramme unveraendert an den jeweils
//! anderen Teilnehmer weiter.

pub mod stats;
pub mod udp;

pub use stats::{RelayZaehler, ZaehlerStand};
pub use udp::AudioRelay;
