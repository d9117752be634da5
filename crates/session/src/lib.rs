//! fernruf-session – Serverseitige Session-Verwaltung
//!
//! Drei unabhaengig gesperrte Tabellen, jeweils als klonbares Handle um
//! einen `Arc`:
//! - [`SessionDirectory`]: registrierte Clients samt Audio-Adressen
//! - [`CallCoordinator`]: Zustandsmaschine aller laufenden Anrufe
//! - [`RoomTable`]: Raum-Mitgliedschaften
//!
//! Keine Operation haelt mehr als eine Tabellen-Sperre gleichzeitig.

pub mod calls;
pub mod directory;
pub mod rooms;

pub use calls::{Call, CallCoordinator, CallState};
pub use directory::{Endpoint, SessionDirectory};
pub use rooms::RoomTable;
