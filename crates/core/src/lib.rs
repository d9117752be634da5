//! fernruf-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Fernruf-Crates gemeinsam genutzt werden.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{FernrufError, Result};
pub use types::{unix_zeit, CallId, ClientId, EndpointStatus, CLIENT_ID_MAX_BYTES};
