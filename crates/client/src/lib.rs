//! Fernruf Client - Bibliothek fuer Endpunkte
//!
//! Verbindet sich mit einem Fernruf-Server und stellt die komplette
//! Client-Seite bereit: Registrierung, Verzeichnis, Anruf-Lebenszyklus
//! und den UDP-Audio-Transport waehrend eines Gespraechs.
//!
//! ## Architektur
//!
//! ```text
//! +----------------------------------------------------------+
//! |                       VoipClient                         |
//! |                                                          |
//! |  ControlLink          ClientSessionState    CallAudio    |
//! |  (TCP, Frames)        (Verzeichnis,         (UDP,        |
//! |   |- Sende-Haelfte     Angebote,             Pipeline)   |
//! |   |- Lese-Task         aktiver Anruf)                    |
//! +----------------------------------------------------------+
//!         |                                      |
//!         v                                      v
//!   Signaling-Server  <----- Anruf-IDs ----->  Audio-Relay
//! ```
//!
//! Die Anwendung treibt den Client: eigene Aktionen ueber die
//! `VoipClient`-Methoden, Server-Pushes ueber
//! [`VoipClient::naechstes_ereignis`]. Audio-Chunks fliessen ueber den
//! [`AudioAnschluss`], den `verbinden` zurueckgibt.

pub mod audio_link;
pub mod client;
pub mod connection;
pub mod state;

pub use audio_link::CallAudio;
pub use client::{AudioAnschluss, VoipClient};
pub use connection::ControlLink;
pub use state::{AktiverAnruf, ClientSessionState};
