//! fernruf-signaling – TCP Control Layer
//!
//! Dieser Crate implementiert den Signalisierungs-Service fuer Fernruf.
//! Er verwaltet TCP-Verbindungen, Registrierung, Chat-Zustellung,
//! Raum-Mitgliedschaften und koordiniert den Anruf-Lebenszyklus.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Unregistriert --register--> Registriert
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- SessionHandler  (Register, GetClients)
//!     +-- ChatHandler     (Broadcast, Private)
//!     +-- CallHandler     (Request, Answer, Hangup)
//!     +-- RoomHandler     (Join, Leave)
//!     +-- StatusHandler   (GetStatus)
//!
//! SessionDirectory / CallCoordinator / RoomTable – geteilte Tabellen
//! EventBroadcaster – Weiterleitungen an andere Clients zustellen
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use error::{SignalingError, SignalingResult};
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
