//! Handler fuer alle Control-Nachrichten
//!
//! Jeder Handler ist fuer eine Nachrichten-Gruppe zustaendig und
//! arbeitet auf dem gemeinsamen SignalingState.

pub mod call_handler;
pub mod chat_handler;
pub mod room_handler;
pub mod session_handler;
pub mod status_handler;
