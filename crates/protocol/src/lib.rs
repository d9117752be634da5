//! fernruf-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichtentypen, das TCP-Frame-Format
//! und das UDP-Datagramm-Format die zwischen Client und Server
//! ausgetauscht werden.

pub mod control;
pub mod datagram;
pub mod wire;

pub use control::{ControlMessage, ErrorCode};
pub use datagram::{AudioDatagram, HEADER_GROESSE, ID_FELD_LAENGE};
pub use wire::{DecodedFrame, FrameCodec, DEFAULT_MAX_FRAME_SIZE};
