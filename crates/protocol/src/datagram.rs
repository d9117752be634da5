//! Audio-Datagramme (UDP)
//!
//! Definiert die binaere Paketstruktur fuer die Audio-Uebertragung via UDP.
//! Die Kodierung erfolgt im Client; der Server leitet Datagramme anhand der
//! Ziel-Kennung weiter (SFU-Stil).
//!
//! ## Datagramm-Format (Header = 32 Bytes, kein serde)
//!
//! ```text
//! Offset  Len  Beschreibung
//! ------  ---  -----------
//!  0      16   Quell-ClientId (UTF-8, mit NUL-Bytes aufgefuellt)
//! 16      16   Ziel-ClientId (UTF-8, mit NUL-Bytes aufgefuellt)
//! 32+      N   Nutzdaten (PCM-Bytes), N >= 1
//! ```
//!
//! Kennungen kuerzer als 16 Bytes werden rechts mit NUL-Bytes aufgefuellt,
//! laengere auf 16 Bytes gekuerzt. Ein Datagramm ohne Nutzdaten ist
//! ungueltig.

use std::io;

use fernruf_core::types::{ClientId, CLIENT_ID_MAX_BYTES};

/// Laenge eines Kennungs-Felds im Header
pub const ID_FELD_LAENGE: usize = CLIENT_ID_MAX_BYTES;

/// Header-Groesse in Bytes (Quelle + Ziel)
pub const HEADER_GROESSE: usize = 2 * ID_FELD_LAENGE;

// ---------------------------------------------------------------------------
// AudioDatagram
// ---------------------------------------------------------------------------

/// Vollstaendiges Audio-UDP-Datagramm (Header + PCM-Nutzdaten)
///
/// Direkte Byte-Serialisierung, kein serde (Performance-kritisch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDatagram {
    /// Absender-Kennung
    pub quelle: ClientId,
    /// Empfaenger-Kennung
    pub ziel: ClientId,
    /// PCM-Nutzdaten (16-bit signed little-endian, mono)
    pub payload: Vec<u8>,
}

impl AudioDatagram {
    /// Erstellt ein neues Datagramm
    pub fn neu(quelle: ClientId, ziel: ClientId, payload: Vec<u8>) -> Self {
        Self {
            quelle,
            ziel,
            payload,
        }
    }

    /// Serialisiert das gesamte Datagramm in einen Byte-Vec
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_GROESSE + self.payload.len());
        buf.extend_from_slice(&id_feld_schreiben(&self.quelle));
        buf.extend_from_slice(&id_feld_schreiben(&self.ziel));
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Deserialisiert ein Datagramm aus einem Byte-Slice und validiert es
    ///
    /// # Fehler
    /// - `InvalidData` wenn das Slice keine Nutzdaten enthaelt (<= 32 Bytes)
    /// - `InvalidData` wenn ein Kennungs-Feld kein gueltiges UTF-8 ist
    pub fn decode(buf: &[u8]) -> io::Result<Self> {
        if buf.len() <= HEADER_GROESSE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Datagramm zu kurz: {} Bytes (Minimum: {} Bytes)",
                    buf.len(),
                    HEADER_GROESSE + 1
                ),
            ));
        }

        let quelle = id_feld_lesen(&buf[..ID_FELD_LAENGE])?;
        let ziel = id_feld_lesen(&buf[ID_FELD_LAENGE..HEADER_GROESSE])?;

        Ok(Self {
            quelle,
            ziel,
            payload: buf[HEADER_GROESSE..].to_vec(),
        })
    }

    /// Gesamtgroesse des Datagramms in Bytes
    pub fn groesse(&self) -> usize {
        HEADER_GROESSE + self.payload.len()
    }
}

// ---------------------------------------------------------------------------
// Kennungs-Felder
// ---------------------------------------------------------------------------

/// Schreibt eine Kennung in ein NUL-aufgefuelltes 16-Byte-Feld
///
/// `ClientId` garantiert bereits maximal 16 Bytes, laengere Eingaben
/// koennen hier nicht auftreten.
fn id_feld_schreiben(id: &ClientId) -> [u8; ID_FELD_LAENGE] {
    let mut feld = [0u8; ID_FELD_LAENGE];
    let bytes = id.as_str().as_bytes();
    feld[..bytes.len()].copy_from_slice(bytes);
    feld
}

/// Liest eine Kennung aus einem 16-Byte-Feld
///
/// Auffuell-NUL-Bytes am rechten Rand werden entfernt. Ein komplett
/// leeres Feld ergibt eine leere Kennung, das entscheidet der Aufrufer.
fn id_feld_lesen(feld: &[u8]) -> io::Result<ClientId> {
    let laenge = feld.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let text = std::str::from_utf8(&feld[..laenge]).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Kennungs-Feld ist kein gueltiges UTF-8: {}", e),
        )
    })?;
    Ok(ClientId::new(text))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
