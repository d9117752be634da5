//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Length(u32 little-endian) + JSON-Payload.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 LE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4 Laengen-Bytes).
//! Maximale Frame-Groesse ist konfigurierbar (Standard: 1 MB).
//!
//! ## Fehlerpolitik
//!
//! Ein Laengenfeld ueber dem Maximum ist ein Protokollverstoss und beendet
//! die Verbindung (Decoder-Fehler). Ein Frame mit ungueltigem JSON wird
//! dagegen nur verworfen: der Decoder liefert [`DecodedFrame::Verworfen`]
//! und die Verbindung bleibt offen.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::control::ControlMessage;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// Decode-Ergebnis
// ---------------------------------------------------------------------------

/// Ergebnis eines dekodierten Frames
///
/// Fehlerhaftes JSON ist kein Verbindungsfehler: der Frame wird konsumiert
/// und als `Verworfen` gemeldet, damit der Aufrufer ihn loggen kann.
#[derive(Debug, Clone)]
pub enum DecodedFrame {
    /// Vollstaendig geparste Nachricht
    Nachricht(ControlMessage),
    /// Frame verworfen (ungueltiges JSON), Verbindung bleibt nutzbar
    Verworfen { fehler: String },
}

impl DecodedFrame {
    /// Gibt die Nachricht zurueck falls vorhanden
    pub fn nachricht(self) -> Option<ControlMessage> {
        match self {
            Self::Nachricht(msg) => Some(msg),
            Self::Verworfen { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte TCP-Verbindungen
///
/// Implementiert `Encoder<ControlMessage>` und `Decoder` fuer nahtlose
/// Integration mit `tokio_util::codec::Framed`.
///
/// # Beispiel
///
/// ```rust,no_run
/// use tokio_util::codec::Framed;
/// use fernruf_protocol::wire::FrameCodec;
///
/// // let stream = TcpStream::connect(...).await?;
/// // let framed = Framed::new(stream, FrameCodec::new());
/// ```
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for FrameCodec {
    type Item = DecodedFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen (little-endian u32) ohne den Buffer zu veraendern
        let length = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;

        // Maximale Frame-Groesse pruefen - hier ist der Stream nicht mehr
        // synchronisierbar, die Verbindung muss beendet werden
        if length > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                    length, self.max_frame_size
                ),
            ));
        }

        // Pruefen ob der vollstaendige Frame bereits im Buffer ist
        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            // Speicher vorbelegen um Reallocations zu vermeiden
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        // Laengen-Feld verbrauchen
        src.advance(LENGTH_FIELD_SIZE);

        // Payload-Bytes extrahieren
        let payload = src.split_to(length);

        // JSON deserialisieren; Fehler verwerfen den Frame, nicht die Verbindung
        match serde_json::from_slice::<ControlMessage>(&payload) {
            Ok(message) => Ok(Some(DecodedFrame::Nachricht(message))),
            Err(e) => Ok(Some(DecodedFrame::Verworfen {
                fehler: e.to_string(),
            })),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<ControlMessage> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: ControlMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // JSON serialisieren
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        // Groesse pruefen
        if json.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                    json.len(),
                    self.max_frame_size
                ),
            ));
        }

        // Laengen-Feld + Payload schreiben
        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32_le(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen fuer direktes async Lesen/Schreiben
// ---------------------------------------------------------------------------

/// Liest einen einzelnen Frame aus einem `AsyncRead`
///
/// # Fehler
/// - `UnexpectedEof` wenn die Verbindung vor Abschluss des Frames getrennt wird
/// - `InvalidData` bei zu grossem Frame
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> io::Result<DecodedFrame>
where
    R: AsyncRead + Unpin,
{
    // Laengen-Feld lesen
    let mut len_buf = [0u8; LENGTH_FIELD_SIZE];
    reader.read_exact(&mut len_buf).await?;
    let length = u32::from_le_bytes(len_buf) as usize;

    // Groesse pruefen
    if length > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                length, max_frame_size
            ),
        ));
    }

    // Payload lesen
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    // JSON deserialisieren, Fehler als verworfenen Frame melden
    match serde_json::from_slice::<ControlMessage>(&payload) {
        Ok(message) => Ok(DecodedFrame::Nachricht(message)),
        Err(e) => Ok(DecodedFrame::Verworfen {
            fehler: e.to_string(),
        }),
    }
}

/// Schreibt einen einzelnen Frame in einen `AsyncWrite`
///
/// # Fehler
/// - `InvalidData` wenn die Nachricht nicht serialisiert werden kann oder zu gross ist
/// - IO-Fehler beim Schreiben
pub async fn write_frame<W>(
    writer: &mut W,
    message: &ControlMessage,
    max_frame_size: usize,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    // JSON serialisieren
    let json = serde_json::to_vec(message).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON-Serialisierung fehlgeschlagen: {}", e),
        )
    })?;

    // Groesse pruefen
    if json.len() > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                json.len(),
                max_frame_size
            ),
        ));
    }

    // Laengen-Feld + Payload schreiben
    let len_bytes = (json.len() as u32).to_le_bytes();
    writer.write_all(&len_bytes).await?;
    writer.write_all(&json).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
