//! Client-seitige TCP-Verbindung zum Fernruf-Server
//!
//! Nutzt den FrameCodec aus fernruf-protocol fuer das Wire-Format
//! (u32 LE length + JSON payload). Ein eigener Lese-Task pumpt alle
//! eingehenden Nachrichten in eine Queue; so kommen Server-Pushes
//! (weitergeleitete Anrufe, Chat) und Antworten auf eigene Anfragen
//! ueber denselben Kanal an.

use futures_util::{SinkExt, StreamExt};
use fernruf_core::{FernrufError, Result};
use fernruf_protocol::{
    wire::{DecodedFrame, FrameCodec},
    ControlMessage,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

/// Groesse der Queue fuer eingehende Nachrichten
const EREIGNIS_QUEUE_GROESSE: usize = 64;

/// Schreibseite der Steuerverbindung
///
/// Die Leseseite laeuft als eigener Task und liefert alle Nachrichten
/// ueber den beim Verbinden zurueckgegebenen Receiver. Ein geschlossener
/// Receiver bedeutet: Verbindung weg.
pub struct ControlLink {
    schreiber: futures_util::stream::SplitSink<Framed<TcpStream, FrameCodec>, ControlMessage>,
}

impl ControlLink {
    /// Baut die TCP-Verbindung auf und startet den Lese-Task
    pub async fn verbinden(
        host: &str,
        port: u16,
    ) -> Result<(Self, mpsc::Receiver<ControlMessage>)> {
        let adresse = format!("{}:{}", host, port);
        let stream = TcpStream::connect(&adresse)
            .await
            .map_err(|e| FernrufError::Verbindung(format!("{}: {}", adresse, e)))?;
        tracing::info!(adresse = %adresse, "Steuerverbindung hergestellt");

        let framed = Framed::new(stream, FrameCodec::new());
        let (schreiber, mut leser) = framed.split();

        let (ereignis_tx, ereignis_rx) = mpsc::channel(EREIGNIS_QUEUE_GROESSE);
        tokio::spawn(async move {
            while let Some(frame) = leser.next().await {
                match frame {
                    Ok(DecodedFrame::Nachricht(nachricht)) => {
                        if ereignis_tx.send(nachricht).await.is_err() {
                            // Client-Seite hat den Receiver fallen gelassen
                            break;
                        }
                    }
                    Ok(DecodedFrame::Verworfen { fehler }) => {
                        tracing::warn!(fehler = %fehler, "Frame vom Server verworfen");
                    }
                    Err(e) => {
                        tracing::warn!(fehler = %e, "Lesefehler auf der Steuerverbindung");
                        break;
                    }
                }
            }
            tracing::debug!("Lese-Task der Steuerverbindung beendet");
        });

        Ok((Self { schreiber }, ereignis_rx))
    }

    /// Sendet eine ControlMessage an den Server
    pub async fn senden(&mut self, nachricht: ControlMessage) -> Result<()> {
        self.schreiber
            .send(nachricht)
            .await
            .map_err(|e| FernrufError::Getrennt(e.to_string()))
    }

    /// Schliesst die Schreibseite sauber
    pub async fn schliessen(&mut self) {
        let _ = self.schreiber.close().await;
        tracing::info!("Steuerverbindung getrennt");
    }
}
