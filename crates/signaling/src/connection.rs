//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task.
//!
//! ## Ablauf
//! ```text
//! Unregistriert --register--> Registriert --Trennung--> Cleanup
//! ```
//!
//! Nach erfolgreicher Registrierung wird die Broadcaster-Queue des
//! Clients abonniert; Weiterleitungen anderer Clients laufen ueber
//! diese Queue in den TCP-Strom. Liveness kommt ohne Keepalive aus:
//! das Verzeichnis vermerkt Aktivitaet pro Anfrage und der Idle-Sweep
//! des Servers markiert stille Clients offline.

use futures_util::{SinkExt, StreamExt};
use fernruf_protocol::{
    wire::{DecodedFrame, FrameCodec},
    ControlMessage, ErrorCode,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::server_state::SignalingState;

/// Groesse der Queue zwischen Broadcaster-Pipe und TCP-Sender
const AUSGANGS_QUEUE_GROESSE: usize = 64;

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `FrameCodec`, dispatcht an `MessageDispatcher` und
/// sendet Antworten zurueck. Laeuft in einem eigenen tokio-Task.
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Diese Methode laeuft bis die Verbindung getrennt wird oder ein
    /// Shutdown-Signal eingeht.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;

        tracing::info!(peer = %peer_addr, "Neue Verbindung");

        let mut framed = Framed::new(stream, FrameCodec::new());

        // Ausgehende Nachrichten-Queue (Broadcaster -> TCP)
        // Wird nach der Registrierung mit der Broadcaster-Queue verknuepft
        let (sende_tx, mut sende_rx) = mpsc::channel::<ControlMessage>(AUSGANGS_QUEUE_GROESSE);

        let mut ctx = DispatcherContext::neu(peer_addr);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        loop {
            tokio::select! {
                // Eingehende Nachricht vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(DecodedFrame::Nachricht(nachricht))) => {
                            tracing::trace!(
                                peer = %peer_addr,
                                typ = nachricht.typ(),
                                "Nachricht empfangen"
                            );

                            if let Some(antwort) = dispatcher.dispatch(nachricht, &mut ctx) {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(
                                        peer = %peer_addr,
                                        fehler = %e,
                                        "Senden fehlgeschlagen"
                                    );
                                    break;
                                }
                            }

                            // Nach erfolgreicher Registrierung: Broadcaster-Queue abonnieren
                            if let Some(id) = ctx.client_id.clone() {
                                if !self.state.broadcaster.ist_registriert(&id) {
                                    let mut empfangs_queue =
                                        self.state.broadcaster.client_registrieren(id);
                                    let sende_tx_pipe = sende_tx.clone();
                                    tokio::spawn(async move {
                                        while let Some(msg) = empfangs_queue.recv().await {
                                            if sende_tx_pipe.send(msg).await.is_err() {
                                                break;
                                            }
                                        }
                                    });
                                }
                            }
                        }
                        Some(Ok(DecodedFrame::Verworfen { fehler })) => {
                            // Einzelner kaputter Frame, Verbindung bleibt offen
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %fehler,
                                "Frame verworfen (ungueltiges JSON)"
                            );
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Weiterleitung aus dem Broadcaster
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(
                            peer = %peer_addr,
                            fehler = %e,
                            "Weiterleitung fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = ControlMessage::fehler(
                            ErrorCode::InternalError,
                            "Server wird heruntergefahren",
                        );
                        let _ = framed.send(abschied).await;
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        if let Some(id) = ctx.client_id.take() {
            dispatcher.client_cleanup(&id);
        }

        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
    }
}
