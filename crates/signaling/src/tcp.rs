//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einer `ClientConnection`.
//!
//! Das Client-Limit greift bei der Registrierung, nicht beim Accept:
//! so kann sich ein abgestuerzter Client sofort neu verbinden, ohne auf
//! den Idle-Sweep seines alten Eintrags warten zu muessen.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::connection::ClientConnection;
use crate::error::SignalingResult;
use crate::server_state::SignalingState;

/// TCP-Signaling-Server
///
/// Bindet einen TCP-Socket und akzeptiert Verbindungen in einer Loop.
/// Jede Verbindung laeuft als eigener tokio-Task.
pub struct SignalingServer {
    state: Arc<SignalingState>,
    listener: TcpListener,
}

impl SignalingServer {
    /// Bindet den TCP-Socket und erstellt einen neuen SignalingServer
    pub async fn binden(state: Arc<SignalingState>, bind_addr: SocketAddr) -> SignalingResult<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        tracing::info!(adresse = %bind_addr, "TCP Signaling-Server gebunden");

        Ok(Self { state, listener })
    }

    /// Gibt die lokale Bind-Adresse zurueck
    pub fn lokale_adresse(&self) -> SignalingResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Startet die Accept-Loop
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(
        self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let lokale_addr = self.listener.local_addr()?;

        tracing::info!(
            adresse = %lokale_addr,
            "TCP Signaling-Server gestartet"
        );

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");

                            let verbindung = ClientConnection::neu(
                                Arc::clone(&self.state),
                                peer_addr,
                            );
                            let shutdown_rx_clone = shutdown_rx.clone();

                            tokio::spawn(async move {
                                verbindung.verarbeiten(stream, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP Signaling-Server gestoppt");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::SignalingConfig;
    use fernruf_core::types::ClientId;
    use fernruf_protocol::wire::{read_frame, write_frame, DEFAULT_MAX_FRAME_SIZE};
    use fernruf_protocol::ControlMessage;
    use std::time::Duration;
    use tokio::net::TcpStream;

    async fn test_server() -> (
        Arc<SignalingState>,
        SocketAddr,
        tokio::sync::watch::Sender<bool>,
    ) {
        let state = SignalingState::neu(SignalingConfig::default());
        let server = SignalingServer::binden(state.clone(), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let adresse = server.lokale_adresse().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(server.starten(shutdown_rx));

        (state, adresse, shutdown_tx)
    }

    #[tokio::test]
    async fn register_ueber_echten_socket() {
        let (state, adresse, shutdown_tx) = test_server().await;

        let mut stream = TcpStream::connect(adresse).await.unwrap();
        let anfrage = ControlMessage::register(ClientId::new("alice"), "Alice", Some(40000));
        write_frame(&mut stream, &anfrage, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();

        let antwort = read_frame(&mut stream, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        match antwort.nachricht().unwrap() {
            ControlMessage::RegisterResponse(resp) => {
                assert_eq!(resp.client_id.as_str(), "alice");
            }
            andere => panic!("RegisterResponse erwartet, war {}", andere.typ()),
        }
        assert!(state.directory.ist_registriert(&ClientId::new("alice")));

        shutdown_tx.send(true).unwrap();
    }

    #[tokio::test]
    async fn getrennter_client_wird_bereinigt() {
        let (state, adresse, shutdown_tx) = test_server().await;

        let mut stream = TcpStream::connect(adresse).await.unwrap();
        let anfrage = ControlMessage::register(ClientId::new("bob"), "Bob", None);
        write_frame(&mut stream, &anfrage, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        read_frame(&mut stream, DEFAULT_MAX_FRAME_SIZE).await.unwrap();
        assert!(state.directory.ist_registriert(&ClientId::new("bob")));

        drop(stream);

        // Cleanup laeuft asynchron nach dem EOF
        let mut bereinigt = false;
        for _ in 0..100 {
            if !state.directory.ist_registriert(&ClientId::new("bob")) {
                bereinigt = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(bereinigt, "Verzeichnis-Eintrag nach Trennung entfernt");

        shutdown_tx.send(true).unwrap();
    }
}
