//! fernruf-server – Bibliotheks-Root
//!
//! Verdrahtet die Subsysteme zu einem lauffaehigen Server:
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                          Server                              |
//! |                                                              |
//! |  SignalingServer (TCP)        AudioRelay (UDP)               |
//! |        |                            |                        |
//! |        +-----> SessionDirectory <---+                        |
//! |        +-----> CallCoordinator  <---+                        |
//! |        +-----> RoomTable                                     |
//! |                                                              |
//! |  Idle-Sweep (Intervall-Task ueber dem Directory)             |
//! +--------------------------------------------------------------+
//! ```
//!
//! Signaling und Relay arbeiten auf denselben Tabellen-Handles: die
//! Registrierung kuendigt den Audio-Port an, das Relay lernt Adressen
//! und prueft Anrufe gegen den Koordinator.

pub mod config;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};

use fernruf_relay::AudioRelay;
use fernruf_session::{CallCoordinator, RoomTable, SessionDirectory};
use fernruf_signaling::{SignalingConfig, SignalingServer, SignalingState};

use config::FernrufConfig;

/// Gebundener, startbereiter Server
pub struct Server {
    config: FernrufConfig,
    state: Arc<SignalingState>,
    signaling: SignalingServer,
    relay: Arc<AudioRelay>,
}

impl Server {
    /// Bindet beide Sockets und verdrahtet die geteilten Tabellen
    pub async fn binden(config: FernrufConfig) -> Result<Self> {
        let directory = SessionDirectory::neu();
        let calls = CallCoordinator::neu();
        let rooms = RoomTable::neu();

        let state = SignalingState::mit_tabellen(
            SignalingConfig {
                server_name: config.server.name.clone(),
                max_clients: config.server.max_clients,
            },
            directory.clone(),
            calls.clone(),
            rooms,
        );

        let tcp_addr: SocketAddr = config
            .tcp_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige TCP-Adresse '{}'", config.tcp_bind_adresse()))?;
        let udp_addr: SocketAddr = config
            .udp_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige UDP-Adresse '{}'", config.udp_bind_adresse()))?;

        let signaling = SignalingServer::binden(Arc::clone(&state), tcp_addr)
            .await
            .context("TCP-Socket binden fehlgeschlagen")?;
        let relay = Arc::new(
            AudioRelay::binden(udp_addr, directory, calls)
                .await
                .context("UDP-Socket binden fehlgeschlagen")?,
        );

        Ok(Self {
            config,
            state,
            signaling,
            relay,
        })
    }

    /// Lokale Adresse der TCP-Steuerverbindung
    pub fn tcp_adresse(&self) -> Result<SocketAddr> {
        Ok(self.signaling.lokale_adresse()?)
    }

    /// Lokale Adresse des UDP Audio-Relays
    pub fn udp_adresse(&self) -> Result<SocketAddr> {
        Ok(self.relay.lokale_adresse()?)
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.tcp_adresse()?,
            udp = %self.udp_adresse()?,
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        // Audio-Relay
        let (relay_stopp_tx, relay_stopp_rx) = oneshot::channel::<()>();
        let relay = Arc::clone(&self.relay);
        let relay_task = tokio::spawn(async move {
            relay.empfangs_loop_starten(relay_stopp_rx).await;
        });

        // Idle-Sweep ueber dem Directory
        let directory = self.state.directory.clone();
        let idle_timeout = Duration::from_secs(self.config.sitzung.idle_timeout_sek);
        let intervall = Duration::from_secs(self.config.sitzung.pruef_intervall_sek.max(1));
        let mut sweep_shutdown = shutdown_rx.clone();
        let sweep_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(intervall);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let markiert = directory.inaktive_markieren(idle_timeout);
                        if !markiert.is_empty() {
                            tracing::info!(
                                anzahl = markiert.len(),
                                "Inaktive Clients als offline markiert"
                            );
                        }
                    }
                    _ = sweep_shutdown.changed() => break,
                }
            }
        });

        // TCP-Accept-Loop blockiert bis zum Shutdown-Signal
        let ergebnis = self.signaling.starten(shutdown_rx).await;

        // Relay und Sweep geordnet beenden
        let _ = relay_stopp_tx.send(());
        let _ = relay_task.await;
        sweep_task.abort();

        tracing::info!("Server beendet");
        ergebnis.map_err(Into::into)
    }

    /// Startet den Server und beendet ihn bei Ctrl-C
    pub async fn laufen_bis_ctrl_c(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            }
        });

        self.starten(shutdown_rx).await
    }
}
