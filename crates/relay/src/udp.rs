//! UDP Audio-Relay – Empfangs-Loop und Weiterleitung
//!
//! Bindet einen UDP-Socket, empfaengt Audio-Datagramme, lernt die
//! Absenderadressen und leitet Nutzdaten an den jeweils anderen
//! Anruf-Teilnehmer weiter.
//!
//! ## Architektur
//!
//! ```text
//! UDP Socket (recv_from)
//!     |
//!     v
//! AudioDatagram::decode()           <- Validierung (>= 33 Bytes, UTF-8)
//!     |
//!     v
//! SessionDirectory::audio_adresse_lernen()  <- Absender merken
//!     |
//!     v
//! CallCoordinator::ist_aktiver_anruf()      <- Autorisierung
//!     |
//!     v
//! SessionDirectory::audio_adresse_aufloesen() -> send_to(ziel)
//! ```
//!
//! Verworfene Datagramme erzeugen nie eine Antwort an einen Endpunkt;
//! jeder Drop-Grund hat seinen eigenen Zaehler.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::UdpSocket;

use fernruf_protocol::datagram::AudioDatagram;
use fernruf_session::{CallCoordinator, SessionDirectory};

use crate::stats::{RelayZaehler, ZaehlerStand};

/// Maximale UDP-Paketgroesse (Header 32 + 1024 Samples a 2 Bytes + Puffer)
const UDP_BUFFER_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// AudioRelay
// ---------------------------------------------------------------------------

/// UDP Audio-Relay des Servers
///
/// Bindet einen UDP-Socket und empfaengt Audio-Datagramme in einer
/// Async-Loop. Weitergeleitet wird nur zwischen den beiden Teilnehmern
/// eines aktiven Anrufs.
pub struct AudioRelay {
    socket: Arc<UdpSocket>,
    directory: SessionDirectory,
    calls: CallCoordinator,
    zaehler: RelayZaehler,
}

impl AudioRelay {
    /// Bindet den UDP-Socket und erstellt ein neues Relay
    pub async fn binden(
        bind_addr: SocketAddr,
        directory: SessionDirectory,
        calls: CallCoordinator,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        tracing::info!(addr = %bind_addr, "UDP Audio-Relay gebunden");

        Ok(Self {
            socket: Arc::new(socket),
            directory,
            calls,
            zaehler: RelayZaehler::neu(),
        })
    }

    /// Gibt die lokale Bind-Adresse zurueck
    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Liest den aktuellen Stand der Relay-Zaehler
    pub fn zaehler_stand(&self) -> ZaehlerStand {
        self.zaehler.stand()
    }

    /// Startet die Empfangs-Loop (laeuft bis `shutdown_rx` ein Signal sendet)
    ///
    /// Diese Methode blockiert bis zum Shutdown-Signal.
    pub async fn empfangs_loop_starten(
        &self,
        mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) {
        // Stack-allokierter Empfangspuffer – wird wiederverwendet
        let mut buf = [0u8; UDP_BUFFER_SIZE];

        tracing::info!("Audio-Empfangs-Loop gestartet");

        loop {
            tokio::select! {
                // Eingehendes UDP-Datagramm
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, absender_addr)) => {
                            self.datagramm_verarbeiten(&buf[..len], absender_addr).await;
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "UDP-Empfangsfehler");
                            // Kurze Pause um Busy-Loop bei persistentem Fehler zu vermeiden
                            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                        }
                    }
                }

                // Shutdown-Signal
                _ = &mut shutdown_rx => {
                    tracing::info!("Audio-Relay: Shutdown-Signal empfangen");
                    break;
                }
            }
        }

        tracing::info!("Audio-Empfangs-Loop beendet");
    }

    // -----------------------------------------------------------------------
    // Internes Datagramm-Processing
    // -----------------------------------------------------------------------

    /// Verarbeitet ein eingehendes UDP-Datagramm
    ///
    /// Hot Path: Minimale Allocations, schneller Pfad bei Fehler (early return).
    async fn datagramm_verarbeiten(&self, daten: &[u8], absender_addr: SocketAddr) {
        self.zaehler.empfangen.fetch_add(1, Ordering::Relaxed);

        // Datagramm dekodieren und validieren
        let datagramm = match AudioDatagram::decode(daten) {
            Ok(d) => d,
            Err(e) => {
                self.zaehler.ungueltig.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    fehler = %e,
                    absender = %absender_addr,
                    "Ungueltiges Audio-Datagramm"
                );
                return;
            }
        };

        // Absenderadresse lernen: wer zuletzt Datagramme mit dieser
        // Quell-ID schickt, gilt als deren erreichbare Adresse
        if !datagramm.quelle.is_empty() {
            self.directory
                .audio_adresse_lernen(&datagramm.quelle, absender_addr);
        }

        // Nur Teilnehmer eines aktiven Anrufs duerfen zueinander senden
        if !self
            .calls
            .ist_aktiver_anruf(&datagramm.quelle, &datagramm.ziel)
        {
            self.zaehler.nicht_autorisiert.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                quelle = %datagramm.quelle,
                ziel = %datagramm.ziel,
                "Datagramm ausserhalb eines aktiven Anrufs verworfen"
            );
            return;
        }

        // Ziel-Adresse aufloesen (gelernt vor angekuendigt)
        let ziel_addr = match self.directory.audio_adresse_aufloesen(&datagramm.ziel) {
            Some(addr) => addr,
            None => {
                self.zaehler.nicht_aufloesbar.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    ziel = %datagramm.ziel,
                    "Ziel-Adresse nicht aufloesbar, Datagramm verworfen"
                );
                return;
            }
        };

        // Header neu aufbauen und unveraendert weiterleiten
        let bytes = datagramm.encode();
        match self.socket.send_to(&bytes, ziel_addr).await {
            Ok(_) => {
                self.zaehler.weitergeleitet.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(
                    quelle = %datagramm.quelle,
                    ziel = %datagramm.ziel,
                    ziel_addr = %ziel_addr,
                    bytes = bytes.len(),
                    "Audio-Datagramm weitergeleitet"
                );
            }
            Err(e) => {
                tracing::warn!(
                    fehler = %e,
                    ziel_addr = %ziel_addr,
                    "UDP-Sendefehler"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
