//! Audio-Transport waehrend eines aktiven Anrufs
//!
//! Zwei Tasks verbinden die App-seitigen Audio-Kanaele mit dem
//! UDP-Socket:
//!
//! ```text
//! capture_rx --> Pipeline (Sendekette) --> Datagramm --> Relay
//! Relay --> Datagramm --> Pipeline (Empfangskette) --> playback_tx
//! ```
//!
//! Beide Loops teilen sich die Pipeline ueber ein Mutex und werden pro
//! Chunk kurz gesperrt; die Empfangsseite fuellt dabei die Historie,
//! aus der die Sendeseite ihr Echo-Referenzsignal liest. Das erste
//! gesendete Datagramm lehrt das Relay nebenbei die oeffentliche
//! Adresse dieses Clients.

use fernruf_audio::{bytes_zu_samples, samples_zu_bytes, AudioPipeline};
use fernruf_core::types::ClientId;
use fernruf_protocol::datagram::AudioDatagram;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Maximale UDP-Paketgroesse (Header 32 + 1024 Samples a 2 Bytes + Puffer)
const UDP_BUFFER_SIZE: usize = 4096;

/// Laufender Audio-Transport eines Anrufs
///
/// `starten` spawnt Sende- und Empfangs-Loop, `stoppen` beendet beide
/// und setzt die Pipeline (inklusive Ausgabe-Historie) zurueck.
pub struct CallAudio {
    stopp_tx: watch::Sender<bool>,
    sende_task: JoinHandle<()>,
    empfangs_task: JoinHandle<()>,
    pipeline: Arc<Mutex<AudioPipeline>>,
}

impl CallAudio {
    /// Startet beide Audio-Loops fuer einen aktiven Anruf
    #[allow(clippy::too_many_arguments)]
    pub fn starten(
        socket: Arc<UdpSocket>,
        relay_adresse: SocketAddr,
        absender: ClientId,
        gegenstelle: ClientId,
        pipeline: Arc<Mutex<AudioPipeline>>,
        capture: Arc<tokio::sync::Mutex<mpsc::Receiver<Vec<f32>>>>,
        playback_tx: mpsc::Sender<Vec<f32>>,
    ) -> Self {
        let (stopp_tx, stopp_rx) = watch::channel(false);

        let sende_task = tokio::spawn(sende_loop(
            Arc::clone(&socket),
            relay_adresse,
            absender,
            gegenstelle,
            Arc::clone(&pipeline),
            capture,
            stopp_rx.clone(),
        ));
        let empfangs_task = tokio::spawn(empfangs_loop(
            socket,
            Arc::clone(&pipeline),
            playback_tx,
            stopp_rx,
        ));

        tracing::info!("Audio-Transport gestartet");

        Self {
            stopp_tx,
            sende_task,
            empfangs_task,
            pipeline,
        }
    }

    /// Beendet beide Loops und setzt die Pipeline zurueck
    pub async fn stoppen(self) {
        let _ = self.stopp_tx.send(true);
        let _ = self.sende_task.await;
        let _ = self.empfangs_task.await;

        // Erst nach dem Loop-Ende, damit kein Task mehr in die Historie schreibt
        self.pipeline.lock().zuruecksetzen();
        tracing::info!("Audio-Transport gestoppt");
    }
}

/// Capture-Kanal -> Sendekette -> Relay
///
/// Der Capture-Receiver bleibt fuer die Dauer des Anrufs gesperrt und
/// wird beim Loop-Ende fuer den naechsten Anruf wieder frei.
async fn sende_loop(
    socket: Arc<UdpSocket>,
    relay_adresse: SocketAddr,
    absender: ClientId,
    gegenstelle: ClientId,
    pipeline: Arc<Mutex<AudioPipeline>>,
    capture: Arc<tokio::sync::Mutex<mpsc::Receiver<Vec<f32>>>>,
    mut stopp_rx: watch::Receiver<bool>,
) {
    let mut capture = capture.lock().await;

    loop {
        tokio::select! {
            chunk = capture.recv() => {
                match chunk {
                    Some(mut samples) => {
                        let senden = pipeline.lock().senden_verarbeiten(&mut samples);
                        if !senden {
                            continue;
                        }

                        let datagramm = AudioDatagram::neu(
                            absender.clone(),
                            gegenstelle.clone(),
                            samples_zu_bytes(&samples),
                        );
                        if let Err(e) = socket.send_to(&datagramm.encode(), relay_adresse).await {
                            tracing::warn!(fehler = %e, "Audio-Senden fehlgeschlagen");
                        }
                    }
                    None => {
                        tracing::debug!("Capture-Kanal geschlossen");
                        break;
                    }
                }
            }

            Ok(()) = stopp_rx.changed() => {
                if *stopp_rx.borrow() {
                    break;
                }
            }
        }
    }
}

/// Relay -> Empfangskette -> Playback-Kanal
async fn empfangs_loop(
    socket: Arc<UdpSocket>,
    pipeline: Arc<Mutex<AudioPipeline>>,
    playback_tx: mpsc::Sender<Vec<f32>>,
    mut stopp_rx: watch::Receiver<bool>,
) {
    let mut buf = [0u8; UDP_BUFFER_SIZE];

    loop {
        tokio::select! {
            ergebnis = socket.recv_from(&mut buf) => {
                match ergebnis {
                    Ok((laenge, _von)) => {
                        let datagramm = match AudioDatagram::decode(&buf[..laenge]) {
                            Ok(d) => d,
                            Err(e) => {
                                tracing::debug!(fehler = %e, "Ungueltiges Audio-Datagramm verworfen");
                                continue;
                            }
                        };

                        let mut samples = bytes_zu_samples(&datagramm.payload);
                        pipeline.lock().empfangen_verarbeiten(&mut samples);

                        // Volle Playback-Queue: Chunk verwerfen statt blockieren
                        if playback_tx.try_send(samples).is_err() {
                            tracing::debug!("Playback-Queue voll, Chunk verworfen");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(fehler = %e, "Audio-Empfang fehlgeschlagen");
                        break;
                    }
                }
            }

            Ok(()) = stopp_rx.changed() => {
                if *stopp_rx.borrow() {
                    break;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
