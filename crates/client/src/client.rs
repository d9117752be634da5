//! VoipClient – oeffentliche Client-API
//!
//! Buendelt Steuerverbindung, Sitzungszustand und Audio-Transport.
//! Anfragen mit Antwort (register, get_clients) warten befristet auf
//! die passende Nachricht; alles andere, was waehrenddessen eintrifft,
//! wird zwischengespeichert und spaeter ueber [`naechstes_ereignis`]
//! ausgeliefert. Server-Pushes treiben den Anruf-Lebenszyklus: eine
//! angenommene Antwort startet den Audio-Transport, ein beobachtetes
//! Auflegen stoppt ihn.
//!
//! [`naechstes_ereignis`]: VoipClient::naechstes_ereignis

use fernruf_audio::{AudioPipeline, AudioSettings, OutputHistory};
use fernruf_core::types::{unix_zeit, CallId, ClientId};
use fernruf_core::{FernrufError, Result};
use fernruf_protocol::control::{
    BroadcastMessage, CallAnswerMessage, CallHangupMessage, CallRequestMessage, ClientSummary,
    ErrorMessage, GetClientsRequest, PrivateMessage, RegisterStatus,
};
use fernruf_protocol::{ControlMessage, ErrorCode};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::audio_link::CallAudio;
use crate::connection::ControlLink;
use crate::state::ClientSessionState;

/// Standard-Frist fuer Antworten auf eigene Anfragen
const ANTWORT_FRIST: Duration = Duration::from_secs(5);

/// Groesse der App-seitigen Audio-Queues (Chunks)
pub const AUDIO_QUEUE_GROESSE: usize = 8;

// ---------------------------------------------------------------------------
// AudioAnschluss
// ---------------------------------------------------------------------------

/// App-Seite der Audio-Kanaele
///
/// Die Anwendung speist aufgenommene Chunks in `capture_tx` ein und
/// holt abzuspielende Chunks aus `playback_rx`. Der Client bedient die
/// Gegenseiten nur waehrend eines aktiven Anrufs.
pub struct AudioAnschluss {
    pub capture_tx: mpsc::Sender<Vec<f32>>,
    pub playback_rx: mpsc::Receiver<Vec<f32>>,
}

// ---------------------------------------------------------------------------
// VoipClient
// ---------------------------------------------------------------------------

/// Verbundener Fernruf-Client
pub struct VoipClient {
    id: ClientId,
    name: String,
    link: ControlLink,
    ereignisse: mpsc::Receiver<ControlMessage>,
    /// Waehrend einer Antwort-Wartezeit eingetroffene Pushes
    zwischenspeicher: VecDeque<ControlMessage>,
    state: ClientSessionState,
    antwort_frist: Duration,

    // Audio-Seite
    socket: Arc<UdpSocket>,
    relay_adresse: SocketAddr,
    pipeline: Arc<Mutex<AudioPipeline>>,
    capture: Arc<tokio::sync::Mutex<mpsc::Receiver<Vec<f32>>>>,
    playback_tx: mpsc::Sender<Vec<f32>>,
    audio: Option<CallAudio>,
}

impl VoipClient {
    /// Verbindet sich mit dem Server und bindet den Audio-Socket
    ///
    /// Die Client-ID wird generiert (8 Hex-Zeichen einer v4-UUID); der
    /// UDP-Socket bekommt einen ephemeren Port, der bei `registrieren`
    /// angekuendigt wird.
    pub async fn verbinden(
        host: &str,
        tcp_port: u16,
        udp_port: u16,
        name: impl Into<String>,
    ) -> Result<(Self, AudioAnschluss)> {
        let (link, ereignisse) = ControlLink::verbinden(host, tcp_port).await?;

        let relay_adresse = tokio::net::lookup_host((host, udp_port))
            .await
            .map_err(|e| FernrufError::Verbindung(format!("Relay-Adresse: {}", e)))?
            .next()
            .ok_or_else(|| {
                FernrufError::Verbindung(format!("Relay-Adresse nicht aufloesbar: {}", host))
            })?;

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| FernrufError::Verbindung(format!("Audio-Socket: {}", e)))?;

        let (capture_tx, capture_rx) = mpsc::channel(AUDIO_QUEUE_GROESSE);
        let (playback_tx, playback_rx) = mpsc::channel(AUDIO_QUEUE_GROESSE);

        let pipeline = Arc::new(Mutex::new(AudioPipeline::neu(
            AudioSettings::default(),
            OutputHistory::neu(),
        )));

        let client = Self {
            id: ClientId::generate(),
            name: name.into(),
            link,
            ereignisse,
            zwischenspeicher: VecDeque::new(),
            state: ClientSessionState::neu(),
            antwort_frist: ANTWORT_FRIST,
            socket: Arc::new(socket),
            relay_adresse,
            pipeline,
            capture: Arc::new(tokio::sync::Mutex::new(capture_rx)),
            playback_tx,
            audio: None,
        };

        Ok((
            client,
            AudioAnschluss {
                capture_tx,
                playback_rx,
            },
        ))
    }

    // -----------------------------------------------------------------------
    // Sitzung
    // -----------------------------------------------------------------------

    /// Registriert den Client und wartet auf die Bestaetigung
    pub async fn registrieren(&mut self) -> Result<()> {
        let audio_port = self.audio_port()?;
        let anfrage = ControlMessage::register(self.id.clone(), self.name.clone(), Some(audio_port));
        self.link.senden(anfrage).await?;

        let antwort = self
            .antwort_erwarten("register_response", |m| {
                matches!(m, ControlMessage::RegisterResponse(_))
            })
            .await?;

        match antwort {
            ControlMessage::RegisterResponse(resp) if resp.status == RegisterStatus::Success => {
                tracing::info!(client_id = %resp.client_id, "Registrierung erfolgreich");
                Ok(())
            }
            ControlMessage::RegisterResponse(_) => {
                Err(FernrufError::Verbindung("Registrierung abgelehnt".into()))
            }
            andere => Err(FernrufError::UngueltigeNachricht(format!(
                "register_response erwartet, war {}",
                andere.typ()
            ))),
        }
    }

    /// Fordert die Client-Liste an (befristet)
    ///
    /// Bleibt die Antwort aus, kommt der letzte lokale Stand zurueck
    /// statt eines Fehlers; ob der veraltet ist, verraet
    /// [`ClientSessionState::verzeichnis_ist_veraltet`]. Der eigene
    /// Eintrag ist immer herausgefiltert.
    pub async fn client_liste_anfordern(&mut self) -> Result<Vec<ClientSummary>> {
        let anfrage = ControlMessage::GetClients(GetClientsRequest {
            client_id: Some(self.id.clone()),
            timestamp: unix_zeit(),
        });
        self.link.senden(anfrage).await?;

        match self
            .antwort_erwarten("client_list", |m| matches!(m, ControlMessage::ClientList(_)))
            .await
        {
            // ereignis_verarbeiten hat den Cache bereits uebernommen
            Ok(_) => Ok(self.state.verzeichnis_ohne(&self.id)),
            Err(FernrufError::Zeitlimit(_)) => {
                tracing::warn!(
                    veraltet = self.state.verzeichnis_ist_veraltet(),
                    "client_list-Antwort ueberfaellig, lokaler Stand wird verwendet"
                );
                Ok(self.state.verzeichnis_ohne(&self.id))
            }
            Err(e) => Err(e),
        }
    }

    // -----------------------------------------------------------------------
    // Anrufe
    // -----------------------------------------------------------------------

    /// Fragt einen Anruf an
    ///
    /// Die Zusage oder Absage kommt spaeter als `call_answer`-Ereignis;
    /// erst dort erfaehrt der Anrufer die `call_id`. Ein zweiter Anruf
    /// waehrend ein Anruf laeuft wird lokal abgelehnt.
    pub async fn anrufen(&mut self, ziel: &ClientId) -> Result<()> {
        self.state.ausgehend_vermerken(ziel.clone())?;

        let anfrage = ControlMessage::CallRequest(CallRequestMessage {
            client_id: Some(self.id.clone()),
            target: Some(ziel.clone()),
            call_id: None,
            from: None,
            timestamp: unix_zeit(),
        });
        if let Err(e) = self.link.senden(anfrage).await {
            self.state.ausgehend_abbrechen();
            return Err(e);
        }

        tracing::info!(ziel = %ziel, "Anruf angefragt");
        Ok(())
    }

    /// Nimmt ein klingelndes Angebot an und startet den Audio-Transport
    pub async fn annehmen(&mut self, call_id: &CallId) -> Result<()> {
        self.state.frei_fuer_anruf()?;
        let von = self
            .state
            .angebot_entnehmen(call_id)
            .ok_or_else(|| FernrufError::AnrufNichtGefunden(call_id.as_str().to_string()))?;

        let antwort = ControlMessage::CallAnswer(CallAnswerMessage {
            client_id: Some(self.id.clone()),
            call_id: call_id.clone(),
            accepted: true,
            from: None,
            timestamp: unix_zeit(),
        });
        if let Err(e) = self.link.senden(antwort).await {
            self.state.angebot_vermerken(call_id.clone(), von);
            return Err(e);
        }

        self.state.anruf_aktiv_setzen(call_id.clone(), von.clone());
        self.audio_starten(von);
        tracing::info!(call_id = %call_id, "Anruf angenommen");
        Ok(())
    }

    /// Lehnt ein klingelndes Angebot ab
    pub async fn ablehnen(&mut self, call_id: &CallId) -> Result<()> {
        self.state
            .angebot_entnehmen(call_id)
            .ok_or_else(|| FernrufError::AnrufNichtGefunden(call_id.as_str().to_string()))?;

        let antwort = ControlMessage::CallAnswer(CallAnswerMessage {
            client_id: Some(self.id.clone()),
            call_id: call_id.clone(),
            accepted: false,
            from: None,
            timestamp: unix_zeit(),
        });
        self.link.senden(antwort).await?;
        tracing::info!(call_id = %call_id, "Anruf abgelehnt");
        Ok(())
    }

    /// Legt den aktiven Anruf auf
    pub async fn auflegen(&mut self) -> Result<()> {
        let anruf = self.state.anruf_beenden().ok_or_else(|| {
            FernrufError::AnrufNichtGefunden("kein aktiver Anruf".to_string())
        })?;
        self.audio_stoppen().await;

        let nachricht = ControlMessage::CallHangup(CallHangupMessage {
            client_id: Some(self.id.clone()),
            call_id: anruf.call_id.clone(),
            from: None,
            timestamp: unix_zeit(),
        });
        self.link.senden(nachricht).await?;
        tracing::info!(call_id = %anruf.call_id, "Anruf aufgelegt");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    /// Sendet einen Rundruf an alle anderen Clients
    pub async fn rundruf_senden(&mut self, inhalt: impl Into<String>) -> Result<()> {
        self.link
            .senden(ControlMessage::Broadcast(BroadcastMessage {
                client_id: Some(self.id.clone()),
                content: inhalt.into(),
                from: None,
                timestamp: unix_zeit(),
            }))
            .await
    }

    /// Sendet eine Direktnachricht an einen Client
    pub async fn direkt_senden(
        &mut self,
        ziel: &ClientId,
        inhalt: impl Into<String>,
    ) -> Result<()> {
        self.link
            .senden(ControlMessage::Private(PrivateMessage {
                client_id: Some(self.id.clone()),
                target: Some(ziel.clone()),
                content: inhalt.into(),
                from: None,
                timestamp: unix_zeit(),
            }))
            .await
    }

    // -----------------------------------------------------------------------
    // Ereignisse
    // -----------------------------------------------------------------------

    /// Liefert das naechste Server-Ereignis
    ///
    /// `None` bedeutet: Verbindung beendet. Anruf-relevante Ereignisse
    /// sind beim Eintreffen bereits in den Sitzungszustand eingeflossen.
    pub async fn naechstes_ereignis(&mut self) -> Option<ControlMessage> {
        if let Some(nachricht) = self.zwischenspeicher.pop_front() {
            return Some(nachricht);
        }
        match self.ereignisse.recv().await {
            Some(nachricht) => {
                self.ereignis_verarbeiten(&nachricht).await;
                Some(nachricht)
            }
            None => None,
        }
    }

    /// Aktualisiert den Sitzungszustand anhand eines Server-Pushes
    async fn ereignis_verarbeiten(&mut self, nachricht: &ControlMessage) {
        match nachricht {
            ControlMessage::CallRequest(msg) => {
                if let (Some(call_id), Some(von)) = (&msg.call_id, &msg.from) {
                    tracing::info!(call_id = %call_id, von = %von, "Eingehender Anruf");
                    self.state.angebot_vermerken(call_id.clone(), von.clone());
                }
            }
            ControlMessage::CallAnswer(msg) => {
                let erwartet = self.state.ausgehend().cloned();
                match (&msg.from, erwartet) {
                    (Some(von), Some(ziel)) if *von == ziel => {
                        if msg.accepted {
                            tracing::info!(
                                call_id = %msg.call_id,
                                gegenstelle = %von,
                                "Anruf angenommen"
                            );
                            self.state
                                .anruf_aktiv_setzen(msg.call_id.clone(), von.clone());
                            self.audio_starten(von.clone());
                        } else {
                            tracing::info!(gegenstelle = %von, "Anruf abgelehnt");
                            self.state.ausgehend_abbrechen();
                        }
                    }
                    _ => {}
                }
            }
            ControlMessage::CallHangup(msg) => {
                if self.state.ist_aktueller_anruf(&msg.call_id) {
                    tracing::info!(call_id = %msg.call_id, "Gegenseite hat aufgelegt");
                    self.state.anruf_beenden();
                    self.audio_stoppen().await;
                } else if self.state.angebot_verwerfen(&msg.call_id) {
                    tracing::debug!(call_id = %msg.call_id, "Klingelndes Angebot zurueckgezogen");
                }
            }
            ControlMessage::ClientList(liste) => {
                self.state.verzeichnis_uebernehmen(liste.clients.clone());
            }
            // Ziel-Fehler kommen nur als Antwort auf eine Anfrage; solange
            // eine Anruf-Anfrage offen ist, gilt der Fehler als deren Absage.
            ControlMessage::Error(fehler)
                if matches!(
                    fehler.code,
                    ErrorCode::TargetNotFound | ErrorCode::TargetOffline
                ) =>
            {
                if let Some(ziel) = self.state.ausgehend_abbrechen() {
                    tracing::warn!(
                        code = ?fehler.code,
                        ziel = %ziel,
                        "Anruf-Anfrage vom Server abgewiesen"
                    );
                }
            }
            _ => {}
        }
    }

    /// Wartet befristet auf eine Nachricht, die `passt` erfuellt
    ///
    /// Nicht passende Nachrichten landen im Zwischenspeicher; eine
    /// Server-Fehlernachricht beendet die Wartezeit als Fehler.
    async fn antwort_erwarten<F>(&mut self, was: &str, passt: F) -> Result<ControlMessage>
    where
        F: Fn(&ControlMessage) -> bool,
    {
        let frist = tokio::time::Instant::now() + self.antwort_frist;
        loop {
            let rest = frist.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(rest, self.ereignisse.recv()).await {
                Ok(Some(nachricht)) => {
                    self.ereignis_verarbeiten(&nachricht).await;
                    if passt(&nachricht) {
                        return Ok(nachricht);
                    }
                    if let ControlMessage::Error(fehler) = nachricht {
                        return Err(server_fehler(fehler));
                    }
                    self.zwischenspeicher.push_back(nachricht);
                }
                Ok(None) => {
                    return Err(FernrufError::Getrennt(
                        "Server hat die Verbindung beendet".to_string(),
                    ))
                }
                Err(_) => return Err(FernrufError::Zeitlimit(was.to_string())),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Audio-Lebenszyklus
    // -----------------------------------------------------------------------

    fn audio_starten(&mut self, gegenstelle: ClientId) {
        if self.audio.is_some() {
            return;
        }
        self.audio = Some(CallAudio::starten(
            Arc::clone(&self.socket),
            self.relay_adresse,
            self.id.clone(),
            gegenstelle,
            Arc::clone(&self.pipeline),
            Arc::clone(&self.capture),
            self.playback_tx.clone(),
        ));
    }

    async fn audio_stoppen(&mut self) {
        if let Some(audio) = self.audio.take() {
            audio.stoppen().await;
        }
    }

    // -----------------------------------------------------------------------
    // Zugriff & Konfiguration
    // -----------------------------------------------------------------------

    /// Eigene Client-ID
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Lokaler Sitzungszustand (Verzeichnis-Cache, Angebote, Anruf)
    pub fn sitzung(&self) -> &ClientSessionState {
        &self.state
    }

    /// Prueft ob der Audio-Transport gerade laeuft
    pub fn audio_laeuft(&self) -> bool {
        self.audio.is_some()
    }

    /// Ephemerer UDP-Port des Audio-Sockets
    pub fn audio_port(&self) -> Result<u16> {
        Ok(self
            .socket
            .local_addr()
            .map_err(|e| FernrufError::Intern(e.to_string()))?
            .port())
    }

    /// Aktuelle Audio-Einstellungen
    pub fn einstellungen(&self) -> AudioSettings {
        self.pipeline.lock().einstellungen().clone()
    }

    /// Ersetzt die Audio-Einstellungen (wirkt ab dem naechsten Chunk)
    pub fn einstellungen_setzen(&self, einstellungen: AudioSettings) {
        self.pipeline.lock().einstellungen_setzen(einstellungen);
    }

    /// Setzt die Antwort-Frist fuer register und get_clients
    pub fn antwort_frist_setzen(&mut self, frist: Duration) {
        self.antwort_frist = frist;
    }

    /// Beendet Audio und schliesst die Steuerverbindung
    pub async fn trennen(&mut self) {
        self.audio_stoppen().await;
        self.state.anruf_beenden();
        self.link.schliessen().await;
    }
}

/// Uebersetzt eine Server-Fehlernachricht in den passenden Fehlertyp
fn server_fehler(fehler: ErrorMessage) -> FernrufError {
    match fehler.code {
        ErrorCode::TargetNotFound => FernrufError::ClientNichtGefunden(fehler.message),
        ErrorCode::TargetOffline => FernrufError::ClientOffline(fehler.message),
        ErrorCode::CallNotFound => FernrufError::AnrufNichtGefunden(fehler.message),
        ErrorCode::NotRegistered | ErrorCode::InvalidRequest => {
            FernrufError::UngueltigeNachricht(fehler.message)
        }
        ErrorCode::InternalError => FernrufError::Intern(fehler.message),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
