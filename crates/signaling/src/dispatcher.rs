//! Message-Dispatcher – Routet ControlMessages an die richtigen Handler
//!
//! Der Dispatcher empfaengt ControlMessages von einer ClientConnection,
//! bestimmt den richtigen Handler und gibt die Antwort zurueck.
//!
//! ## Zustandspruefung
//! `register` ist jederzeit erlaubt; alle anderen Anfragen setzen eine
//! registrierte Verbindung voraus und vermerken Aktivitaet im
//! Verzeichnis, bevor sie geroutet werden.

use fernruf_core::types::{unix_zeit, ClientId};
use fernruf_protocol::control::CallHangupMessage;
use fernruf_protocol::{ControlMessage, ErrorCode};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::handlers::{
    call_handler, chat_handler, room_handler, session_handler, status_handler,
};
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    /// Peer-Adresse der TCP-Verbindung
    pub peer_addr: SocketAddr,
    /// Registrierte Client-ID (None vor dem Register)
    pub client_id: Option<ClientId>,
}

impl DispatcherContext {
    pub fn neu(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            client_id: None,
        }
    }
}

/// Zentraler Message-Dispatcher
///
/// Routet eingehende ControlMessages an die entsprechenden Handler und
/// gibt die Antwort-ControlMessage zurueck.
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende ControlMessage und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine Antwort gesendet werden soll
    /// (Weiterleitungen laufen ueber den EventBroadcaster, nicht ueber
    /// den Rueckkanal des Absenders).
    pub fn dispatch(
        &self,
        message: ControlMessage,
        ctx: &mut DispatcherContext,
    ) -> Option<ControlMessage> {
        match message {
            // -------------------------------------------------------------------
            // Registrierung (immer erlaubt)
            // -------------------------------------------------------------------
            ControlMessage::Register(req) => {
                let (registriert, antwort) =
                    session_handler::handle_register(req, ctx.peer_addr, &self.state);

                if let Some(neue_id) = registriert {
                    // Registriert sich dieselbe Verbindung unter neuer ID,
                    // raeumt der alte Eintrag komplett ab
                    if let Some(alte_id) = ctx.client_id.take() {
                        if alte_id != neue_id {
                            self.client_cleanup(&alte_id);
                        }
                    }
                    ctx.client_id = Some(neue_id);
                }

                Some(antwort)
            }

            // -------------------------------------------------------------------
            // Server->Client Nachrichten vom Client sind Protokollfehler
            // -------------------------------------------------------------------
            ControlMessage::RegisterResponse(_)
            | ControlMessage::ClientList(_)
            | ControlMessage::StatusResponse(_)
            | ControlMessage::Error(_) => {
                tracing::warn!(
                    peer = %ctx.peer_addr,
                    typ = message.typ(),
                    "Unerwartete Server->Client Nachricht vom Client empfangen"
                );
                Some(ControlMessage::fehler(
                    ErrorCode::InvalidRequest,
                    "Unerwartete Nachricht",
                ))
            }

            // -------------------------------------------------------------------
            // Registrierung erfordernde Nachrichten
            // -------------------------------------------------------------------
            nachricht => {
                let client_id = match &ctx.client_id {
                    Some(id) => id.clone(),
                    None => {
                        return Some(ControlMessage::fehler(
                            ErrorCode::NotRegistered,
                            "Nicht registriert – bitte zuerst register senden",
                        ));
                    }
                };

                self.state.directory.aktivitaet_vermerken(&client_id);
                self.dispatch_registriert(nachricht, &client_id)
            }
        }
    }

    /// Routet Nachrichten die eine Registrierung erfordern
    fn dispatch_registriert(
        &self,
        message: ControlMessage,
        client_id: &ClientId,
    ) -> Option<ControlMessage> {
        match message {
            ControlMessage::GetClients(_) => {
                Some(session_handler::handle_get_clients(&self.state))
            }

            ControlMessage::Broadcast(req) => {
                chat_handler::handle_broadcast(req, client_id, &self.state)
            }

            ControlMessage::Private(req) => {
                chat_handler::handle_private(req, client_id, &self.state)
            }

            ControlMessage::CallRequest(req) => {
                call_handler::handle_call_request(req, client_id, &self.state)
            }

            ControlMessage::CallAnswer(req) => {
                call_handler::handle_call_answer(req, client_id, &self.state)
            }

            ControlMessage::CallHangup(req) => {
                call_handler::handle_call_hangup(req, client_id, &self.state)
            }

            ControlMessage::JoinRoom(req) => {
                room_handler::handle_join_room(req, client_id, &self.state)
            }

            ControlMessage::LeaveRoom(req) => {
                room_handler::handle_leave_room(req, client_id, &self.state)
            }

            ControlMessage::GetStatus(_) => Some(status_handler::handle_get_status(&self.state)),

            // Oben bereits behandelt
            ControlMessage::Register(_)
            | ControlMessage::RegisterResponse(_)
            | ControlMessage::ClientList(_)
            | ControlMessage::StatusResponse(_)
            | ControlMessage::Error(_) => None,
        }
    }

    /// Bereinigt alle Ressourcen eines Clients beim Trennen
    ///
    /// Laufende und klingelnde Anrufe werden aufgelegt und die jeweilige
    /// Gegenseite benachrichtigt, bevor Verzeichnis, Raeume und
    /// Broadcaster den Client vergessen.
    pub fn client_cleanup(&self, client_id: &ClientId) {
        for anruf in self.state.calls.anrufe_von(client_id) {
            if self.state.calls.auflegen(&anruf.id, client_id).is_none() {
                continue;
            }
            if let Some(gegenseite) = anruf.anderer_teilnehmer(client_id) {
                let benachrichtigung = ControlMessage::CallHangup(CallHangupMessage {
                    client_id: None,
                    call_id: anruf.id.clone(),
                    from: Some(client_id.clone()),
                    timestamp: unix_zeit(),
                });
                self.state
                    .broadcaster
                    .an_client_senden(&gegenseite, benachrichtigung);
            }
        }

        self.state.rooms.client_entfernen(client_id);
        self.state.broadcaster.client_entfernen(client_id);
        self.state.directory.entfernen(client_id);

        tracing::debug!(client_id = %client_id, "Client-Ressourcen bereinigt");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
