//! Session-Handler – Registrierung und Client-Liste
//!
//! Verwaltet den Eintritt eines Clients ins Verzeichnis und beantwortet
//! Anfragen nach der Liste aller registrierten Clients.

use fernruf_core::types::{unix_zeit, ClientId};
use fernruf_protocol::control::{
    ClientListMessage, ClientSummary, RegisterRequest,
};
use fernruf_protocol::{ControlMessage, ErrorCode};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verarbeitet eine Registrierungs-Anfrage
///
/// Traegt den Client ins Verzeichnis ein (Last-Writer-Wins bei
/// doppelter ID) und gibt bei Erfolg die registrierte ID zurueck,
/// damit die Verbindungs-Task sie uebernehmen kann.
pub fn handle_register(
    request: RegisterRequest,
    peer_addr: SocketAddr,
    state: &Arc<SignalingState>,
) -> (Option<ClientId>, ControlMessage) {
    if request.client_id.is_empty() {
        return (
            None,
            ControlMessage::fehler(ErrorCode::InvalidRequest, "client_id darf nicht leer sein"),
        );
    }

    if state.directory.anzahl() >= state.config.max_clients as usize
        && !state.directory.ist_registriert(&request.client_id)
    {
        tracing::warn!(
            client_id = %request.client_id,
            max = state.config.max_clients,
            "Registrierung abgelehnt, Server voll"
        );
        return (
            None,
            ControlMessage::fehler(ErrorCode::InternalError, "Server ist voll"),
        );
    }

    state.directory.registrieren(
        request.client_id.clone(),
        request.client_name,
        peer_addr.ip(),
        request.audio_port,
    );

    (
        Some(request.client_id.clone()),
        ControlMessage::register_erfolg(request.client_id),
    )
}

/// Beantwortet eine Anfrage nach der Client-Liste
///
/// Liefert alle registrierten Clients einschliesslich des Anfragenden;
/// der Client filtert seine eigene ID selbst heraus.
pub fn handle_get_clients(state: &Arc<SignalingState>) -> ControlMessage {
    let mut clients: Vec<ClientSummary> = state
        .directory
        .uebersicht()
        .into_iter()
        .map(|endpoint| ClientSummary {
            id: endpoint.id,
            name: endpoint.name,
            status: endpoint.status,
            last_seen: endpoint.last_seen,
            audio_port: endpoint.audio_port,
        })
        .collect();
    clients.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));

    ControlMessage::ClientList(ClientListMessage {
        clients,
        timestamp: unix_zeit(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::SignalingConfig;
    use fernruf_core::types::EndpointStatus;

    fn test_state() -> Arc<SignalingState> {
        SignalingState::neu(SignalingConfig::default())
    }

    fn register_request(id: &str, port: Option<u16>) -> RegisterRequest {
        RegisterRequest {
            client_id: ClientId::new(id),
            client_name: id.to_uppercase(),
            audio_port: port,
            timestamp: unix_zeit(),
        }
    }

    fn localhost() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    #[test]
    fn register_traegt_client_ein() {
        let state = test_state();
        let (client_id, antwort) =
            handle_register(register_request("alice", Some(40000)), localhost(), &state);

        assert_eq!(client_id.unwrap().as_str(), "alice");
        assert_eq!(antwort.typ(), "register_response");
        assert!(state.directory.ist_registriert(&ClientId::new("alice")));
    }

    #[test]
    fn register_mit_leerer_id_ist_fehler() {
        let state = test_state();
        let (client_id, antwort) =
            handle_register(register_request("", None), localhost(), &state);

        assert!(client_id.is_none());
        assert_eq!(antwort.typ(), "error");
        assert_eq!(state.directory.anzahl(), 0);
    }

    #[test]
    fn register_bei_vollem_server_abgelehnt() {
        let state = SignalingState::neu(SignalingConfig {
            max_clients: 1,
            ..SignalingConfig::default()
        });

        let (erste, _) = handle_register(register_request("alice", None), localhost(), &state);
        assert!(erste.is_some());

        let (zweite, antwort) =
            handle_register(register_request("bob", None), localhost(), &state);
        assert!(zweite.is_none());
        assert_eq!(antwort.typ(), "error");
    }

    #[test]
    fn erneute_registrierung_zaehlt_nicht_gegen_limit() {
        let state = SignalingState::neu(SignalingConfig {
            max_clients: 1,
            ..SignalingConfig::default()
        });

        handle_register(register_request("alice", None), localhost(), &state);
        let (wieder, _) = handle_register(register_request("alice", None), localhost(), &state);
        assert!(wieder.is_some(), "Reconnect derselben ID muss moeglich sein");
    }

    #[test]
    fn client_liste_sortiert_und_vollstaendig() {
        let state = test_state();
        handle_register(register_request("bob", Some(40001)), localhost(), &state);
        handle_register(register_request("alice", None), localhost(), &state);

        let antwort = handle_get_clients(&state);
        match antwort {
            ControlMessage::ClientList(liste) => {
                assert_eq!(liste.clients.len(), 2);
                assert_eq!(liste.clients[0].id.as_str(), "alice");
                assert_eq!(liste.clients[1].id.as_str(), "bob");
                assert_eq!(liste.clients[0].status, EndpointStatus::Online);
                assert_eq!(liste.clients[1].audio_port, Some(40001));
            }
            andere => panic!("ClientList erwartet, war {}", andere.typ()),
        }
    }
}
