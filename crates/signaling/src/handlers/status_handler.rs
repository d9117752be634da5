//! Status-Handler – Laufzeit-Snapshot des Servers
//!
//! Baut aus den Tabellen einen konsistenten Zaehler-Snapshot. Die
//! Dienst-Flags sind konstant wahr, weil Nachrichten- und Audio-Pfad
//! im selben Prozess leben und mit ihm starten.

use fernruf_core::types::unix_zeit;
use fernruf_protocol::control::{
    ServerStatus, StatusCalls, StatusClients, StatusResponseMessage, StatusRooms, StatusServices,
};
use fernruf_protocol::ControlMessage;
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Beantwortet eine Status-Anfrage mit dem aktuellen Snapshot
pub fn handle_get_status(state: &Arc<SignalingState>) -> ControlMessage {
    let status = ServerStatus {
        server_time: unix_zeit(),
        uptime: state.uptime_sek(),
        clients: StatusClients {
            total: state.directory.anzahl(),
            online: state.directory.online_anzahl(),
        },
        rooms: StatusRooms {
            active: state.rooms.aktive_anzahl(),
        },
        calls: StatusCalls {
            active: state.calls.aktive_anzahl(),
            total: state.calls.gesamt_anzahl(),
        },
        services: StatusServices {
            message: true,
            audio: true,
        },
    };

    ControlMessage::StatusResponse(StatusResponseMessage {
        status,
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
    use fernruf_core::types::ClientId;

    #[test]
    fn leerer_server_liefert_nullen() {
        let state = SignalingState::neu(SignalingConfig::default());

        match handle_get_status(&state) {
            ControlMessage::StatusResponse(antwort) => {
                assert_eq!(antwort.status.clients.total, 0);
                assert_eq!(antwort.status.clients.online, 0);
                assert_eq!(antwort.status.rooms.active, 0);
                assert_eq!(antwort.status.calls.active, 0);
                assert!(antwort.status.services.message);
                assert!(antwort.status.services.audio);
                assert!(antwort.status.uptime >= 0.0);
            }
            andere => panic!("StatusResponse erwartet, war {}", andere.typ()),
        }
    }

    #[test]
    fn snapshot_spiegelt_tabellen() {
        let state = SignalingState::neu(SignalingConfig::default());
        let alice = ClientId::new("alice");
        let bob = ClientId::new("bob");

        state
            .directory
            .registrieren(alice.clone(), "Alice".into(), "127.0.0.1".parse().unwrap(), None);
        state
            .directory
            .registrieren(bob.clone(), "Bob".into(), "127.0.0.1".parse().unwrap(), None);
        state.rooms.beitreten("lobby", alice.clone());

        let anruf = state.calls.anruf_anfordern(alice, bob);
        state.calls.beantworten(&anruf.id, true);

        match handle_get_status(&state) {
            ControlMessage::StatusResponse(antwort) => {
                assert_eq!(antwort.status.clients.total, 2);
                assert_eq!(antwort.status.clients.online, 2);
                assert_eq!(antwort.status.rooms.active, 1);
                assert_eq!(antwort.status.calls.active, 1);
                assert_eq!(antwort.status.calls.total, 1);
            }
            andere => panic!("StatusResponse erwartet, war {}", andere.typ()),
        }
    }
}
