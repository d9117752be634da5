//! Raum-Handler – Beitreten und Verlassen
//!
//! Raeume sind reine Mitgliedsmengen ohne eigene Nachrichtenzustellung;
//! Beitritt und Austritt sind idempotent und werden nicht quittiert.

use fernruf_core::types::ClientId;
use fernruf_protocol::control::{JoinRoomMessage, LeaveRoomMessage};
use fernruf_protocol::{ControlMessage, ErrorCode};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verarbeitet einen Raum-Beitritt
pub fn handle_join_room(
    request: JoinRoomMessage,
    absender: &ClientId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    if request.room_id.is_empty() {
        return Some(ControlMessage::fehler(
            ErrorCode::InvalidRequest,
            "Raum-Beitritt ohne room_id",
        ));
    }

    let neu = state.rooms.beitreten(&request.room_id, absender.clone());
    tracing::debug!(
        client_id = %absender,
        raum = %request.room_id,
        neu = neu,
        "Raum-Beitritt"
    );
    None
}

/// Verarbeitet einen Raum-Austritt
pub fn handle_leave_room(
    request: LeaveRoomMessage,
    absender: &ClientId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    if request.room_id.is_empty() {
        return Some(ControlMessage::fehler(
            ErrorCode::InvalidRequest,
            "Raum-Austritt ohne room_id",
        ));
    }

    let entfernt = state.rooms.verlassen(&request.room_id, absender);
    tracing::debug!(
        client_id = %absender,
        raum = %request.room_id,
        entfernt = entfernt,
        "Raum-Austritt"
    );
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::SignalingConfig;
    use fernruf_core::types::unix_zeit;

    fn beitritt(raum: &str) -> JoinRoomMessage {
        JoinRoomMessage {
            client_id: None,
            room_id: raum.to_string(),
            timestamp: unix_zeit(),
        }
    }

    fn austritt(raum: &str) -> LeaveRoomMessage {
        LeaveRoomMessage {
            client_id: None,
            room_id: raum.to_string(),
            timestamp: unix_zeit(),
        }
    }

    #[test]
    fn beitritt_und_austritt() {
        let state = SignalingState::neu(SignalingConfig::default());
        let alice = ClientId::new("alice");

        assert!(handle_join_room(beitritt("lobby"), &alice, &state).is_none());
        assert!(state.rooms.ist_mitglied("lobby", &alice));

        assert!(handle_leave_room(austritt("lobby"), &alice, &state).is_none());
        assert!(!state.rooms.ist_mitglied("lobby", &alice));
        assert_eq!(state.rooms.aktive_anzahl(), 0);
    }

    #[test]
    fn doppelter_beitritt_ist_idempotent() {
        let state = SignalingState::neu(SignalingConfig::default());
        let alice = ClientId::new("alice");

        handle_join_room(beitritt("lobby"), &alice, &state);
        handle_join_room(beitritt("lobby"), &alice, &state);

        assert_eq!(state.rooms.mitglieder("lobby").len(), 1);
    }

    #[test]
    fn leere_raum_id_wird_abgewiesen() {
        let state = SignalingState::neu(SignalingConfig::default());
        let alice = ClientId::new("alice");

        match handle_join_room(beitritt(""), &alice, &state).unwrap() {
            ControlMessage::Error(fehler) => assert_eq!(fehler.code, ErrorCode::InvalidRequest),
            andere => panic!("Error erwartet, war {}", andere.typ()),
        }
        match handle_leave_room(austritt(""), &alice, &state).unwrap() {
            ControlMessage::Error(fehler) => assert_eq!(fehler.code, ErrorCode::InvalidRequest),
            andere => panic!("Error erwartet, war {}", andere.typ()),
        }
    }

    #[test]
    fn austritt_aus_fremdem_raum_ist_no_op() {
        let state = SignalingState::neu(SignalingConfig::default());
        let alice = ClientId::new("alice");

        assert!(handle_leave_room(austritt("gibt_es_nicht"), &alice, &state).is_none());
    }
}
