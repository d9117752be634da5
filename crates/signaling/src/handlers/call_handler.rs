//! Anruf-Handler – Anfrage, Antwort, Auflegen
//!
//! Setzt den Anruf-Lebenszyklus auf der Signalisierungs-Ebene um:
//! Anfragen werden an den Angerufenen weitergereicht, Antworten an den
//! Anrufer, Auflegen an die Gegenseite. Der CallCoordinator haelt den
//! Zustand; dieser Handler kuemmert sich um Zustellung und typisierte
//! Fehler.

use fernruf_core::types::{unix_zeit, ClientId};
use fernruf_protocol::control::{CallAnswerMessage, CallHangupMessage, CallRequestMessage};
use fernruf_protocol::{ControlMessage, ErrorCode};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verarbeitet eine Anruf-Anfrage
///
/// Legt bei erreichbarem Ziel einen klingelnden Anruf an und stellt dem
/// Angerufenen `call_request{call_id, from}` zu. Der Anrufer erhaelt
/// keine Quittung; er erfaehrt die `call_id` aus der Antwort des
/// Angerufenen.
pub fn handle_call_request(
    request: CallRequestMessage,
    absender: &ClientId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    let ziel = match request.target {
        Some(ziel) if !ziel.is_empty() => ziel,
        _ => {
            return Some(ControlMessage::fehler(
                ErrorCode::InvalidRequest,
                "Anruf-Anfrage ohne target",
            ));
        }
    };

    if !state.directory.ist_registriert(&ziel) {
        return Some(ControlMessage::fehler(
            ErrorCode::TargetNotFound,
            format!("Client '{}' ist nicht registriert", ziel),
        ));
    }
    if !state.directory.ist_online(&ziel) {
        return Some(ControlMessage::fehler(
            ErrorCode::TargetOffline,
            format!("Client '{}' ist nicht online", ziel),
        ));
    }

    let anruf = state.calls.anruf_anfordern(absender.clone(), ziel.clone());

    let weitergeleitet = ControlMessage::CallRequest(CallRequestMessage {
        client_id: None,
        target: None,
        call_id: Some(anruf.id.clone()),
        from: Some(absender.clone()),
        timestamp: unix_zeit(),
    });

    if state.broadcaster.an_client_senden(&ziel, weitergeleitet) {
        None
    } else {
        // Queue weg zwischen Online-Pruefung und Zustellung:
        // klingelnden Anruf wieder entfernen
        state.calls.beantworten(&anruf.id, false);
        Some(ControlMessage::fehler(
            ErrorCode::TargetOffline,
            format!("Client '{}' ist nicht erreichbar", ziel),
        ))
    }
}

/// Verarbeitet die Antwort auf einen klingelnden Anruf
///
/// Annahme schaltet den Anruf aktiv, Ablehnung entfernt ihn; in beiden
/// Faellen wird der Anrufer benachrichtigt. Eine Antwort auf eine
/// unbekannte `call_id` ergibt einen typisierten Fehler, eine zweite
/// Antwort auf einen bereits geschalteten Anruf ist ein stilles No-Op.
pub fn handle_call_answer(
    request: CallAnswerMessage,
    absender: &ClientId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    match state.calls.beantworten(&request.call_id, request.accepted) {
        Some(anruf) => {
            let weitergeleitet = ControlMessage::CallAnswer(CallAnswerMessage {
                client_id: None,
                call_id: anruf.id.clone(),
                accepted: request.accepted,
                from: Some(absender.clone()),
                timestamp: unix_zeit(),
            });
            if !state.broadcaster.an_client_senden(&anruf.anrufer, weitergeleitet) {
                tracing::warn!(
                    call_id = %anruf.id,
                    anrufer = %anruf.anrufer,
                    "Anrufer fuer Antwort nicht erreichbar"
                );
            }
            None
        }
        None if state.calls.anruf(&request.call_id).is_some() => {
            // Anruf existiert, ist aber nicht mehr klingelnd
            tracing::debug!(call_id = %request.call_id, "Antwort auf bereits geschalteten Anruf");
            None
        }
        None => Some(ControlMessage::fehler(
            ErrorCode::CallNotFound,
            format!("Anruf '{}' ist nicht bekannt", request.call_id),
        )),
    }
}

/// Verarbeitet das Auflegen eines Anrufs
///
/// Nur Teilnehmer koennen auflegen; die Gegenseite wird benachrichtigt.
/// Auflegen auf eine unbekannte oder bereits beendete `call_id` ist ein
/// stilles No-Op, damit sich kreuzende Hangups keine Fehler ausloesen.
pub fn handle_call_hangup(
    request: CallHangupMessage,
    absender: &ClientId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    if let Some(anruf) = state.calls.auflegen(&request.call_id, absender) {
        if let Some(gegenseite) = anruf.anderer_teilnehmer(absender) {
            let benachrichtigung = ControlMessage::CallHangup(CallHangupMessage {
                client_id: None,
                call_id: anruf.id.clone(),
                from: Some(absender.clone()),
                timestamp: unix_zeit(),
            });
            state.broadcaster.an_client_senden(&gegenseite, benachrichtigung);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
