//! Chat-Handler – Rundruf und Direktnachrichten
//!
//! Reicht Textnachrichten ueber den Broadcaster weiter. Der Server
//! ersetzt das `client_id`-Feld des Absenders durch `from` und setzt
//! einen frischen Timestamp, bevor die Nachricht zugestellt wird.

use fernruf_core::types::{unix_zeit, ClientId};
use fernruf_protocol::control::{BroadcastMessage, PrivateMessage};
use fernruf_protocol::{ControlMessage, ErrorCode};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verarbeitet einen Rundruf an alle anderen Clients
///
/// Gibt `None` zurueck; Rundrufe werden nicht quittiert.
pub fn handle_broadcast(
    request: BroadcastMessage,
    absender: &ClientId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    let weitergeleitet = ControlMessage::Broadcast(BroadcastMessage {
        client_id: None,
        content: request.content,
        from: Some(absender.clone()),
        timestamp: unix_zeit(),
    });

    let empfaenger = state.broadcaster.an_alle_ausser_senden(absender, weitergeleitet);
    tracing::debug!(
        von = %absender,
        empfaenger,
        "Rundruf weitergeleitet"
    );
    None
}

/// Verarbeitet eine Direktnachricht an einen bestimmten Client
///
/// Beim Weiterleiten wird das `target`-Feld entfernt; der Empfaenger
/// erkennt den Absender am `from`-Feld.
pub fn handle_private(
    request: PrivateMessage,
    absender: &ClientId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    let ziel = match request.target {
        Some(ziel) if !ziel.is_empty() => ziel,
        _ => {
            return Some(ControlMessage::fehler(
                ErrorCode::InvalidRequest,
                "Direktnachricht ohne target",
            ));
        }
    };

    if !state.directory.ist_registriert(&ziel) {
        return Some(ControlMessage::fehler(
            ErrorCode::TargetNotFound,
            format!("Client '{}' ist nicht registriert", ziel),
        ));
    }

    let weitergeleitet = ControlMessage::Private(PrivateMessage {
        client_id: None,
        target: None,
        content: request.content,
        from: Some(absender.clone()),
        timestamp: unix_zeit(),
    });

    if state.broadcaster.an_client_senden(&ziel, weitergeleitet) {
        tracing::debug!(von = %absender, an = %ziel, "Direktnachricht zugestellt");
        None
    } else {
        Some(ControlMessage::fehler(
            ErrorCode::TargetOffline,
            format!("Client '{}' ist nicht erreichbar", ziel),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
