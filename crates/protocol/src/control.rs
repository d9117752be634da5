//! Control-Protokoll (TCP)
//!
//! Definiert alle Steuerungs- und Chat-Nachrichten die ueber die
//! TCP-Verbindung zwischen Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Flaches JSON-Objekt mit `type`-Feld, kein Umschlag: die Zuordnung
//!   von Antworten erfolgt ueber den Nachrichtentyp
//! - Jede Nachricht traegt einen `timestamp` (Unix-Sekunden als f64)
//! - Felder die nur in einer Richtung belegt sind (`client_id` vom Client,
//!   `from` vom Server) sind optional und werden bei `None` nicht
//!   serialisiert

use fernruf_core::types::{unix_zeit, CallId, ClientId, EndpointStatus};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Nachrichten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InternalError,
    InvalidRequest,
    NotRegistered,
    TargetNotFound,
    TargetOffline,
    CallNotFound,
}

// ---------------------------------------------------------------------------
// Registrierung
// ---------------------------------------------------------------------------

/// Registrierungs-Anfrage vom Client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Selbstgewaehlte Client-ID (max. 16 Bytes)
    pub client_id: ClientId,
    /// Anzeigename
    pub client_name: String,
    /// Angekuendigter UDP-Port fuer Audio (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_port: Option<u16>,
    pub timestamp: f64,
}

/// Ergebnis einer Registrierung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterStatus {
    Success,
    Error,
}

/// Antwort des Servers auf eine Registrierung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub status: RegisterStatus,
    pub client_id: ClientId,
    /// Serverzeit zum Zeitpunkt der Registrierung
    pub server_time: f64,
}

// ---------------------------------------------------------------------------
// Client-Liste
// ---------------------------------------------------------------------------

/// Anfrage nach der Liste aller registrierten Clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetClientsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    pub timestamp: f64,
}

/// Eintrag in der Client-Liste
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: ClientId,
    pub name: String,
    pub status: EndpointStatus,
    /// Letzte Aktivitaet (Unix-Sekunden)
    pub last_seen: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_port: Option<u16>,
}

/// Liste aller registrierten Clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientListMessage {
    pub clients: Vec<ClientSummary>,
    pub timestamp: f64,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Rundruf an alle online Clients ausser dem Absender
///
/// Vom Client kommt `client_id`; der Server setzt beim Weiterleiten
/// stattdessen `from` und einen frischen Timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ClientId>,
    pub timestamp: f64,
}

/// Direktnachricht an einen bestimmten Client
///
/// Beim Weiterleiten entfernt der Server das `target`-Feld.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ClientId>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ClientId>,
    pub timestamp: f64,
}

// ---------------------------------------------------------------------------
// Anruf-Signalisierung
// ---------------------------------------------------------------------------

/// Anruf-Anfrage
///
/// Client -> Server: `client_id` + `target`.
/// Server -> Angerufener: `call_id` + `from` (ohne `target`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequestMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ClientId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<CallId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ClientId>,
    pub timestamp: f64,
}

/// Antwort auf einen Anruf (annehmen oder ablehnen)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAnswerMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    pub call_id: CallId,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ClientId>,
    pub timestamp: f64,
}

/// Auflegen eines laufenden oder klingelnden Anrufs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallHangupMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    pub call_id: CallId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ClientId>,
    pub timestamp: f64,
}

// ---------------------------------------------------------------------------
// Raeume
// ---------------------------------------------------------------------------

/// Raum beitreten (reine Mitgliedschafts-Buchhaltung, kein Audio)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    pub room_id: String,
    pub timestamp: f64,
}

/// Raum verlassen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRoomMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    pub room_id: String,
    pub timestamp: f64,
}

// ---------------------------------------------------------------------------
// Server-Status
// ---------------------------------------------------------------------------

/// Anfrage nach dem Server-Status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetStatusRequest {
    pub timestamp: f64,
}

/// Client-Zaehler im Status-Snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusClients {
    pub total: usize,
    pub online: usize,
}

/// Raum-Zaehler im Status-Snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRooms {
    pub active: usize,
}

/// Anruf-Zaehler im Status-Snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCalls {
    pub active: usize,
    pub total: usize,
}

/// Dienst-Verfuegbarkeit im Status-Snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusServices {
    pub message: bool,
    pub audio: bool,
}

/// Vollstaendiger Server-Status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub server_time: f64,
    /// Laufzeit seit Serverstart in Sekunden
    pub uptime: f64,
    pub clients: StatusClients,
    pub rooms: StatusRooms,
    pub calls: StatusCalls,
    pub services: StatusServices,
}

/// Antwort auf eine Status-Anfrage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponseMessage {
    pub status: ServerStatus,
    pub timestamp: f64,
}

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Typisierte Fehler-Nachricht vom Server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: ErrorCode,
    pub message: String,
    pub timestamp: f64,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: ControlMessage
// ---------------------------------------------------------------------------

/// Alle moeglichen Control-Nachrichten (typsicher via Tagged Enum)
///
/// Serialisiert als flaches JSON-Objekt mit `type`-Feld, z.B.
/// `{"type": "register", "client_id": "alice", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    // Registrierung
    Register(RegisterRequest),
    RegisterResponse(RegisterResponse),

    // Client-Liste
    GetClients(GetClientsRequest),
    ClientList(ClientListMessage),

    // Chat
    Broadcast(BroadcastMessage),
    Private(PrivateMessage),

    // Anrufe
    CallRequest(CallRequestMessage),
    CallAnswer(CallAnswerMessage),
    CallHangup(CallHangupMessage),

    // Raeume
    JoinRoom(JoinRoomMessage),
    LeaveRoom(LeaveRoomMessage),

    // Status
    GetStatus(GetStatusRequest),
    StatusResponse(StatusResponseMessage),

    // Fehler
    Error(ErrorMessage),
}

impl ControlMessage {
    /// Erstellt eine Registrierungs-Anfrage
    pub fn register(
        client_id: ClientId,
        client_name: impl Into<String>,
        audio_port: Option<u16>,
    ) -> Self {
        Self::Register(RegisterRequest {
            client_id,
            client_name: client_name.into(),
            audio_port,
            timestamp: unix_zeit(),
        })
    }

    /// Erstellt eine erfolgreiche Registrierungs-Antwort
    pub fn register_erfolg(client_id: ClientId) -> Self {
        Self::RegisterResponse(RegisterResponse {
            status: RegisterStatus::Success,
            client_id,
            server_time: unix_zeit(),
        })
    }

    /// Erstellt eine Fehler-Nachricht
    pub fn fehler(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorMessage {
            code,
            message: message.into(),
            timestamp: unix_zeit(),
        })
    }

    /// Gibt den Wire-Typ der Nachricht zurueck (fuer Logs und Tests)
    pub fn typ(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::RegisterResponse(_) => "register_response",
            Self::GetClients(_) => "get_clients",
            Self::ClientList(_) => "client_list",
            Self::Broadcast(_) => "broadcast",
            Self::Private(_) => "private",
            Self::CallRequest(_) => "call_request",
            Self::CallAnswer(_) => "call_answer",
            Self::CallHangup(_) => "call_hangup",
            Self::JoinRoom(_) => "join_room",
            Self::LeaveRoom(_) => "leave_room",
            Self::GetStatus(_) => "get_status",
            Self::StatusResponse(_) => "status_response",
            Self::Error(_) => "error",
        }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_serialisiert_mit_type_tag() {
        let msg = ControlMessage::register(ClientId::new("alice"), "Alice", Some(40000));
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"register\""));
        assert!(json.contains("\"client_id\":\"alice\""));
        assert!(json.contains("\"audio_port\":40000"));
    }

    #[test]
    fn register_ohne_audio_port_laesst_feld_weg() {
        let msg = ControlMessage::register(ClientId::new("alice"), "Alice", None);
        let json = msg.to_json().unwrap();
        assert!(!json.contains("audio_port"));
    }

    #[test]
    fn weitergeleiteter_call_request_ohne_target() {
        // Server -> Angerufener: nur call_id, from, timestamp
        let msg = ControlMessage::CallRequest(CallRequestMessage {
            client_id: None,
            target: None,
            call_id: Some(CallId::new("alice_bob_1700000000_1")),
            from: Some(ClientId::new("alice")),
            timestamp: 1700000000.5,
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"call_request\""));
        assert!(json.contains("\"call_id\""));
        assert!(json.contains("\"from\":\"alice\""));
        assert!(!json.contains("target"));
        assert!(!json.contains("client_id"));
    }

    #[test]
    fn fehler_code_screaming_snake_case() {
        let msg = ControlMessage::fehler(ErrorCode::TargetOffline, "bob ist nicht online");
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"code\":\"TARGET_OFFLINE\""));
    }

    #[test]
    fn client_list_round_trip() {
        use fernruf_core::types::EndpointStatus;
        let msg = ControlMessage::ClientList(ClientListMessage {
            clients: vec![ClientSummary {
                id: ClientId::new("bob"),
                name: "Bob".into(),
                status: EndpointStatus::Online,
                last_seen: 1700000000.0,
                audio_port: Some(40001),
            }],
            timestamp: 1700000001.0,
        });
        let json = msg.to_json().unwrap();
        let zurueck = ControlMessage::from_json(&json).unwrap();
        match zurueck {
            ControlMessage::ClientList(liste) => {
                assert_eq!(liste.clients.len(), 1);
                assert_eq!(liste.clients[0].id.as_str(), "bob");
                assert_eq!(liste.clients[0].status, EndpointStatus::Online);
            }
            andere => panic!("ClientList erwartet, war {}", andere.typ()),
        }
    }

    #[test]
    fn call_answer_round_trip() {
        let msg = ControlMessage::CallAnswer(CallAnswerMessage {
            client_id: Some(ClientId::new("bob")),
            call_id: CallId::new("alice_bob_1_1"),
            accepted: true,
            from: None,
            timestamp: unix_zeit(),
        });
        let json = msg.to_json().unwrap();
        match ControlMessage::from_json(&json).unwrap() {
            ControlMessage::CallAnswer(a) => assert!(a.accepted),
            andere => panic!("CallAnswer erwartet, war {}", andere.typ()),
        }
    }

    #[test]
    fn status_response_struktur() {
        let msg = ControlMessage::StatusResponse(StatusResponseMessage {
            status: ServerStatus {
                server_time: 1700000000.0,
                uptime: 12.5,
                clients: StatusClients { total: 3, online: 2 },
                rooms: StatusRooms { active: 1 },
                calls: StatusCalls { active: 1, total: 2 },
                services: StatusServices {
                    message: true,
                    audio: true,
                },
            },
            timestamp: 1700000000.0,
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"status_response\""));
        assert!(json.contains("\"uptime\":12.5"));
        assert!(json.contains("\"online\":2"));
    }

    #[test]
    fn unbekannter_typ_ist_fehler() {
        let json = r#"{"type": "unbekannt", "timestamp": 1.0}"#;
        assert!(ControlMessage::from_json(json).is_err());
    }
}
