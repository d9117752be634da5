//! Gemeinsame Identifikationstypen fuer Fernruf
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Anders als
//! UUID-basierte IDs sind Fernruf-IDs kurze UTF-8-Strings, weil sie
//! unveraendert in den 16-Byte-Feldern des Audio-Headers landen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximale Laenge einer Client-ID in Bytes (Breite des Header-Felds)
pub const CLIENT_ID_MAX_BYTES: usize = 16;

/// Eindeutige Client-ID (Endpoint-Kennung)
///
/// Wird bei der Registrierung vom Client mitgebracht oder via
/// [`ClientId::generate`] erzeugt. Laengere Strings werden beim Erstellen
/// auf 16 Bytes gekuerzt (an einer gueltigen UTF-8-Grenze), damit die
/// ID verlustfrei in den Audio-Header passt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Erstellt eine ClientId aus einem String (gekuerzt auf 16 Bytes)
    pub fn new(id: impl Into<String>) -> Self {
        let mut s: String = id.into();
        if s.len() > CLIENT_ID_MAX_BYTES {
            let mut grenze = CLIENT_ID_MAX_BYTES;
            while !s.is_char_boundary(grenze) {
                grenze -= 1;
            }
            s.truncate(grenze);
        }
        Self(s)
    }

    /// Erzeugt eine neue zufaellige ClientId (8 Hex-Zeichen einer UUIDv4)
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self(uuid[..8].to_string())
    }

    /// Gibt den inneren String zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prueft ob die ID leer ist (leere Quell-IDs lernen keine Adresse)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Online-Status eines registrierten Endpoints
///
/// Endpoints werden erst beim Schliessen der Control-Verbindung entfernt;
/// der Idle-Sweep setzt sie vorher auf `Offline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Online,
    Offline,
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Eindeutige Anruf-ID
///
/// Wird serverseitig aus Anrufer, Angerufenem und Erstellungszeitpunkt
/// zusammengesetzt; eine einmal entfernte CallId wird nie wiederverwendet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Erstellt eine CallId aus einem String
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt den inneren String zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Aktuelle Unix-Zeit in Sekunden (mit Subsekunden-Anteil)
///
/// Alle Zeitstempel auf dem Wire und in der Session-Verwaltung verwenden
/// dieses Format.
pub fn unix_zeit() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_generieren_eindeutig() {
        let a = ClientId::generate();
        let b = ClientId::generate();
        assert_ne!(a, b, "Zwei generierte ClientIds muessen verschieden sein");
    }

    #[test]
    fn client_id_generieren_hat_8_zeichen() {
        let id = ClientId::generate();
        assert_eq!(id.as_str().len(), 8);
    }

    #[test]
    fn client_id_wird_auf_16_bytes_gekuerzt() {
        let id = ClientId::new("ein_sehr_langer_name_weit_ueber_16");
        assert!(id.as_str().len() <= CLIENT_ID_MAX_BYTES);
        assert_eq!(id.as_str(), "ein_sehr_langer_");
    }

    #[test]
    fn client_id_kuerzung_respektiert_utf8_grenzen() {
        // Sechs Drei-Byte-Zeichen = 18 Bytes; Byte 16 liegt mitten im Zeichen,
        // die Kuerzung muss auf die letzte gueltige Grenze (15) zurueckfallen
        let id = ClientId::new("€€€€€€");
        assert_eq!(id.as_str(), "€€€€€");
        assert_eq!(id.as_str().len(), 15);
    }

    #[test]
    fn client_id_kurz_bleibt_unveraendert() {
        let id = ClientId::new("alice");
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn ids_sind_serde_transparent() {
        let id = ClientId::new("alice");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"alice\"");
        let zurueck: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, zurueck);
    }

    #[test]
    fn call_id_display_roh() {
        let id = CallId::new("alice_bob_1700000000_1");
        assert_eq!(id.to_string(), "alice_bob_1700000000_1");
    }

    #[test]
    fn unix_zeit_plausibel() {
        let t = unix_zeit();
        // Nach 2020, vor 2100
        assert!(t > 1_577_836_800.0);
        assert!(t < 4_102_444_800.0);
    }

    #[test]
    fn endpoint_status_kleingeschrieben() {
        assert_eq!(
            serde_json::to_string(&EndpointStatus::Online).unwrap(),
            "\"online\""
        );
        assert_eq!(
            serde_json::to_string(&EndpointStatus::Offline).unwrap(),
            "\"offline\""
        );
    }
}
