//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt die drei Session-Tabellen und den Broadcaster als geteilte
//! Handles, die sicher zwischen tokio-Tasks geteilt werden koennen.

use fernruf_session::{CallCoordinator, RoomTable, SessionDirectory};
use std::sync::Arc;
use std::time::Instant;

use crate::broadcast::EventBroadcaster;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitig registrierte Clients
    pub max_clients: u32,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Fernruf Server".to_string(),
            max_clients: 512,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
///
/// Directory, Anrufe und Raeume sind unabhaengig gelockte Tabellen;
/// Clone der Handles gibt eine Referenz auf denselben Zustand.
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: SignalingConfig,
    /// Endpunkt-Verzeichnis (wer ist registriert, Audio-Adressen)
    pub directory: SessionDirectory,
    /// Anruf-Koordinator (klingelnde und aktive Anrufe)
    pub calls: CallCoordinator,
    /// Raum-Mitgliedschaften
    pub rooms: RoomTable,
    /// Send-Queues aller verbundenen Clients
    pub broadcaster: EventBroadcaster,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_zeit: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState mit frischen Tabellen
    pub fn neu(config: SignalingConfig) -> Arc<Self> {
        Self::mit_tabellen(
            config,
            SessionDirectory::neu(),
            CallCoordinator::neu(),
            RoomTable::neu(),
        )
    }

    /// Erstellt einen SignalingState ueber bereits existierenden Tabellen
    ///
    /// Der Server teilt Directory und Anruf-Koordinator mit dem
    /// UDP-Relay; beide Seiten arbeiten auf denselben Handles.
    pub fn mit_tabellen(
        config: SignalingConfig,
        directory: SessionDirectory,
        calls: CallCoordinator,
        rooms: RoomTable,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            directory,
            calls,
            rooms,
            broadcaster: EventBroadcaster::neu(),
            start_zeit: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> f64 {
        self.start_zeit.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_teilt_tabellen_mit_relay() {
        let directory = SessionDirectory::neu();
        let state = SignalingState::mit_tabellen(
            SignalingConfig::default(),
            directory.clone(),
            CallCoordinator::neu(),
            RoomTable::neu(),
        );

        directory.registrieren(
            fernruf_core::types::ClientId::new("alice"),
            "Alice".into(),
            "127.0.0.1".parse().unwrap(),
            None,
        );
        assert_eq!(state.directory.anzahl(), 1);
    }

    #[test]
    fn uptime_steigt() {
        let state = SignalingState::neu(SignalingConfig::default());
        assert!(state.uptime_sek() >= 0.0);
    }
}
