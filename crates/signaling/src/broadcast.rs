//! Event-Broadcaster – Stellt Nachrichten in die Send-Queues der Clients
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller verbundenen
//! Clients. Handler stellen Nachrichten hier ein; die jeweilige
//! Verbindungs-Task liest ihre Queue und schreibt auf den TCP-Stream.
//!
//! ## Zustellung
//! - An einen Client: `an_client_senden`
//! - An alle ausser den Absender: `an_alle_ausser_senden` (Rundruf)
//!
//! Einstellen ist nicht-blockierend: eine volle Queue verwirft die
//! Nachricht statt den Handler aufzuhalten.

use dashmap::DashMap;
use fernruf_core::types::ClientId;
use fernruf_protocol::ControlMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Client
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub client_id: ClientId,
    pub tx: mpsc::Sender<ControlMessage>,
}

impl ClientSender {
    /// Stellt eine Nachricht nicht-blockierend in die Queue
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ControlMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    client_id = %self.client_id,
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    client_id = %self.client_id,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Broadcaster fuer alle verbundenen Clients
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Client-Sender, indiziert nach ClientId
    clients: DashMap<ClientId, ClientSender>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
            }),
        }
    }

    /// Registriert einen Client und gibt seine Empfangs-Queue zurueck
    ///
    /// Die Verbindungs-Task liest aus dieser Queue und sendet via TCP.
    /// Eine bestehende Queue derselben ID wird ersetzt (Reconnect).
    pub fn client_registrieren(&self, client_id: ClientId) -> mpsc::Receiver<ControlMessage> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        let sender = ClientSender {
            client_id: client_id.clone(),
            tx,
        };
        self.inner.clients.insert(client_id.clone(), sender);
        tracing::debug!(client_id = %client_id, "Client im Broadcaster registriert");
        rx
    }

    /// Entfernt einen Client aus dem Broadcaster
    pub fn client_entfernen(&self, client_id: &ClientId) {
        self.inner.clients.remove(client_id);
        tracing::debug!(client_id = %client_id, "Client aus Broadcaster entfernt");
    }

    /// Stellt eine Nachricht fuer einen einzelnen Client ein
    ///
    /// Gibt `true` zurueck wenn der Client verbunden ist und die
    /// Nachricht eingereiht wurde.
    pub fn an_client_senden(&self, client_id: &ClientId, nachricht: ControlMessage) -> bool {
        match self.inner.clients.get(client_id) {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::debug!(client_id = %client_id, "Senden an unbekannten Client");
                false
            }
        }
    }

    /// Stellt eine Nachricht fuer alle Clients ausser dem Absender ein
    ///
    /// Gibt die Anzahl der erfolgreichen Zustellungen zurueck.
    pub fn an_alle_ausser_senden(
        &self,
        ausgeschlossen: &ClientId,
        nachricht: ControlMessage,
    ) -> usize {
        let mut gesendet = 0;
        self.inner.clients.iter().for_each(|entry| {
            if entry.key() == ausgeschlossen {
                return;
            }
            if entry.value().senden(nachricht.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Gibt die Anzahl der registrierten Clients zurueck
    pub fn client_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob ein Client registriert ist
    pub fn ist_registriert(&self, client_id: &ClientId) -> bool {
        self.inner.clients.contains_key(client_id)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fernruf_protocol::ErrorCode;

    fn test_nachricht(inhalt: &str) -> ControlMessage {
        ControlMessage::fehler(ErrorCode::InternalError, inhalt)
    }

    #[tokio::test]
    async fn client_registrieren_und_senden() {
        let broadcaster = EventBroadcaster::neu();
        let id = ClientId::new("alice");

        let mut rx = broadcaster.client_registrieren(id.clone());
        assert!(broadcaster.ist_registriert(&id));

        assert!(broadcaster.an_client_senden(&id, test_nachricht("hallo")));

        let empfangen = rx.try_recv().expect("Nachricht muss vorhanden sein");
        assert_eq!(empfangen.typ(), "error");
    }

    #[tokio::test]
    async fn senden_an_unbekannten_client_schlaegt_fehl() {
        let broadcaster = EventBroadcaster::neu();
        assert!(!broadcaster.an_client_senden(&ClientId::new("niemand"), test_nachricht("x")));
    }

    #[tokio::test]
    async fn an_alle_ausser_senden_ueberspringt_absender() {
        let broadcaster = EventBroadcaster::neu();
        let alice = ClientId::new("alice");
        let bob = ClientId::new("bob");
        let carol = ClientId::new("carol");

        let mut rx_alice = broadcaster.client_registrieren(alice.clone());
        let mut rx_bob = broadcaster.client_registrieren(bob.clone());
        let mut rx_carol = broadcaster.client_registrieren(carol.clone());

        let gesendet = broadcaster.an_alle_ausser_senden(&alice, test_nachricht("rundruf"));
        assert_eq!(gesendet, 2);

        assert!(rx_alice.try_recv().is_err(), "Absender darf nichts empfangen");
        assert!(rx_bob.try_recv().is_ok());
        assert!(rx_carol.try_recv().is_ok());
    }

    #[tokio::test]
    async fn volle_queue_verwirft_statt_zu_blockieren() {
        let broadcaster = EventBroadcaster::neu();
        let id = ClientId::new("alice");
        let _rx = broadcaster.client_registrieren(id.clone());

        for _ in 0..SEND_QUEUE_GROESSE {
            assert!(broadcaster.an_client_senden(&id, test_nachricht("fuellung")));
        }
        // Queue ist voll, naechste Nachricht wird verworfen
        assert!(!broadcaster.an_client_senden(&id, test_nachricht("zu viel")));
    }

    #[tokio::test]
    async fn reconnect_ersetzt_queue() {
        let broadcaster = EventBroadcaster::neu();
        let id = ClientId::new("alice");

        let mut alte_rx = broadcaster.client_registrieren(id.clone());
        let mut neue_rx = broadcaster.client_registrieren(id.clone());

        broadcaster.an_client_senden(&id, test_nachricht("nach reconnect"));
        assert!(alte_rx.try_recv().is_err(), "Alte Queue ist abgehaengt");
        assert!(neue_rx.try_recv().is_ok());
        assert_eq!(broadcaster.client_anzahl(), 1);
    }

    #[test]
    fn client_entfernen() {
        let broadcaster = EventBroadcaster::neu();
        let id = ClientId::new("alice");
        let _rx = broadcaster.client_registrieren(id.clone());

        broadcaster.client_entfernen(&id);
        assert!(!broadcaster.ist_registriert(&id));
        assert_eq!(broadcaster.client_anzahl(), 0);
    }
}
