//! Anruf-Koordination – Zustandsmaschine fuer 1:1-Anrufe
//!
//! Lebenszyklus pro Anruf:
//!
//! ```text
//! Requesting ---accepted=true---> Active ---hangup---> Ended (entfernt)
//!     |
//!     +-------accepted=false----> Rejected (entfernt)
//! ```
//!
//! Pro Anruf-ID wird genau ein Uebergang in einen Endzustand akzeptiert;
//! ein zweites Auflegen oder Beantworten ist ein No-Op. Entfernte IDs
//! werden nie wiederverwendet (Zeitstempel + Sequenznummer in der ID).

use dashmap::DashMap;
use fernruf_core::types::{unix_zeit, CallId, ClientId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CallState
// ---------------------------------------------------------------------------

/// Zustand eines Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Anfrage wurde an den Angerufenen weitergeleitet, Antwort steht aus
    Requesting,
    /// Anruf wurde angenommen, Audio darf fliessen
    Active,
    /// Anruf wurde abgelehnt (Endzustand)
    Rejected,
    /// Anruf wurde aufgelegt (Endzustand)
    Ended,
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requesting => write!(f, "requesting"),
            Self::Active => write!(f, "active"),
            Self::Rejected => write!(f, "rejected"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// Zustand eines einzelnen Anrufs
#[derive(Debug, Clone)]
pub struct Call {
    /// Anruf-ID
    pub id: CallId,
    /// Wer den Anruf gestartet hat
    pub anrufer: ClientId,
    /// Wer angerufen wurde
    pub angerufener: ClientId,
    /// Aktueller Zustand
    pub status: CallState,
    /// Erstellungszeitpunkt (Unix-Sekunden)
    pub erstellt: f64,
}

impl Call {
    /// Prueft ob ein Client an diesem Anruf beteiligt ist
    pub fn ist_teilnehmer(&self, client_id: &ClientId) -> bool {
        &self.anrufer == client_id || &self.angerufener == client_id
    }

    /// Gibt den jeweils anderen Teilnehmer zurueck
    pub fn anderer_teilnehmer(&self, client_id: &ClientId) -> Option<ClientId> {
        if &self.anrufer == client_id {
            Some(self.angerufener.clone())
        } else if &self.angerufener == client_id {
            Some(self.anrufer.clone())
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// CallCoordinator
// ---------------------------------------------------------------------------

/// Zentrale Anruf-Verwaltung des Servers
///
/// Die Tabelle enthaelt nur klingelnde und aktive Anrufe; Endzustaende
/// werden sofort entfernt.
#[derive(Clone)]
pub struct CallCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    /// Anrufe, indexiert nach CallId
    calls: DashMap<CallId, Call>,
    /// Prozessweite Sequenznummer fuer eindeutige Anruf-IDs
    sequenz: AtomicU64,
}

impl CallCoordinator {
    /// Erstellt einen neuen leeren Koordinator
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                calls: DashMap::new(),
                sequenz: AtomicU64::new(1),
            }),
        }
    }

    /// Startet einen neuen Anruf im Zustand `Requesting`
    ///
    /// Die ID wird aus beiden Teilnehmern, der Erstellungssekunde und einer
    /// prozessweiten Sequenznummer gebildet. Dadurch sind auch schnelle
    /// Wiederholungs-Anrufe zwischen demselben Paar eindeutig.
    pub fn anruf_anfordern(&self, anrufer: ClientId, angerufener: ClientId) -> Call {
        let erstellt = unix_zeit();
        let sequenz = self.inner.sequenz.fetch_add(1, Ordering::Relaxed);
        let id = CallId::new(format!(
            "{}_{}_{}_{}",
            anrufer,
            angerufener,
            erstellt as u64,
            sequenz
        ));

        let call = Call {
            id: id.clone(),
            anrufer,
            angerufener,
            status: CallState::Requesting,
            erstellt,
        };
        self.inner.calls.insert(id.clone(), call.clone());
        tracing::info!(
            call_id = %id,
            anrufer = %call.anrufer,
            angerufener = %call.angerufener,
            "Anruf angefordert"
        );
        call
    }

    /// Beantwortet einen klingelnden Anruf
    ///
    /// Gibt den aktualisierten Anruf zurueck, oder `None` wenn die ID
    /// unbekannt ist oder der Anruf nicht mehr klingelt (No-Op).
    /// Abgelehnte Anrufe werden sofort aus der Tabelle entfernt.
    pub fn beantworten(&self, id: &CallId, angenommen: bool) -> Option<Call> {
        if angenommen {
            let mut eintrag = self.inner.calls.get_mut(id)?;
            if eintrag.status != CallState::Requesting {
                tracing::debug!(
                    call_id = %id,
                    status = %eintrag.status,
                    "Antwort auf bereits beantworteten Anruf ignoriert"
                );
                return None;
            }
            eintrag.status = CallState::Active;
            tracing::info!(call_id = %id, "Anruf angenommen");
            return Some(eintrag.clone());
        }

        let entfernt = self
            .inner
            .calls
            .remove_if(id, |_, call| call.status == CallState::Requesting);
        match entfernt {
            Some((_, mut call)) => {
                call.status = CallState::Rejected;
                tracing::info!(call_id = %id, "Anruf abgelehnt");
                Some(call)
            }
            None => {
                tracing::debug!(call_id = %id, "Ablehnung ohne klingelnden Anruf ignoriert");
                None
            }
        }
    }

    /// Beendet einen Anruf durch einen seiner Teilnehmer
    ///
    /// Gibt den entfernten Anruf zurueck damit der Aufrufer den anderen
    /// Teilnehmer benachrichtigen kann. Unbekannte IDs und Auflegen durch
    /// Unbeteiligte sind ein No-Op.
    pub fn auflegen(&self, id: &CallId, wer: &ClientId) -> Option<Call> {
        let entfernt = self
            .inner
            .calls
            .remove_if(id, |_, call| call.ist_teilnehmer(wer));
        match entfernt {
            Some((_, mut call)) => {
                call.status = CallState::Ended;
                tracing::info!(call_id = %id, von = %wer, "Anruf beendet");
                Some(call)
            }
            None => {
                tracing::debug!(call_id = %id, von = %wer, "Auflegen ohne passenden Anruf (No-Op)");
                None
            }
        }
    }

    /// Prueft ob zwei Clients gerade einen aktiven Anruf miteinander fuehren
    ///
    /// Autorisiert die Audio-Weiterleitung; die Reihenfolge der beiden
    /// Teilnehmer spielt keine Rolle.
    pub fn ist_aktiver_anruf(&self, a: &ClientId, b: &ClientId) -> bool {
        self.inner.calls.iter().any(|call| {
            call.status == CallState::Active
                && ((&call.anrufer == a && &call.angerufener == b)
                    || (&call.anrufer == b && &call.angerufener == a))
        })
    }

    /// Gibt einen Anruf per ID zurueck (Kopie)
    pub fn anruf(&self, id: &CallId) -> Option<Call> {
        self.inner.calls.get(id).map(|call| call.clone())
    }

    /// Gibt alle Anrufe zurueck an denen ein Client beteiligt ist
    ///
    /// Wird beim Trennen der Control-Verbindung verwendet um offene
    /// Anrufe aufzuraeumen.
    pub fn anrufe_von(&self, client_id: &ClientId) -> Vec<Call> {
        self.inner
            .calls
            .iter()
            .filter(|call| call.ist_teilnehmer(client_id))
            .map(|call| call.clone())
            .collect()
    }

    /// Gibt die Anzahl aktiver Anrufe zurueck
    pub fn aktive_anzahl(&self) -> usize {
        self.inner
            .calls
            .iter()
            .filter(|call| call.status == CallState::Active)
            .count()
    }

    /// Gibt die Gesamtzahl der Anrufe in der Tabelle zurueck
    /// (klingelnd + aktiv)
    pub fn gesamt_anzahl(&self) -> usize {
        self.inner.calls.len()
    }
}

impl Default for CallCoordinator {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
