//! Client-seitiger Sitzungszustand
//!
//! Lokaler Spiegel dessen, was der Server ueber diesen Client weiss:
//! der Verzeichnis-Cache (nur durch `client_list`-Antworten gefuellt),
//! eingehende Anruf-Angebote und der eine aktive Anruf. Mehr als ein
//! gleichzeitiger Anruf wird hier lokal abgelehnt, bevor irgendetwas
//! das Netz erreicht.

use fernruf_core::types::{CallId, ClientId};
use fernruf_core::{FernrufError, Result};
use fernruf_protocol::control::ClientSummary;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Hoechstalter des Verzeichnis-Caches bevor er als veraltet gilt
pub const VERZEICHNIS_MAX_ALTER: Duration = Duration::from_secs(30);

/// Der eine gerade laufende Anruf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AktiverAnruf {
    pub call_id: CallId,
    pub gegenstelle: ClientId,
}

/// Lokaler Sitzungszustand eines Clients
#[derive(Debug, Default)]
pub struct ClientSessionState {
    /// Letzter bekannter Verzeichnis-Stand vom Server
    verzeichnis: Vec<ClientSummary>,
    /// Zeitpunkt der letzten Verzeichnis-Antwort
    verzeichnis_stand: Option<Instant>,
    /// Klingelnde eingehende Angebote: call_id -> Anrufer
    angebote: HashMap<CallId, ClientId>,
    /// Ziel einer noch unbeantworteten ausgehenden Anfrage
    ausgehend: Option<ClientId>,
    /// Der aktive Anruf (hoechstens einer)
    aktiver_anruf: Option<AktiverAnruf>,
}

impl ClientSessionState {
    pub fn neu() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Verzeichnis-Cache
    // -----------------------------------------------------------------------

    /// Uebernimmt eine frische `client_list`-Antwort
    pub fn verzeichnis_uebernehmen(&mut self, clients: Vec<ClientSummary>) {
        self.verzeichnis = clients;
        self.verzeichnis_stand = Some(Instant::now());
    }

    /// Gibt den Verzeichnis-Stand ohne den eigenen Eintrag zurueck
    pub fn verzeichnis_ohne(&self, eigene_id: &ClientId) -> Vec<ClientSummary> {
        self.verzeichnis
            .iter()
            .filter(|eintrag| eintrag.id != *eigene_id)
            .cloned()
            .collect()
    }

    /// Prueft ob der Cache fehlt oder aelter als [`VERZEICHNIS_MAX_ALTER`] ist
    pub fn verzeichnis_ist_veraltet(&self) -> bool {
        match self.verzeichnis_stand {
            Some(stand) => stand.elapsed() > VERZEICHNIS_MAX_ALTER,
            None => true,
        }
    }

    // -----------------------------------------------------------------------
    // Eingehende Angebote
    // -----------------------------------------------------------------------

    /// Vermerkt ein klingelndes Angebot
    pub fn angebot_vermerken(&mut self, call_id: CallId, von: ClientId) {
        self.angebote.insert(call_id, von);
    }

    /// Entnimmt ein Angebot zur Beantwortung
    pub fn angebot_entnehmen(&mut self, call_id: &CallId) -> Option<ClientId> {
        self.angebote.remove(call_id)
    }

    /// Verwirft ein Angebot (Anrufer hat waehrend des Klingelns aufgelegt)
    pub fn angebot_verwerfen(&mut self, call_id: &CallId) -> bool {
        self.angebote.remove(call_id).is_some()
    }

    /// Aktuelle klingelnde Angebote
    pub fn angebote(&self) -> Vec<(CallId, ClientId)> {
        self.angebote
            .iter()
            .map(|(id, von)| (id.clone(), von.clone()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Anruf-Lebenszyklus
    // -----------------------------------------------------------------------

    /// Prueft ob gerade ein Anruf laeuft oder angefragt ist
    pub fn ist_im_anruf(&self) -> bool {
        self.aktiver_anruf.is_some() || self.ausgehend.is_some()
    }

    /// Prueft ob ein neuer Anruf beginnen darf
    ///
    /// Schlaegt fehl solange ein Anruf laeuft oder eine fruehere Anfrage
    /// unbeantwortet ist.
    pub fn frei_fuer_anruf(&self) -> Result<()> {
        if let Some(anruf) = &self.aktiver_anruf {
            return Err(FernrufError::BereitsImAnruf(
                anruf.gegenstelle.as_str().to_string(),
            ));
        }
        if let Some(angefragt) = &self.ausgehend {
            return Err(FernrufError::BereitsImAnruf(
                angefragt.as_str().to_string(),
            ));
        }
        Ok(())
    }

    /// Vermerkt eine ausgehende Anfrage
    pub fn ausgehend_vermerken(&mut self, ziel: ClientId) -> Result<()> {
        self.frei_fuer_anruf()?;
        self.ausgehend = Some(ziel);
        Ok(())
    }

    /// Ziel der offenen ausgehenden Anfrage
    pub fn ausgehend(&self) -> Option<&ClientId> {
        self.ausgehend.as_ref()
    }

    /// Verwirft die offene ausgehende Anfrage (Ablehnung oder Fehler)
    pub fn ausgehend_abbrechen(&mut self) -> Option<ClientId> {
        self.ausgehend.take()
    }

    /// Schaltet einen Anruf aktiv
    ///
    /// Raeumt die zugehoerige Anfrage bzw. das Angebot mit ab.
    pub fn anruf_aktiv_setzen(&mut self, call_id: CallId, gegenstelle: ClientId) {
        self.ausgehend = None;
        self.angebote.remove(&call_id);
        self.aktiver_anruf = Some(AktiverAnruf {
            call_id,
            gegenstelle,
        });
    }

    /// Der aktive Anruf, falls vorhanden
    pub fn aktiver_anruf(&self) -> Option<&AktiverAnruf> {
        self.aktiver_anruf.as_ref()
    }

    /// Prueft ob `call_id` der gerade aktive Anruf ist
    pub fn ist_aktueller_anruf(&self, call_id: &CallId) -> bool {
        self.aktiver_anruf
            .as_ref()
            .map(|anruf| anruf.call_id == *call_id)
            .unwrap_or(false)
    }

    /// Beendet den aktiven Anruf und gibt ihn zurueck
    pub fn anruf_beenden(&mut self) -> Option<AktiverAnruf> {
        self.aktiver_anruf.take()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fernruf_core::types::EndpointStatus;

    fn eintrag(id: &str) -> ClientSummary {
        ClientSummary {
            id: ClientId::new(id),
            name: id.to_string(),
            status: EndpointStatus::Online,
            last_seen: 0.0,
            audio_port: None,
        }
    }

    #[test]
    fn frischer_zustand_ist_veraltet_und_leer() {
        let state = ClientSessionState::neu();
        assert!(state.verzeichnis_ist_veraltet());
        assert!(state.verzeichnis_ohne(&ClientId::new("alice")).is_empty());
        assert!(!state.ist_im_anruf());
    }

    #[test]
    fn verzeichnis_filtert_eigenen_eintrag() {
        let mut state = ClientSessionState::neu();
        state.verzeichnis_uebernehmen(vec![eintrag("alice"), eintrag("bob")]);

        let sicht = state.verzeichnis_ohne(&ClientId::new("alice"));
        assert_eq!(sicht.len(), 1);
        assert_eq!(sicht[0].id.as_str(), "bob");
        assert!(!state.verzeichnis_ist_veraltet());
    }

    #[test]
    fn zweite_anfrage_wird_lokal_abgelehnt() {
        let mut state = ClientSessionState::neu();
        state.ausgehend_vermerken(ClientId::new("bob")).unwrap();

        let fehler = state
            .ausgehend_vermerken(ClientId::new("carol"))
            .unwrap_err();
        assert!(matches!(fehler, FernrufError::BereitsImAnruf(_)));
    }

    #[test]
    fn anfrage_waehrend_aktivem_anruf_abgelehnt() {
        let mut state = ClientSessionState::neu();
        state.anruf_aktiv_setzen(CallId::new("a_b_1_0"), ClientId::new("bob"));

        let fehler = state
            .ausgehend_vermerken(ClientId::new("carol"))
            .unwrap_err();
        assert!(matches!(fehler, FernrufError::BereitsImAnruf(_)));
    }

    #[test]
    fn aktiv_setzen_raeumt_anfrage_und_angebot_ab() {
        let mut state = ClientSessionState::neu();
        let id = CallId::new("a_b_1_0");
        state.ausgehend_vermerken(ClientId::new("bob")).unwrap();
        state.angebot_vermerken(id.clone(), ClientId::new("bob"));

        state.anruf_aktiv_setzen(id.clone(), ClientId::new("bob"));

        assert!(state.ausgehend().is_none());
        assert!(state.angebote().is_empty());
        assert!(state.ist_aktueller_anruf(&id));
    }

    #[test]
    fn angebot_entnehmen_und_verwerfen() {
        let mut state = ClientSessionState::neu();
        let id = CallId::new("a_b_1_0");
        state.angebot_vermerken(id.clone(), ClientId::new("alice"));

        assert_eq!(
            state.angebot_entnehmen(&id).unwrap().as_str(),
            "alice"
        );
        assert!(!state.angebot_verwerfen(&id), "bereits entnommen");
    }

    #[test]
    fn anruf_beenden_gibt_gegenstelle_frei() {
        let mut state = ClientSessionState::neu();
        state.anruf_aktiv_setzen(CallId::new("a_b_1_0"), ClientId::new("bob"));

        let beendet = state.anruf_beenden().unwrap();
        assert_eq!(beendet.gegenstelle.as_str(), "bob");
        assert!(!state.ist_im_anruf());
        assert!(state.anruf_beenden().is_none());
    }
}
