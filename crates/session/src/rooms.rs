//! Raum-Mitgliedschaften – reine Buchhaltung, kein Audio-Routing
//!
//! Raeume entstehen beim ersten Beitritt und verschwinden sobald das
//! letzte Mitglied geht. Mehr passiert hier nicht: weder Mixing noch
//! raumweite Weiterleitung.

use dashmap::DashMap;
use fernruf_core::types::ClientId;
use std::sync::Arc;

/// Raum-Mitgliedschaftstabelle des Servers
#[derive(Clone)]
pub struct RoomTable {
    inner: Arc<RoomTableInner>,
}

struct RoomTableInner {
    /// Mitgliederlisten, indexiert nach Raum-ID
    raeume: DashMap<String, Vec<ClientId>>,
}

impl RoomTable {
    /// Erstellt eine neue leere Tabelle
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(RoomTableInner {
                raeume: DashMap::new(),
            }),
        }
    }

    /// Fuegt einen Client einem Raum hinzu (legt den Raum ggf. an)
    ///
    /// Gibt `false` zurueck wenn der Client bereits Mitglied war.
    pub fn beitreten(&self, raum_id: &str, client_id: ClientId) -> bool {
        let mut mitglieder = self
            .inner
            .raeume
            .entry(raum_id.to_string())
            .or_default();
        if mitglieder.contains(&client_id) {
            return false;
        }
        mitglieder.push(client_id.clone());
        tracing::info!(raum = %raum_id, client_id = %client_id, "Raum beigetreten");
        true
    }

    /// Entfernt einen Client aus einem Raum
    ///
    /// Ein leer gewordener Raum wird geloescht. Gibt `false` zurueck wenn
    /// der Client kein Mitglied war.
    pub fn verlassen(&self, raum_id: &str, client_id: &ClientId) -> bool {
        let war_mitglied = match self.inner.raeume.get_mut(raum_id) {
            Some(mut mitglieder) => {
                let vorher = mitglieder.len();
                mitglieder.retain(|m| m != client_id);
                mitglieder.len() < vorher
            }
            None => false,
        };

        if war_mitglied {
            self.inner
                .raeume
                .remove_if(raum_id, |_, mitglieder| mitglieder.is_empty());
            tracing::info!(raum = %raum_id, client_id = %client_id, "Raum verlassen");
        }
        war_mitglied
    }

    /// Entfernt einen Client aus allen Raeumen (beim Trennen der Verbindung)
    pub fn client_entfernen(&self, client_id: &ClientId) {
        let mut leere: Vec<String> = Vec::new();
        for mut eintrag in self.inner.raeume.iter_mut() {
            eintrag.value_mut().retain(|m| m != client_id);
            if eintrag.value().is_empty() {
                leere.push(eintrag.key().clone());
            }
        }
        for raum_id in leere {
            self.inner
                .raeume
                .remove_if(&raum_id, |_, mitglieder| mitglieder.is_empty());
        }
    }

    /// Prueft ob ein Client Mitglied eines Raums ist
    pub fn ist_mitglied(&self, raum_id: &str, client_id: &ClientId) -> bool {
        self.inner
            .raeume
            .get(raum_id)
            .map(|mitglieder| mitglieder.contains(client_id))
            .unwrap_or(false)
    }

    /// Gibt die Mitglieder eines Raums zurueck
    pub fn mitglieder(&self, raum_id: &str) -> Vec<ClientId> {
        self.inner
            .raeume
            .get(raum_id)
            .map(|mitglieder| mitglieder.clone())
            .unwrap_or_default()
    }

    /// Gibt die Anzahl existierender Raeume zurueck
    pub fn aktive_anzahl(&self) -> usize {
        self.inner.raeume.len()
    }
}

impl Default for RoomTable {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
