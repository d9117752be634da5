//! Client-Verzeichnis – In-Memory Zustand aller registrierten Endpoints
//!
//! Verwaltet pro Client:
//! - Anzeigename und Online-Status
//! - Angekuendigten Audio-Port und gelernte Audio-Adresse
//! - Zeitpunkt der letzten Aktivitaet
//!
//! Thread-safe durch DashMap (lock-free concurrent HashMap). Das
//! Verzeichnis wird von allen Verbindungs-Tasks und dem Relay-Loop
//! gleichzeitig mutiert.

use dashmap::DashMap;
use fernruf_core::types::{unix_zeit, ClientId, EndpointStatus};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Zustand eines einzelnen registrierten Clients
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Client-ID
    pub id: ClientId,
    /// Anzeigename
    pub name: String,
    /// IP-Adresse der Control-Verbindung
    pub peer_ip: IpAddr,
    /// Bei der Registrierung angekuendigter UDP-Port (optional)
    pub audio_port: Option<u16>,
    /// Vom Relay gelernte tatsaechliche Audio-Absenderadresse
    pub learned_audio_addr: Option<SocketAddr>,
    /// Online-Status (Offline nach Idle-Sweep, Online nach Aktivitaet)
    pub status: EndpointStatus,
    /// Zeitpunkt der letzten Aktivitaet (fuer den Idle-Sweep)
    pub letzte_aktivitaet: Instant,
    /// Letzte Aktivitaet als Unix-Zeit (fuer die Client-Liste)
    pub last_seen: f64,
}

impl Endpoint {
    /// Erstellt einen neuen Endpoint-Zustand
    pub fn neu(id: ClientId, name: String, peer_ip: IpAddr, audio_port: Option<u16>) -> Self {
        Self {
            id,
            name,
            peer_ip,
            audio_port,
            learned_audio_addr: None,
            status: EndpointStatus::Online,
            letzte_aktivitaet: Instant::now(),
            last_seen: unix_zeit(),
        }
    }

    /// Prueft ob der Client als inaktiv gilt (keine Aktivitaet seit `timeout`)
    pub fn ist_inaktiv(&self, timeout: Duration) -> bool {
        self.letzte_aktivitaet.elapsed() > timeout
    }

    /// Vermerkt Aktivitaet und stellt den Online-Status wieder her
    pub fn aktivitaet_vermerken(&mut self) {
        self.letzte_aktivitaet = Instant::now();
        self.last_seen = unix_zeit();
        self.status = EndpointStatus::Online;
    }

    /// Aus Registrierungsdaten abgeleitete Audio-Adresse
    pub fn angekuendigte_audio_adresse(&self) -> Option<SocketAddr> {
        self.audio_port.map(|port| SocketAddr::new(self.peer_ip, port))
    }
}

// ---------------------------------------------------------------------------
// SessionDirectory
// ---------------------------------------------------------------------------

/// Zentrales Client-Verzeichnis des Servers
///
/// Thread-safe durch DashMap – concurrent reads ohne Lock.
/// Einzel-Eintraege werden durch per-Entry-Lock geschuetzt.
#[derive(Clone)]
pub struct SessionDirectory {
    inner: Arc<DirectoryInner>,
}

struct DirectoryInner {
    /// Endpoints, indexiert nach ClientId
    endpoints: DashMap<ClientId, Endpoint>,
}

impl SessionDirectory {
    /// Erstellt ein neues leeres Verzeichnis
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                endpoints: DashMap::new(),
            }),
        }
    }

    /// Registriert einen Client (Last-Writer-Wins bei doppelter ID)
    ///
    /// Gibt `true` zurueck wenn ein bestehender Eintrag ueberschrieben wurde.
    pub fn registrieren(
        &self,
        id: ClientId,
        name: String,
        peer_ip: IpAddr,
        audio_port: Option<u16>,
    ) -> bool {
        let endpoint = Endpoint::neu(id.clone(), name, peer_ip, audio_port);
        let ersetzt = self.inner.endpoints.insert(id.clone(), endpoint).is_some();
        if ersetzt {
            tracing::warn!(
                client_id = %id,
                "Bestehende Registrierung ueberschrieben (Last-Writer-Wins)"
            );
        } else {
            tracing::info!(client_id = %id, ip = %peer_ip, "Client registriert");
        }
        ersetzt
    }

    /// Entfernt einen Client (beim Schliessen der Control-Verbindung)
    pub fn entfernen(&self, id: &ClientId) -> Option<Endpoint> {
        let entfernt = self.inner.endpoints.remove(id).map(|(_, e)| e);
        if entfernt.is_some() {
            tracing::info!(client_id = %id, "Client aus Verzeichnis entfernt");
        }
        entfernt
    }

    /// Vermerkt Aktivitaet fuer einen Client (bei jeder Control-Nachricht)
    pub fn aktivitaet_vermerken(&self, id: &ClientId) {
        if let Some(mut eintrag) = self.inner.endpoints.get_mut(id) {
            eintrag.aktivitaet_vermerken();
        }
    }

    /// Setzt die vom Relay gelernte Audio-Absenderadresse (Last-Writer-Wins)
    pub fn audio_adresse_lernen(&self, id: &ClientId, adresse: SocketAddr) {
        if let Some(mut eintrag) = self.inner.endpoints.get_mut(id) {
            if eintrag.learned_audio_addr != Some(adresse) {
                tracing::debug!(client_id = %id, adresse = %adresse, "Audio-Adresse gelernt");
            }
            eintrag.learned_audio_addr = Some(adresse);
        }
    }

    /// Loest die Audio-Zieladresse eines Clients auf
    ///
    /// Gelernte Adressen haben Vorrang; die angekuendigte Adresse gilt nur
    /// solange der Client online ist.
    pub fn audio_adresse_aufloesen(&self, id: &ClientId) -> Option<SocketAddr> {
        let eintrag = self.inner.endpoints.get(id)?;
        if let Some(adresse) = eintrag.learned_audio_addr {
            return Some(adresse);
        }
        if eintrag.status == EndpointStatus::Online {
            return eintrag.angekuendigte_audio_adresse();
        }
        None
    }

    /// Prueft ob ein Client registriert ist
    pub fn ist_registriert(&self, id: &ClientId) -> bool {
        self.inner.endpoints.contains_key(id)
    }

    /// Prueft ob ein Client online ist
    pub fn ist_online(&self, id: &ClientId) -> bool {
        self.inner
            .endpoints
            .get(id)
            .map(|e| e.status == EndpointStatus::Online)
            .unwrap_or(false)
    }

    /// Gibt eine Momentaufnahme aller Endpoints zurueck
    ///
    /// Iteriert ueber DashMap – wird nicht im Hot Path verwendet
    pub fn uebersicht(&self) -> Vec<Endpoint> {
        self.inner
            .endpoints
            .iter()
            .map(|eintrag| eintrag.value().clone())
            .collect()
    }

    /// Markiert inaktive Clients als Offline (Idle-Sweep)
    ///
    /// Entfernt keine Eintraege; das passiert erst beim Schliessen der
    /// Verbindung. Gibt die Liste der markierten IDs zurueck.
    pub fn inaktive_markieren(&self, timeout: Duration) -> Vec<ClientId> {
        let mut markiert = Vec::new();
        for mut eintrag in self.inner.endpoints.iter_mut() {
            if eintrag.status == EndpointStatus::Online && eintrag.ist_inaktiv(timeout) {
                eintrag.status = EndpointStatus::Offline;
                markiert.push(eintrag.id.clone());
            }
        }
        for id in &markiert {
            tracing::warn!(client_id = %id, "Client als Offline markiert (Idle-Timeout)");
        }
        markiert
    }

    /// Gibt die Anzahl aller registrierten Clients zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.endpoints.len()
    }

    /// Gibt die Anzahl der Clients mit Online-Status zurueck
    pub fn online_anzahl(&self) -> usize {
        self.inner
            .endpoints
            .iter()
            .filter(|e| e.status == EndpointStatus::Online)
            .count()
    }
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
