//! Ausgabe-Historie – Referenzsignal fuer die Echo-Unterdrueckung
//!
//! Der Empfangspfad schreibt jeden abgespielten Chunk hinein (einziger
//! Schreiber), der Sendepfad liest Momentaufnahmen als Echo-Referenz
//! (einziger Leser). Begrenzte Tiefe, aelteste Chunks fallen heraus.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Anzahl der vorgehaltenen Chunks (bei 64 ms pro Chunk gut eine halbe
/// Sekunde Referenzsignal)
pub const HISTORIE_TIEFE: usize = 8;

/// Begrenzte Historie der zuletzt abgespielten Audio-Chunks
#[derive(Clone)]
pub struct OutputHistory {
    chunks: Arc<Mutex<VecDeque<Vec<f32>>>>,
}

impl OutputHistory {
    /// Erstellt eine neue leere Historie
    pub fn neu() -> Self {
        Self {
            chunks: Arc::new(Mutex::new(VecDeque::with_capacity(HISTORIE_TIEFE))),
        }
    }

    /// Haengt einen abgespielten Chunk an (aeltester faellt ggf. heraus)
    pub fn anhaengen(&self, chunk: Vec<f32>) {
        let mut chunks = self.chunks.lock();
        if chunks.len() == HISTORIE_TIEFE {
            chunks.pop_front();
        }
        chunks.push_back(chunk);
    }

    /// Kopiert den aktuellen Inhalt (juengster Chunk zuletzt)
    pub fn momentaufnahme(&self) -> Vec<Vec<f32>> {
        self.chunks.lock().iter().cloned().collect()
    }

    /// Leert die Historie (beim Ende eines Anrufs)
    pub fn leeren(&self) {
        self.chunks.lock().clear();
    }

    /// Gibt die Anzahl vorgehaltener Chunks zurueck
    pub fn laenge(&self) -> usize {
        self.chunks.lock().len()
    }
}

impl Default for OutputHistory {
    fn default() -> Self {
        Self::neu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anhaengen_und_momentaufnahme() {
        let history = OutputHistory::neu();
        history.anhaengen(vec![0.1; 4]);
        history.anhaengen(vec![0.2; 4]);

        let aufnahme = history.momentaufnahme();
        assert_eq!(aufnahme.len(), 2);
        assert_eq!(aufnahme[1], vec![0.2; 4]);
    }

    #[test]
    fn tiefe_ist_begrenzt() {
        let history = OutputHistory::neu();
        for i in 0..HISTORIE_TIEFE + 3 {
            history.anhaengen(vec![i as f32]);
        }

        assert_eq!(history.laenge(), HISTORIE_TIEFE);
        // Die aeltesten drei Chunks sind herausgefallen
        let aufnahme = history.momentaufnahme();
        assert_eq!(aufnahme[0], vec![3.0]);
    }

    #[test]
    fn leeren_entfernt_alles() {
        let history = OutputHistory::neu();
        history.anhaengen(vec![0.5; 4]);
        history.leeren();
        assert_eq!(history.laenge(), 0);
    }

    #[test]
    fn clone_teilt_inhalt() {
        let history1 = OutputHistory::neu();
        let history2 = history1.clone();
        history1.anhaengen(vec![1.0]);
        assert_eq!(history2.laenge(), 1);
    }
}
