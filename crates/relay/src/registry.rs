//! Verbindungs-Register
//!
//! Zwei nebenlaeufige Karten: alle Transport-Verbindungen und die
//! Teilmenge der authentifizierten. Nur letztere zaehlt fuer USER_COUNT
//! und empfaengt Broadcasts. Jede Verbindung haengt an einer begrenzten
//! mpsc-Queue; die eigentliche Socket-Arbeit macht der Verbindungs-Task.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use klatsch_core::VerbindungsId;

/// Kapazitaet der Ausgangs-Queue pro Verbindung
const QUEUE_KAPAZITAET: usize = 64;

/// Ergebnis eines nicht-blockierenden Sendeversuchs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendeStatus {
    /// Nachricht liegt in der Queue
    Eingereiht,
    /// Queue voll; Nachricht verworfen, Verbindung bleibt bestehen
    QueueVoll,
    /// Empfaenger-Task ist weg; Verbindung muss entfernt werden
    Geschlossen,
}

/// Sende-Handle einer registrierten Verbindung
#[derive(Debug, Clone)]
pub struct ClientSender {
    id: VerbindungsId,
    tx: mpsc::Sender<String>,
}

impl ClientSender {
    pub fn id(&self) -> VerbindungsId {
        self.id
    }

    /// Reiht einen fertigen JSON-String ein, ohne zu blockieren
    pub fn senden(&self, json: String) -> SendeStatus {
        match self.tx.try_send(json) {
            Ok(()) => SendeStatus::Eingereiht,
            Err(mpsc::error::TrySendError::Full(_)) => SendeStatus::QueueVoll,
            Err(mpsc::error::TrySendError::Closed(_)) => SendeStatus::Geschlossen,
        }
    }
}

/// Register aller Verbindungen mit Authentifizierungs-Teilmenge
#[derive(Debug, Default)]
pub struct VerbindungsRegister {
    alle: DashMap<VerbindungsId, ClientSender>,
    authentifizierte: DashMap<VerbindungsId, ClientSender>,
}

impl VerbindungsRegister {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registriert eine frische Verbindung und gibt ihr Queue-Ende zurueck
    pub fn registrieren(&self, id: VerbindungsId) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(QUEUE_KAPAZITAET);
        self.alle.insert(id, ClientSender { id, tx });
        debug!(%id, "Verbindung registriert");
        rx
    }

    /// Befoerdert eine Verbindung in die authentifizierte Teilmenge
    ///
    /// Gibt `false` zurueck wenn die Verbindung nicht (mehr) registriert
    /// ist, etwa weil sie waehrend des Handshakes abgebaut wurde.
    pub fn authentifizieren(&self, id: VerbindungsId) -> bool {
        match self.alle.get(&id) {
            Some(sender) => {
                self.authentifizierte.insert(id, sender.clone());
                true
            }
            None => false,
        }
    }

    /// Entfernt eine Verbindung aus beiden Karten
    ///
    /// Gibt zurueck ob sie authentifiziert war; nur dann folgen
    /// Austritts-Broadcasts.
    pub fn entfernen(&self, id: VerbindungsId) -> bool {
        self.alle.remove(&id);
        let war_authentifiziert = self.authentifizierte.remove(&id).is_some();
        debug!(%id, war_authentifiziert, "Verbindung entfernt");
        war_authentifiziert
    }

    pub fn ist_authentifiziert(&self, id: VerbindungsId) -> bool {
        self.authentifizierte.contains_key(&id)
    }

    /// Anzahl aller Transport-Verbindungen (inkl. unauthentifizierter)
    pub fn verbindungs_anzahl(&self) -> usize {
        self.alle.len()
    }

    /// Anzahl authentifizierter Verbindungen (Basis fuer USER_COUNT)
    pub fn authentifizierte_anzahl(&self) -> usize {
        self.authentifizierte.len()
    }

    /// Schnappschuss der authentifizierten Sende-Handles
    ///
    /// Der Schnappschuss entkoppelt die Iteration von der Karte, damit
    /// das Entfernen toter Verbindungen waehrend des Broadcasts kein
    /// Deadlock-Risiko traegt.
    pub fn authentifizierte_snapshot(&self) -> Vec<ClientSender> {
        self.authentifizierte
            .iter()
            .map(|eintrag| eintrag.value().clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registrieren_und_authentifizieren() {
        let register = VerbindungsRegister::neu();
        let id = VerbindungsId::neu();
        let _rx = register.registrieren(id);

        assert_eq!(register.verbindungs_anzahl(), 1);
        assert_eq!(register.authentifizierte_anzahl(), 0);
        assert!(!register.ist_authentifiziert(id));

        assert!(register.authentifizieren(id));
        assert_eq!(register.authentifizierte_anzahl(), 1);
        assert!(register.ist_authentifiziert(id));
    }

    #[tokio::test]
    async fn unbekannte_verbindung_wird_nicht_authentifiziert() {
        let register = VerbindungsRegister::neu();
        assert!(!register.authentifizieren(VerbindungsId::neu()));
        assert_eq!(register.authentifizierte_anzahl(), 0);
    }

    #[tokio::test]
    async fn entfernen_meldet_authentifizierungs_status() {
        let register = VerbindungsRegister::neu();
        let offen = VerbindungsId::neu();
        let auth = VerbindungsId::neu();
        let _rx1 = register.registrieren(offen);
        let _rx2 = register.registrieren(auth);
        register.authentifizieren(auth);

        assert!(!register.entfernen(offen));
        assert!(register.entfernen(auth));
        assert_eq!(register.verbindungs_anzahl(), 0);
        assert_eq!(register.authentifizierte_anzahl(), 0);
    }

    #[tokio::test]
    async fn senden_an_geschlossene_queue() {
        let register = VerbindungsRegister::neu();
        let id = VerbindungsId::neu();
        let rx = register.registrieren(id);
        register.authentifizieren(id);
        drop(rx);

        let sender = &register.authentifizierte_snapshot()[0];
        assert_eq!(sender.senden("{}".into()), SendeStatus::Geschlossen);
    }

    #[tokio::test]
    async fn volle_queue_verwirft_ohne_zu_schliessen() {
        let register = VerbindungsRegister::neu();
        let id = VerbindungsId::neu();
        let _rx = register.registrieren(id);
        register.authentifizieren(id);

        let sender = register.authentifizierte_snapshot()[0].clone();
        for _ in 0..QUEUE_KAPAZITAET {
            assert_eq!(sender.senden("{}".into()), SendeStatus::Eingereiht);
        }
        assert_eq!(sender.senden("{}".into()), SendeStatus::QueueVoll);
    }
}
