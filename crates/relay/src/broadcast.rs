//! Broadcast-Verteiler
//!
//! Serialisiert jedes Envelope genau einmal und verteilt den fertigen
//! JSON-String an alle authentifizierten Verbindungen. Tote Verbindungen
//! werden dabei aus dem Register entfernt; deren eigene Tasks melden den
//! Austritt anschliessend selbst, womit die Nutzerzahl konvergiert.

use std::sync::Arc;

use tracing::{debug, warn};

use klatsch_protocol::control::{
    user_count_bauen, NUTZER_BEIGETRETEN, NUTZER_GEGANGEN,
};
use klatsch_protocol::message::ChatMessage;

use crate::error::RelayResult;
use crate::registry::{SendeStatus, VerbindungsRegister};

/// Verteilt Envelopes an alle authentifizierten Verbindungen
#[derive(Debug, Clone)]
pub struct BroadcastVerteiler {
    register: Arc<VerbindungsRegister>,
}

impl BroadcastVerteiler {
    pub fn neu(register: Arc<VerbindungsRegister>) -> Self {
        Self { register }
    }

    /// Sendet ein Envelope an jede authentifizierte Verbindung
    ///
    /// Volle Queues verlieren genau diese Nachricht (langsamer Empfaenger
    /// bremst nie alle anderen), geschlossene Queues raeumen die
    /// Verbindung aus dem Register.
    pub fn rundsenden(&self, nachricht: &ChatMessage) -> RelayResult<()> {
        let json = nachricht.als_json()?;

        for sender in self.register.authentifizierte_snapshot() {
            match sender.senden(json.clone()) {
                SendeStatus::Eingereiht => {}
                SendeStatus::QueueVoll => {
                    warn!(id = %sender.id(), "Ausgangs-Queue voll, Nachricht verworfen");
                }
                SendeStatus::Geschlossen => {
                    debug!(id = %sender.id(), "Empfaenger weg, entferne Verbindung");
                    self.register.entfernen(sender.id());
                }
            }
        }
        Ok(())
    }

    /// Sagt die aktuelle Nutzerzahl an (Absender `System`)
    pub fn nutzerzahl_ansagen(&self) -> RelayResult<()> {
        let anzahl = self.register.authentifizierte_anzahl();
        self.rundsenden(&ChatMessage::system(user_count_bauen(anzahl)))
    }

    /// Beitritts-Hinweis plus frische Nutzerzahl
    pub fn beitritt_ansagen(&self) -> RelayResult<()> {
        self.rundsenden(&ChatMessage::server_hinweis(NUTZER_BEIGETRETEN))?;
        self.nutzerzahl_ansagen()
    }

    /// Austritts-Hinweis plus frische Nutzerzahl
    pub fn austritt_ansagen(&self) -> RelayResult<()> {
        self.rundsenden(&ChatMessage::server_hinweis(NUTZER_GEGANGEN))?;
        self.nutzerzahl_ansagen()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use klatsch_core::VerbindungsId;
    use klatsch_protocol::control::user_count_parsen;

    fn aufbau() -> (Arc<VerbindungsRegister>, BroadcastVerteiler) {
        let register = VerbindungsRegister::neu();
        let verteiler = BroadcastVerteiler::neu(Arc::clone(&register));
        (register, verteiler)
    }

    #[tokio::test]
    async fn nur_authentifizierte_empfangen_broadcasts() {
        let (register, verteiler) = aufbau();

        let auth = VerbindungsId::neu();
        let mut auth_rx = register.registrieren(auth);
        register.authentifizieren(auth);

        let offen = VerbindungsId::neu();
        let mut offen_rx = register.registrieren(offen);

        verteiler
            .rundsenden(&ChatMessage::neu("Alice", "hallo", 1))
            .unwrap();

        let json = auth_rx.try_recv().unwrap();
        let msg = ChatMessage::aus_json(&json).unwrap();
        assert_eq!(msg.content, "hallo");
        assert!(offen_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn tote_verbindung_wird_beim_rundsenden_entfernt() {
        let (register, verteiler) = aufbau();

        let id = VerbindungsId::neu();
        let rx = register.registrieren(id);
        register.authentifizieren(id);
        drop(rx);

        verteiler
            .rundsenden(&ChatMessage::neu("Alice", "hallo", 1))
            .unwrap();
        assert_eq!(register.authentifizierte_anzahl(), 0);
        assert_eq!(register.verbindungs_anzahl(), 0);
    }

    #[tokio::test]
    async fn nutzerzahl_zaehlt_nur_authentifizierte() {
        let (register, verteiler) = aufbau();

        let auth = VerbindungsId::neu();
        let mut auth_rx = register.registrieren(auth);
        register.authentifizieren(auth);
        let _offen_rx = register.registrieren(VerbindungsId::neu());

        verteiler.nutzerzahl_ansagen().unwrap();

        let msg = ChatMessage::aus_json(&auth_rx.try_recv().unwrap()).unwrap();
        assert_eq!(msg.sender, "System");
        assert_eq!(user_count_parsen(&msg.content), Some(1));
    }

    #[tokio::test]
    async fn beitritt_sendet_hinweis_und_zahl() {
        let (register, verteiler) = aufbau();

        let id = VerbindungsId::neu();
        let mut rx = register.registrieren(id);
        register.authentifizieren(id);

        verteiler.beitritt_ansagen().unwrap();

        let hinweis = ChatMessage::aus_json(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(hinweis.sender, "Server");
        assert_eq!(hinweis.content, NUTZER_BEIGETRETEN);

        let zahl = ChatMessage::aus_json(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(user_count_parsen(&zahl.content), Some(1));
    }
}
