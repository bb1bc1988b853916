//! Clientseitige Handshake-Zustandsmaschine
//!
//! Bewusst ohne Socket-Bezug gehalten: der Verbindungs-Task fuettert
//! Transport-Ereignisse hinein (`beim_*`) und fuehrt die zurueckgegebene
//! Aktion aus. Dadurch ist der komplette Handshake-Ablauf inklusive
//! aller Fehlerpfade ohne Netzwerk testbar.
//!
//! Ein Fehlschlag ist endgueltig: die Maschine meldet nie zwei
//! Status-Texte fuer dieselbe Verbindung, auch wenn nach einem Timeout
//! noch ein Close-Frame eintrifft.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use klatsch_crypto::{
    gemeinsames_geheimnis, gruppenschluessel_auswickeln, wrap_schluessel_ableiten, Schluesselpaar,
};
use klatsch_protocol::control::{Hello, SchliessCode, Welcome, WELCOME_PRAEFIX};

/// Frist zwischen HELLO und WELCOME
pub const HANDSHAKE_FRIST: Duration = Duration::from_millis(5000);

// Status-Texte, die die UI unveraendert anzeigt
pub const STATUS_KEINE_KENNUNG: &str = "no serverId provided";
pub const STATUS_HELLO_GESENDET: &str = "handshake sent";
pub const STATUS_FRIST_ABGELAUFEN: &str = "handshake timeout";
pub const STATUS_WELCOME_DEFEKT: &str = "malformed WELCOME";
pub const STATUS_KENNUNG_FALSCH: &str = "serverId mismatch";
pub const STATUS_UNWRAP_FEHLGESCHLAGEN: &str = "group key unwrap failed";
pub const STATUS_VERBUNDEN: &str = "connected (secured)";
pub const STATUS_KENNUNG_ABGELEHNT: &str = "invalid server ID";
pub const STATUS_HANDSHAKE_ABGELEHNT: &str = "handshake failed";
pub const STATUS_VORZEITIG_GESCHLOSSEN: &str = "closed before handshake completed";
pub const STATUS_GETRENNT: &str = "Disconnected";

/// Vom Aufrufer auszufuehrende Aktion nach einem Ereignis
#[derive(Debug)]
pub enum HandshakeAktion {
    /// HELLO-Content senden und die Handshake-Frist starten
    HelloSenden { content: String },
    /// Gruppenschluessel installieren, Status `connected (secured)`
    Abschliessen { gruppenschluessel: [u8; 32] },
    /// Status melden und die Verbindung schliessen
    Fehlschlagen { status: String },
    /// Ereignis betrifft den Handshake nicht, normal weiterverarbeiten
    Durchreichen,
    /// Ereignis verwerfen
    Ignorieren,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zustand {
    Bereit,
    HelloGesendet,
    Abgeschlossen,
    Fehlgeschlagen,
}

/// Zustandsmaschine eines einzelnen Handshake-Versuchs
pub struct HandshakeSession {
    ziel_kennung: Option<String>,
    paar: Option<Schluesselpaar>,
    zustand: Zustand,
}

impl HandshakeSession {
    /// Erstellt eine Session fuer die konfigurierte Ziel-Kennung
    pub fn neu(ziel_kennung: Option<String>) -> Self {
        Self {
            ziel_kennung,
            paar: None,
            zustand: Zustand::Bereit,
        }
    }

    pub fn ist_abgeschlossen(&self) -> bool {
        self.zustand == Zustand::Abgeschlossen
    }

    pub fn ist_fehlgeschlagen(&self) -> bool {
        self.zustand == Zustand::Fehlgeschlagen
    }

    /// Handshake steht noch aus (Frist-Timer muss scharf bleiben)
    pub fn laeuft(&self) -> bool {
        matches!(self.zustand, Zustand::Bereit | Zustand::HelloGesendet)
    }

    fn fehlschlagen(&mut self, status: &str) -> HandshakeAktion {
        self.zustand = Zustand::Fehlgeschlagen;
        HandshakeAktion::Fehlschlagen {
            status: status.to_string(),
        }
    }

    /// Transport steht: HELLO bauen oder sofort fehlschlagen
    pub fn beim_oeffnen(&mut self) -> HandshakeAktion {
        let Some(kennung) = self.ziel_kennung.clone() else {
            return self.fehlschlagen(STATUS_KEINE_KENNUNG);
        };

        let paar = Schluesselpaar::generieren();
        let content = Hello::bauen(&kennung, &BASE64.encode(paar.oeffentlicher_schluessel()));
        self.paar = Some(paar);
        self.zustand = Zustand::HelloGesendet;
        HandshakeAktion::HelloSenden { content }
    }

    /// Eingehender Content-String waehrend oder nach dem Handshake
    pub fn beim_nachricht(&mut self, content: &str) -> HandshakeAktion {
        if self.zustand != Zustand::HelloGesendet || !content.starts_with(WELCOME_PRAEFIX) {
            return HandshakeAktion::Durchreichen;
        }

        let Ok(welcome) = Welcome::parsen(content) else {
            return self.fehlschlagen(STATUS_WELCOME_DEFEKT);
        };

        let Some(erwartet) = self.ziel_kennung.as_deref() else {
            return self.fehlschlagen(STATUS_KEINE_KENNUNG);
        };
        if welcome.server_kennung != erwartet {
            return self.fehlschlagen(STATUS_KENNUNG_FALSCH);
        }

        match self.schluessel_auswickeln(&welcome) {
            Some(gruppenschluessel) => {
                self.zustand = Zustand::Abgeschlossen;
                HandshakeAktion::Abschliessen { gruppenschluessel }
            }
            // Kein Cipher-Zustand wurde veraendert, fail-closed
            None => self.fehlschlagen(STATUS_UNWRAP_FEHLGESCHLAGEN),
        }
    }

    /// Komplette Auswickel-Kette; jeder Fehlschlag ist generisch
    fn schluessel_auswickeln(&self, welcome: &Welcome) -> Option<[u8; 32]> {
        let paar = self.paar.as_ref()?;
        let server_public = BASE64.decode(&welcome.server_public_key_b64).ok()?;
        let geheimnis = gemeinsames_geheimnis(paar, &server_public).ok()?;
        let wrap_schluessel =
            wrap_schluessel_ableiten(&geheimnis, welcome.server_kennung.as_bytes()).ok()?;
        let eingewickelt = BASE64.decode(&welcome.wrapped_group_key_b64).ok()?;
        let gruppenschluessel = gruppenschluessel_auswickeln(&eingewickelt, &wrap_schluessel).ok()?;
        gruppenschluessel.as_bytes().try_into().ok()
    }

    /// Die Handshake-Frist ist abgelaufen
    pub fn beim_frist_ablauf(&mut self) -> HandshakeAktion {
        if self.laeuft() {
            self.fehlschlagen(STATUS_FRIST_ABGELAUFEN)
        } else {
            HandshakeAktion::Ignorieren
        }
    }

    /// Transport wurde geschlossen; liefert hoechstens einmal einen Status
    pub fn beim_schliessen(&mut self, code: Option<u16>) -> Option<String> {
        if !self.laeuft() {
            return None;
        }
        self.zustand = Zustand::Fehlgeschlagen;
        let status = match code.and_then(SchliessCode::aus_u16) {
            Some(SchliessCode::ProtokollFehler) => STATUS_KENNUNG_ABGELEHNT,
            Some(SchliessCode::HandshakeFehler) => STATUS_HANDSHAKE_ABGELEHNT,
            _ => STATUS_VORZEITIG_GESCHLOSSEN,
        };
        Some(status.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use klatsch_crypto::{gruppenschluessel_einwickeln, SecretBytes};

    const KENNUNG: &str = "f47ac10b-58cc-4372-a567-0e02b2c3d479";

    /// Simuliert die Serverseite: beantwortet das HELLO der Session
    fn welcome_bauen(hello_content: &str, gruppenschluessel: &SecretBytes) -> String {
        let hello = Hello::parsen(hello_content).unwrap();
        let client_public = BASE64.decode(&hello.client_public_key_b64).unwrap();

        let server_paar = Schluesselpaar::generieren();
        let geheimnis = gemeinsames_geheimnis(&server_paar, &client_public).unwrap();
        let wrap_schluessel =
            wrap_schluessel_ableiten(&geheimnis, hello.server_kennung.as_bytes()).unwrap();
        let eingewickelt =
            gruppenschluessel_einwickeln(gruppenschluessel.as_bytes(), &wrap_schluessel).unwrap();

        Welcome::bauen(
            &hello.server_kennung,
            &BASE64.encode(server_paar.oeffentlicher_schluessel()),
            &BASE64.encode(eingewickelt),
        )
    }

    fn hello_senden(session: &mut HandshakeSession) -> String {
        match session.beim_oeffnen() {
            HandshakeAktion::HelloSenden { content } => content,
            andere => panic!("HelloSenden erwartet, bekam {andere:?}"),
        }
    }

    #[test]
    fn happy_path_liefert_gruppenschluessel() {
        let mut session = HandshakeSession::neu(Some(KENNUNG.to_string()));
        let hello = hello_senden(&mut session);

        let gruppenschluessel = SecretBytes::zufaellig_32();
        let welcome = welcome_bauen(&hello, &gruppenschluessel);

        match session.beim_nachricht(&welcome) {
            HandshakeAktion::Abschliessen { gruppenschluessel: erhalten } => {
                assert_eq!(&erhalten[..], gruppenschluessel.as_bytes());
            }
            andere => panic!("Abschliessen erwartet, bekam {andere:?}"),
        }
        assert!(session.ist_abgeschlossen());
        assert!(!session.laeuft());
    }

    #[test]
    fn ohne_ziel_kennung_sofortiger_fehlschlag() {
        let mut session = HandshakeSession::neu(None);
        match session.beim_oeffnen() {
            HandshakeAktion::Fehlschlagen { status } => {
                assert_eq!(status, STATUS_KEINE_KENNUNG);
            }
            andere => panic!("Fehlschlagen erwartet, bekam {andere:?}"),
        }
        assert!(session.ist_fehlgeschlagen());
    }

    #[test]
    fn defektes_welcome() {
        let mut session = HandshakeSession::neu(Some(KENNUNG.to_string()));
        hello_senden(&mut session);

        match session.beim_nachricht("WELCOME:nur:zwei") {
            HandshakeAktion::Fehlschlagen { status } => {
                assert_eq!(status, STATUS_WELCOME_DEFEKT);
            }
            andere => panic!("Fehlschlagen erwartet, bekam {andere:?}"),
        }
    }

    #[test]
    fn kennung_im_welcome_stimmt_nicht() {
        let mut session = HandshakeSession::neu(Some(KENNUNG.to_string()));
        let hello = hello_senden(&mut session);

        // Serverseite antwortet unter anderer Kennung
        let fremdes_hello = hello.replacen(KENNUNG, "andere-kennung", 1);
        let welcome = welcome_bauen(&fremdes_hello, &SecretBytes::zufaellig_32());

        match session.beim_nachricht(&welcome) {
            HandshakeAktion::Fehlschlagen { status } => {
                assert_eq!(status, STATUS_KENNUNG_FALSCH);
            }
            andere => panic!("Fehlschlagen erwartet, bekam {andere:?}"),
        }
    }

    #[test]
    fn korrupter_eingewickelter_schluessel() {
        let mut session = HandshakeSession::neu(Some(KENNUNG.to_string()));
        let hello = hello_senden(&mut session);

        let welcome = welcome_bauen(&hello, &SecretBytes::zufaellig_32());
        let korrupt = format!("{}AAAA", welcome);

        match session.beim_nachricht(&korrupt) {
            HandshakeAktion::Fehlschlagen { status } => {
                assert_eq!(status, STATUS_UNWRAP_FEHLGESCHLAGEN);
            }
            andere => panic!("Fehlschlagen erwartet, bekam {andere:?}"),
        }
    }

    #[test]
    fn chat_nachrichten_werden_durchgereicht() {
        let mut session = HandshakeSession::neu(Some(KENNUNG.to_string()));
        hello_senden(&mut session);

        assert!(matches!(
            session.beim_nachricht("hallo welt"),
            HandshakeAktion::Durchreichen
        ));
        assert!(session.laeuft());
    }

    #[test]
    fn frist_ablauf_nur_vor_abschluss() {
        let mut session = HandshakeSession::neu(Some(KENNUNG.to_string()));
        let hello = hello_senden(&mut session);

        let gruppenschluessel = SecretBytes::zufaellig_32();
        let welcome = welcome_bauen(&hello, &gruppenschluessel);
        session.beim_nachricht(&welcome);

        assert!(matches!(
            session.beim_frist_ablauf(),
            HandshakeAktion::Ignorieren
        ));
    }

    #[test]
    fn frist_ablauf_vor_welcome_schlaegt_fehl() {
        let mut session = HandshakeSession::neu(Some(KENNUNG.to_string()));
        hello_senden(&mut session);

        match session.beim_frist_ablauf() {
            HandshakeAktion::Fehlschlagen { status } => {
                assert_eq!(status, STATUS_FRIST_ABGELAUFEN);
            }
            andere => panic!("Fehlschlagen erwartet, bekam {andere:?}"),
        }
    }

    #[test]
    fn schliessen_meldet_hoechstens_einen_status() {
        let mut session = HandshakeSession::neu(Some(KENNUNG.to_string()));
        hello_senden(&mut session);

        // Frist laeuft ab, danach trifft noch ein Close-Frame ein
        session.beim_frist_ablauf();
        assert_eq!(session.beim_schliessen(Some(1011)), None);
    }

    #[test]
    fn schliess_codes_werden_klassifiziert() {
        let faelle = [
            (Some(1002), STATUS_KENNUNG_ABGELEHNT),
            (Some(1011), STATUS_HANDSHAKE_ABGELEHNT),
            (Some(4000), STATUS_VORZEITIG_GESCHLOSSEN),
            (None, STATUS_VORZEITIG_GESCHLOSSEN),
        ];
        for (code, erwartet) in faelle {
            let mut session = HandshakeSession::neu(Some(KENNUNG.to_string()));
            hello_senden(&mut session);
            assert_eq!(session.beim_schliessen(code).as_deref(), Some(erwartet));
        }
    }

    #[test]
    fn nach_abschluss_ist_schliessen_kein_fehler() {
        let mut session = HandshakeSession::neu(Some(KENNUNG.to_string()));
        let hello = hello_senden(&mut session);
        let welcome = welcome_bauen(&hello, &SecretBytes::zufaellig_32());
        session.beim_nachricht(&welcome);

        assert_eq!(session.beim_schliessen(Some(1000)), None);
    }
}
