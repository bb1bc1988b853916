//! Handshake-Steuerstrings und Schliess-Codes
//!
//! Die Steuerstrings reisen im `content`-Feld des Envelopes:
//!
//! ```text
//! Client -> Server:  HELLO:<serverId>:<clientPubB64>
//! Server -> Client:  WELCOME:<serverId>:<serverPubB64>:<wrappedGroupKeyB64>
//! Server -> Clients: USER_COUNT:<n>
//! ```
//!
//! Felder sind Doppelpunkt-getrennt ohne Escaping; nur das letzte Feld
//! darf selbst Doppelpunkte enthalten (Base64 enthaelt keine).

use thiserror::Error;

/// Praefix der Handshake-Eroeffnung (Client -> Server)
pub const HELLO_PRAEFIX: &str = "HELLO:";

/// Praefix der Handshake-Antwort (Server -> Client)
pub const WELCOME_PRAEFIX: &str = "WELCOME:";

/// Praefix der Nutzerzahl-Ansage (Server -> Clients)
pub const USER_COUNT_PRAEFIX: &str = "USER_COUNT:";

/// Beitritts-Hinweis (Absender `Server`)
pub const NUTZER_BEIGETRETEN: &str = "User joined the chat";

/// Austritts-Hinweis (Absender `Server`)
pub const NUTZER_GEGANGEN: &str = "User left the chat";

/// Prueft ob ein Content-String ein reservierter Steuerstring ist
pub fn ist_steuerstring(content: &str) -> bool {
    content.starts_with(HELLO_PRAEFIX)
        || content.starts_with(WELCOME_PRAEFIX)
        || content.starts_with(USER_COUNT_PRAEFIX)
}

// ---------------------------------------------------------------------------
// Schliess-Codes
// ---------------------------------------------------------------------------

/// Schliess-Codes der Transport-Verbindung
///
/// Protokollfehler und generischer Handshake-Fehler sind unterscheidbar,
/// damit Clients Fehlschlaege klassifizieren koennen ohne den Reason-Text
/// zu parsen. Der Reason-Text dient nur der Diagnose und enthaelt nie die
/// behauptete Server-Kennung.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchliessCode {
    /// Regulaerer Verbindungsabbau
    Normal,
    /// Fehlerhafte Handshake-Felder oder falsche Server-Kennung
    ProtokollFehler,
    /// Wrap/Ableitung fehlgeschlagen (generisch, keine Details)
    HandshakeFehler,
}

impl SchliessCode {
    /// Wire-Wert des Codes (WebSocket-Close-Code)
    pub fn als_u16(self) -> u16 {
        match self {
            SchliessCode::Normal => 1000,
            SchliessCode::ProtokollFehler => 1002,
            SchliessCode::HandshakeFehler => 1011,
        }
    }

    /// Klassifiziert einen empfangenen Wire-Wert
    pub fn aus_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(SchliessCode::Normal),
            1002 => Some(SchliessCode::ProtokollFehler),
            1011 => Some(SchliessCode::HandshakeFehler),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse-Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Parsen eines Steuerstrings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SteuerstringFehler {
    /// Das erwartete Praefix fehlt
    #[error("Steuerstring hat falsches Praefix")]
    FalschesPraefix,

    /// Weniger Felder als das Format verlangt
    #[error("Steuerstring hat zu wenige Felder: {erhalten} von {erwartet}")]
    ZuWenigeFelder { erwartet: usize, erhalten: usize },
}

// ---------------------------------------------------------------------------
// HELLO
// ---------------------------------------------------------------------------

/// Geparste Handshake-Eroeffnung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    /// Vom Client behauptete Server-Kennung
    pub server_kennung: String,
    /// Oeffentlicher X25519-Schluessel des Clients (Base64)
    pub client_public_key_b64: String,
}

impl Hello {
    /// Baut den HELLO-Content-String
    pub fn bauen(server_kennung: &str, client_public_key_b64: &str) -> String {
        format!("HELLO:{server_kennung}:{client_public_key_b64}")
    }

    /// Parst einen HELLO-Content-String
    ///
    /// Weniger als 3 Felder sind eine Protokollverletzung.
    pub fn parsen(content: &str) -> Result<Self, SteuerstringFehler> {
        let rest = content
            .strip_prefix(HELLO_PRAEFIX)
            .ok_or(SteuerstringFehler::FalschesPraefix)?;

        let felder: Vec<&str> = rest.splitn(2, ':').collect();
        if felder.len() < 2 {
            return Err(SteuerstringFehler::ZuWenigeFelder {
                erwartet: 3,
                erhalten: felder.len() + 1,
            });
        }

        Ok(Self {
            server_kennung: felder[0].to_string(),
            client_public_key_b64: felder[1].to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// WELCOME
// ---------------------------------------------------------------------------

/// Geparste Handshake-Antwort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    /// Server-Kennung (muss dem konfigurierten Ziel entsprechen)
    pub server_kennung: String,
    /// Oeffentlicher X25519-Schluessel des Servers (Base64)
    pub server_public_key_b64: String,
    /// Eingewickelter Gruppenschluessel: Base64 von nonce||ciphertext
    pub wrapped_group_key_b64: String,
}

impl Welcome {
    /// Baut den WELCOME-Content-String
    pub fn bauen(
        server_kennung: &str,
        server_public_key_b64: &str,
        wrapped_group_key_b64: &str,
    ) -> String {
        format!("WELCOME:{server_kennung}:{server_public_key_b64}:{wrapped_group_key_b64}")
    }

    /// Parst einen WELCOME-Content-String (hoechstens 4 Felder)
    pub fn parsen(content: &str) -> Result<Self, SteuerstringFehler> {
        let rest = content
            .strip_prefix(WELCOME_PRAEFIX)
            .ok_or(SteuerstringFehler::FalschesPraefix)?;

        let felder: Vec<&str> = rest.splitn(3, ':').collect();
        if felder.len() < 3 {
            return Err(SteuerstringFehler::ZuWenigeFelder {
                erwartet: 4,
                erhalten: felder.len() + 1,
            });
        }

        Ok(Self {
            server_kennung: felder[0].to_string(),
            server_public_key_b64: felder[1].to_string(),
            wrapped_group_key_b64: felder[2].to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// USER_COUNT
// ---------------------------------------------------------------------------

/// Baut den USER_COUNT-Content-String
pub fn user_count_bauen(anzahl: usize) -> String {
    format!("USER_COUNT:{anzahl}")
}

/// Parst einen USER_COUNT-Content-String
pub fn user_count_parsen(content: &str) -> Option<usize> {
    content
        .strip_prefix(USER_COUNT_PRAEFIX)?
        .parse::<usize>()
        .ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_bauen_und_parsen() {
        let content = Hello::bauen("server-1", "cHVia2V5");
        assert_eq!(content, "HELLO:server-1:cHVia2V5");

        let hello = Hello::parsen(&content).unwrap();
        assert_eq!(hello.server_kennung, "server-1");
        assert_eq!(hello.client_public_key_b64, "cHVia2V5");
    }

    #[test]
    fn hello_mit_zwei_feldern_wird_abgelehnt() {
        let err = Hello::parsen("HELLO:nur-eine-kennung").unwrap_err();
        assert!(matches!(err, SteuerstringFehler::ZuWenigeFelder { .. }));
    }

    #[test]
    fn hello_ohne_praefix_wird_abgelehnt() {
        assert_eq!(
            Hello::parsen("HALLO:a:b"),
            Err(SteuerstringFehler::FalschesPraefix)
        );
    }

    #[test]
    fn welcome_bauen_und_parsen() {
        let content = Welcome::bauen("sid", "c3J2cHVi", "d3JhcHBlZA==");
        let welcome = Welcome::parsen(&content).unwrap();
        assert_eq!(welcome.server_kennung, "sid");
        assert_eq!(welcome.server_public_key_b64, "c3J2cHVi");
        assert_eq!(welcome.wrapped_group_key_b64, "d3JhcHBlZA==");
    }

    #[test]
    fn welcome_letztes_feld_darf_doppelpunkte_enthalten() {
        let welcome = Welcome::parsen("WELCOME:sid:pub:rest:mit:doppelpunkt").unwrap();
        assert_eq!(welcome.wrapped_group_key_b64, "rest:mit:doppelpunkt");
    }

    #[test]
    fn welcome_mit_drei_feldern_wird_abgelehnt() {
        let err = Welcome::parsen("WELCOME:sid:pub").unwrap_err();
        assert!(matches!(err, SteuerstringFehler::ZuWenigeFelder { .. }));
    }

    #[test]
    fn user_count_roundtrip() {
        assert_eq!(user_count_bauen(3), "USER_COUNT:3");
        assert_eq!(user_count_parsen("USER_COUNT:3"), Some(3));
        assert_eq!(user_count_parsen("USER_COUNT:abc"), None);
        assert_eq!(user_count_parsen("hallo"), None);
    }

    #[test]
    fn steuerstring_erkennung() {
        assert!(ist_steuerstring("HELLO:a:b"));
        assert!(ist_steuerstring("WELCOME:a:b:c"));
        assert!(ist_steuerstring("USER_COUNT:7"));
        assert!(!ist_steuerstring("User joined the chat"));
        assert!(!ist_steuerstring("hallo welt"));
    }

    #[test]
    fn schliess_codes_unterscheidbar() {
        assert_eq!(SchliessCode::ProtokollFehler.als_u16(), 1002);
        assert_eq!(SchliessCode::HandshakeFehler.als_u16(), 1011);
        assert_ne!(
            SchliessCode::ProtokollFehler.als_u16(),
            SchliessCode::HandshakeFehler.als_u16()
        );
        assert_eq!(
            SchliessCode::aus_u16(1002),
            Some(SchliessCode::ProtokollFehler)
        );
        assert_eq!(SchliessCode::aus_u16(4999), None);
    }
}
