//! Das Nachrichten-Envelope `{sender, content, timestamp}`
//!
//! Jede Wire-Nachricht ist genau dieses Drei-Felder-Envelope als JSON.
//! `timestamp` ist fuer alle vom Server weitergeleiteten oder erzeugten
//! Nachrichten autoritativ vom Server gesetzt; Client-Timestamps auf
//! ausgehenden Nachrichten werden serverseitig verworfen.

use serde::{Deserialize, Serialize};

use crate::control;

/// Absender-Name fuer protokollinterne Nachrichten (WELCOME, USER_COUNT)
pub const SYSTEM_SENDER: &str = "System";

/// Absender-Name fuer menschenlesbare Server-Hinweise (Join/Leave)
pub const SERVER_SENDER: &str = "Server";

/// Eine Chat-Nachricht auf dem Draht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Anzeigename des Absenders
    pub sender: String,
    /// Klartext, `ENC:`-praefixierter Ciphertext oder Steuerstring
    pub content: String,
    /// Unix-Epoch in Millisekunden (64 Bit)
    pub timestamp: i64,
}

impl ChatMessage {
    /// Erstellt eine neue Nachricht mit explizitem Timestamp
    pub fn neu(sender: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp,
        }
    }

    /// Erstellt eine protokollinterne Nachricht (Absender `System`)
    pub fn system(content: impl Into<String>) -> Self {
        Self::neu(SYSTEM_SENDER, content, jetzt_ms())
    }

    /// Erstellt einen menschenlesbaren Server-Hinweis (Absender `Server`)
    pub fn server_hinweis(content: impl Into<String>) -> Self {
        Self::neu(SERVER_SENDER, content, jetzt_ms())
    }

    /// Setzt den Timestamp auf die Server-Zeit (verwirft den Client-Wert)
    pub fn timestamp_stempeln(&mut self) {
        self.timestamp = jetzt_ms();
    }

    /// Prueft ob der Inhalt ein reservierter Steuerstring ist
    ///
    /// Steuerstrings werden nie als Chat-Text an die UI gereicht und nie
    /// durch den Gruppen-Cipher geschickt.
    pub fn ist_steuernachricht(&self) -> bool {
        control::ist_steuerstring(&self.content)
    }

    /// Serialisiert das Envelope zu JSON
    pub fn als_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialisiert ein Envelope aus JSON
    pub fn aus_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Aktuelle Unix-Zeit in Millisekunden
pub fn jetzt_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_feldnamen_sind_wire_kompatibel() {
        let msg = ChatMessage::neu("Alice", "hi", 1_700_000_000_000);
        let json = msg.als_json().unwrap();
        assert!(json.contains("\"sender\":\"Alice\""));
        assert!(json.contains("\"content\":\"hi\""));
        assert!(json.contains("\"timestamp\":1700000000000"));
    }

    #[test]
    fn json_roundtrip() {
        let msg = ChatMessage::neu("Bob", "Hallo zusammen", 42);
        let wieder = ChatMessage::aus_json(&msg.als_json().unwrap()).unwrap();
        assert_eq!(msg, wieder);
    }

    #[test]
    fn system_und_server_absender() {
        assert_eq!(ChatMessage::system("USER_COUNT:3").sender, "System");
        assert_eq!(
            ChatMessage::server_hinweis("User joined the chat").sender,
            "Server"
        );
    }

    #[test]
    fn timestamp_stempeln_ueberschreibt_client_wert() {
        let mut msg = ChatMessage::neu("Alice", "hi", 1);
        msg.timestamp_stempeln();
        assert!(msg.timestamp > 1_600_000_000_000);
    }

    #[test]
    fn steuernachricht_erkennung() {
        assert!(ChatMessage::system("USER_COUNT:1").ist_steuernachricht());
        assert!(ChatMessage::neu("x", "HELLO:a:b", 0).ist_steuernachricht());
        assert!(!ChatMessage::neu("x", "hallo welt", 0).ist_steuernachricht());
    }

    #[test]
    fn ungueltiges_json_gibt_fehler() {
        assert!(ChatMessage::aus_json("{kein json").is_err());
    }
}
