//! Serverseitige Handshake-Verarbeitung
//!
//! Reine Funktion ohne Socket-Bezug: nimmt den HELLO-Content einer
//! Verbindung und liefert entweder den fertigen WELCOME-Content oder
//! eine klassifizierte Ablehnung. Der Verbindungs-Task uebersetzt die
//! Ablehnung in den passenden Schliess-Code.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use klatsch_crypto::{
    gemeinsames_geheimnis, gruppenschluessel_einwickeln, wrap_schluessel_ableiten,
};
use klatsch_protocol::control::{Hello, SchliessCode, Welcome};

use crate::identity::ServerIdentity;

/// Klassifizierte Handshake-Ablehnung
///
/// Der Grund-Text dient nur dem Server-Log; auf dem Draht reist
/// ausschliesslich der Schliess-Code mit generischem Reason-Text,
/// nie die behauptete Kennung oder Krypto-Details.
#[derive(Debug)]
pub enum HandshakeAblehnung {
    /// Fehlende Felder oder falsche Server-Kennung
    Protokoll(String),
    /// Dekodierung, Agreement oder Wrap fehlgeschlagen
    Krypto(String),
}

impl HandshakeAblehnung {
    pub fn schliess_code(&self) -> SchliessCode {
        match self {
            HandshakeAblehnung::Protokoll(_) => SchliessCode::ProtokollFehler,
            HandshakeAblehnung::Krypto(_) => SchliessCode::HandshakeFehler,
        }
    }

    /// Generischer Reason-Text fuer den Close-Frame
    pub fn wire_grund(&self) -> &'static str {
        match self {
            HandshakeAblehnung::Protokoll(_) => "protocol error",
            HandshakeAblehnung::Krypto(_) => "handshake failure",
        }
    }

    /// Interner Grund fuer das Server-Log
    pub fn log_grund(&self) -> &str {
        match self {
            HandshakeAblehnung::Protokoll(g) | HandshakeAblehnung::Krypto(g) => g,
        }
    }
}

/// Verarbeitet einen HELLO-Content und baut die WELCOME-Antwort
///
/// Ablauf: Felder pruefen, Kennung abgleichen, Client-Schluessel
/// dekodieren, DH-Agreement, HKDF-Ableitung, Gruppenschluessel
/// einwickeln. Jeder Krypto-Fehlschlag ist nach aussen generisch.
pub fn hello_verarbeiten(
    identitaet: &ServerIdentity,
    content: &str,
) -> Result<String, HandshakeAblehnung> {
    let hello = Hello::parsen(content)
        .map_err(|e| HandshakeAblehnung::Protokoll(e.to_string()))?;

    if !identitaet.kennung().stimmt_ueberein(&hello.server_kennung) {
        // Die behauptete Kennung absichtlich nicht mitloggen
        return Err(HandshakeAblehnung::Protokoll(
            "Server-Kennung stimmt nicht ueberein".to_string(),
        ));
    }

    let client_public = BASE64
        .decode(&hello.client_public_key_b64)
        .map_err(|e| HandshakeAblehnung::Krypto(format!("Base64-Dekodierung: {e}")))?;

    let geheimnis = gemeinsames_geheimnis(identitaet.schluesselpaar(), &client_public)
        .map_err(|e| HandshakeAblehnung::Krypto(e.to_string()))?;

    let wrap_schluessel =
        wrap_schluessel_ableiten(&geheimnis, identitaet.kennung().als_string().as_bytes())
            .map_err(|e| HandshakeAblehnung::Krypto(e.to_string()))?;

    let eingewickelt =
        gruppenschluessel_einwickeln(identitaet.gruppenschluessel().as_bytes(), &wrap_schluessel)
            .map_err(|e| HandshakeAblehnung::Krypto(e.to_string()))?;

    Ok(Welcome::bauen(
        &identitaet.kennung().als_string(),
        &BASE64.encode(identitaet.schluesselpaar().oeffentlicher_schluessel()),
        &BASE64.encode(eingewickelt),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
