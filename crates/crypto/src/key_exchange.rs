//! X25519 Key-Agreement und HKDF-Ableitung
//!
//! Zustandslose Primitiven fuer den Handshake:
//! 1. Beide Seiten generieren ein ephemeres X25519-Schluesselpaar
//! 2. DH-Agreement liefert ein 32-Byte Shared Secret
//! 3. HKDF (RFC 5869, SHA-256) leitet daraus den Key-Wrap-Schluessel ab
//!
//! Der Key-Wrap-Schluessel verschluesselt ausschliesslich den
//! Gruppenschluessel waehrend des Handshakes, nie Chat-Inhalte.

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::error::{CryptoError, CryptoResult};
use crate::types::Schluesselpaar;

/// HKDF-Info-Kontext fuer den Key-Wrap-Schluessel
pub const KEY_WRAP_INFO: &[u8] = b"klatsch-key-wrap-v1";

/// Generiert ein frisches ephemeres X25519-Schluesselpaar
pub fn schluesselpaar_generieren() -> Schluesselpaar {
    Schluesselpaar::generieren()
}

/// DH-Agreement mit dem rohen oeffentlichen Schluessel der Gegenseite
///
/// Schlaegt fehl wenn `peer_public` keine gueltige 32-Byte-Kodierung ist
/// oder das Agreement ein nicht-kontributives Ergebnis liefert.
pub fn gemeinsames_geheimnis(
    paar: &Schluesselpaar,
    peer_public: &[u8],
) -> CryptoResult<[u8; 32]> {
    let peer_bytes: [u8; 32] = peer_public.try_into().map_err(|_| {
        CryptoError::KeyAgreement(format!(
            "Oeffentlicher Schluessel hat {} Bytes, erwartet 32",
            peer_public.len()
        ))
    })?;

    let geheim: &StaticSecret = paar.geheimer_schluessel();
    let peer_pk = X25519PublicKey::from(peer_bytes);
    let dh = geheim.diffie_hellman(&peer_pk);

    if !dh.was_contributory() {
        return Err(CryptoError::KeyAgreement(
            "Agreement lieferte Null-Ergebnis".to_string(),
        ));
    }

    Ok(dh.to_bytes())
}

/// HKDF-SHA256 nach RFC 5869: Extract + Expand
///
/// Deterministisch: identische Eingaben erzeugen bit-identische Ausgaben
/// der angeforderten Laenge.
pub fn hkdf_expandieren(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    laenge: usize,
) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; laenge];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// Leitet den 32-Byte Key-Wrap-Schluessel einer Verbindung ab
///
/// IKM = Shared Secret, Salt = Server-Kennung (UTF-8), Info = fester
/// Anwendungskontext. Client und Server muessen exakt dieselben
/// Parameter verwenden.
pub fn wrap_schluessel_ableiten(
    shared_secret: &[u8; 32],
    server_kennung: &[u8],
) -> CryptoResult<[u8; 32]> {
    let okm = hkdf_expandieren(shared_secret, server_kennung, KEY_WRAP_INFO, 32)?;
    // Laenge ist oben fixiert, try_into kann nicht fehlschlagen
    Ok(okm.try_into().map_err(|_| {
        CryptoError::KeyDerivation("HKDF lieferte falsche Laenge".to_string())
    })?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
