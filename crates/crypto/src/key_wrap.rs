//! Ein- und Auswickeln des Gruppenschluessels
//!
//! Der Server verschluesselt seinen stehenden 32-Byte-Gruppenschluessel
//! pro Verbindung unter dem via HKDF abgeleiteten Key-Wrap-Schluessel.
//! Format: nonce(12) || ciphertext+tag(16). Der Client wickelt mit dem
//! identisch abgeleiteten Schluessel wieder aus.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

/// Nonce-Laenge fuer AES-256-GCM (96 Bit)
const NONCE_LAENGE: usize = 12;

/// Mindestlaenge eines eingewickelten Schluessels: Nonce + 1 Byte
const MIN_WRAPPED_LAENGE: usize = NONCE_LAENGE + 1;

/// Wickelt den Gruppenschluessel unter dem Key-Wrap-Schluessel ein
///
/// Verwendet eine frische zufaellige 96-Bit-Nonce und haengt den
/// 128-Bit-Auth-Tag an den Ciphertext an (aes-gcm-Standard).
pub fn gruppenschluessel_einwickeln(
    gruppenschluessel: &[u8],
    wrap_schluessel: &[u8; 32],
) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(wrap_schluessel));

    let mut nonce_bytes = [0u8; NONCE_LAENGE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, gruppenschluessel)
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LAENGE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Wickelt einen Gruppenschluessel wieder aus
///
/// Schlaegt fehl bei zu kurzer Eingabe oder fehlgeschlagener
/// Authentifizierung; der Aufrufer darf in diesem Fall keinen
/// Cipher-Zustand veraendern.
pub fn gruppenschluessel_auswickeln(
    eingewickelt: &[u8],
    wrap_schluessel: &[u8; 32],
) -> CryptoResult<SecretBytes> {
    if eingewickelt.len() < MIN_WRAPPED_LAENGE {
        return Err(CryptoError::UngueltigeDaten(format!(
            "Eingewickelter Schluessel zu kurz: {} Bytes",
            eingewickelt.len()
        )));
    }

    let (nonce_bytes, ciphertext) = eingewickelt.split_at(NONCE_LAENGE);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(wrap_schluessel));
    let nonce = Nonce::from_slice(nonce_bytes);

    let klartext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Entschluesselung(e.to_string()))?;

    Ok(SecretBytes::new(klartext))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
