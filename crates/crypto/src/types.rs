//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes(pub Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Erstellt 32 zufaellige Schluessel-Bytes (z.B. fuer den Gruppenschluessel)
    pub fn zufaellig_32() -> Self {
        use rand::RngCore;
        let mut bytes = vec![0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ephemeres X25519-Schluesselpaar fuer den Handshake
///
/// Verwendet `StaticSecret`, weil der private Schluessel zwischen dem
/// Senden von HELLO und dem Eintreffen von WELCOME ueberleben muss.
/// Das Paar lebt trotzdem nur eine Verbindung lang und wird nie
/// wiederverwendet.
pub struct Schluesselpaar {
    geheim: StaticSecret,
    oeffentlich: [u8; 32],
}

impl Schluesselpaar {
    /// Generiert ein frisches Schluesselpaar
    pub fn generieren() -> Self {
        let geheim = StaticSecret::random_from_rng(OsRng);
        let oeffentlich = X25519PublicKey::from(&geheim).to_bytes();
        Self { geheim, oeffentlich }
    }

    /// Oeffentlicher Schluessel (32 Bytes, roh)
    pub fn oeffentlicher_schluessel(&self) -> &[u8; 32] {
        &self.oeffentlich
    }

    /// Privater Schluessel fuer das DH-Agreement
    pub(crate) fn geheimer_schluessel(&self) -> &StaticSecret {
        &self.geheim
    }
}

impl std::fmt::Debug for Schluesselpaar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Schluesselpaar {{ oeffentlich: [32 Bytes], geheim: [REDACTED] }}")
    }
}
