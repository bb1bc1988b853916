//! Fehlertypen fuer das Kryptografie-Subsystem

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key-Agreement fehlgeschlagen: {0}")]
    KeyAgreement(String),

    #[error("Key Derivation fehlgeschlagen: {0}")]
    KeyDerivation(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),
}

impl From<CryptoError> for klatsch_core::KlatschError {
    fn from(e: CryptoError) -> Self {
        klatsch_core::KlatschError::Krypto(e.to_string())
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
