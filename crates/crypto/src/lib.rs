//! # klatsch-crypto
//!
//! Kryptografie-Subsystem fuer Klatsch.
//!
//! ## Module
//! - `key_exchange` - X25519-Schluesselpaare, DH-Agreement, HKDF (RFC 5869)
//! - `key_wrap`     - AES-256-GCM Einwickeln des Gruppenschluessels
//! - `group_cipher` - Nachrichten-Verschluesselung mit Passphrase- oder
//!                    installiertem Schluessel
//! - `types`        - SecretBytes, Schluesselpaar
//! - `error`        - Fehlertypen

pub mod error;
pub mod group_cipher;
pub mod key_exchange;
pub mod key_wrap;
pub mod types;

// Bequeme Re-Exporte
pub use error::{CryptoError, CryptoResult};
pub use group_cipher::GroupCipher;
pub use key_exchange::{
    gemeinsames_geheimnis, hkdf_expandieren, schluesselpaar_generieren, wrap_schluessel_ableiten,
};
pub use key_wrap::{gruppenschluessel_auswickeln, gruppenschluessel_einwickeln};
pub use types::{Schluesselpaar, SecretBytes};
