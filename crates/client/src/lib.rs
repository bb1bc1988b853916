//! # klatsch-client
//!
//! Client-Bibliothek fuer Klatsch: Transport-Aufbau, Handshake mit
//! Gruppenschluessel-Empfang und ein Ereignisstrom fuer die UI.
//!
//! ## Module
//! - `handshake` - zustandsgetriebene Handshake-Maschine (ohne Socket-Bezug)
//! - `client`    - `MessengerClient` mit Verbindungs-Task und Ereignissen
//! - `error`     - Fehlertypen

pub mod client;
pub mod error;
pub mod handshake;

pub use client::{ClientEreignis, MessengerClient};
pub use error::{ClientError, ClientResult};
pub use handshake::{HandshakeAktion, HandshakeSession, HANDSHAKE_FRIST};
