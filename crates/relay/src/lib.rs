//! # klatsch-relay
//!
//! Serverseitiges Relay fuer Klatsch: nimmt Verbindungen an, fuehrt den
//! Handshake mit Gruppenschluessel-Verteilung durch und sendet Envelopes
//! blind an alle authentifizierten Teilnehmer weiter. Chat-Inhalte
//! bleiben fuer das Relay opak (`ENC:`-Ciphertext wird nie entschluesselt).
//!
//! ## Module
//! - `identity`   - Kennung, Schluesselpaar und Gruppenschluessel des Servers
//! - `registry`   - Verbindungs-Register mit Authentifizierungs-Teilmenge
//! - `broadcast`  - Verteiler fuer Chat, Join/Leave und USER_COUNT
//! - `handshake`  - HELLO-Verarbeitung und WELCOME-Erzeugung
//! - `connection` - select-Schleife einer einzelnen Verbindung
//! - `server`     - Accept-Schleife

pub mod broadcast;
mod connection;
pub mod error;
pub mod handshake;
pub mod identity;
pub mod registry;
pub mod server;

pub use broadcast::BroadcastVerteiler;
pub use error::{RelayError, RelayResult};
pub use handshake::{hello_verarbeiten, HandshakeAblehnung};
pub use identity::ServerIdentity;
pub use registry::{ClientSender, SendeStatus, VerbindungsRegister};
pub use server::RelayServer;
