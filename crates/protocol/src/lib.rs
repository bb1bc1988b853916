//! klatsch-protocol – Nachrichten-Envelope und Steuerstrings
//!
//! Definiert das Drei-Felder-Envelope `{sender, content, timestamp}` und
//! die Handshake-Steuerstrings (`HELLO:`, `WELCOME:`, `USER_COUNT:`), die
//! im `content`-Feld transportiert werden.
//!
//! ## Design
//! - JSON-Serialisierung via serde (exakte Feldnamen, Wire-kompatibel)
//! - Steuerstrings sind case-sensitiv und Doppelpunkt-getrennt; nur das
//!   letzte Feld darf Doppelpunkte enthalten
//! - Steuerstrings erreichen nie die UI und werden nie verschluesselt

pub mod control;
pub mod message;

// Bequeme Re-Exporte
pub use control::{Hello, SchliessCode, Welcome};
pub use message::ChatMessage;
