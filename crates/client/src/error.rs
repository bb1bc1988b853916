//! Fehlertypen der Client-Bibliothek

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Fehler auf der Client-Seite
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-Verbindung liess sich nicht aufbauen
    #[error("Verbindungsaufbau fehlgeschlagen: {0}")]
    Verbindung(String),

    /// Senden vor abgeschlossenem Handshake ist nicht erlaubt
    #[error("Handshake nicht abgeschlossen, Senden abgelehnt")]
    HandshakeUnvollstaendig,

    /// Lokale Sende-Queue ist voll
    #[error("Sende-Queue voll, Nachricht verworfen")]
    SendeQueueVoll,

    /// Der Verbindungs-Task laeuft nicht mehr
    #[error("Verbindung bereits beendet")]
    Beendet,
}
