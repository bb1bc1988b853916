//! Fehlertypen des Relay-Subsystems

use thiserror::Error;

use klatsch_core::KlatschError;

pub type RelayResult<T> = Result<T, RelayError>;

/// Fehler im Relay-Betrieb
#[derive(Debug, Error)]
pub enum RelayError {
    /// Bind oder Accept auf dem Listener fehlgeschlagen
    #[error("Netzwerk-Fehler: {0}")]
    Netzwerk(#[from] std::io::Error),

    /// Envelope liess sich nicht serialisieren
    #[error("Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[from] serde_json::Error),
}

impl From<RelayError> for KlatschError {
    fn from(e: RelayError) -> Self {
        KlatschError::Transport(e.to_string())
    }
}
