//! Fehlertypen fuer Klatsch
//!
//! Zentraler Fehler-Enum entlang der Fehler-Taxonomie des Protokolls.
//! Untermodule definieren eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Klatsch
pub type Result<T> = std::result::Result<T, KlatschError>;

/// Alle moeglichen Fehlerklassen im Klatsch-System
#[derive(Debug, Error)]
pub enum KlatschError {
    /// Fehlerhafte Handshake-Felder oder falsche Server-Kennung.
    /// Schliesst die Verbindung, wird nie wiederholt, loest keine
    /// Broadcast-Seiteneffekte aus.
    #[error("Protokollverletzung: {0}")]
    Protokollverletzung(String),

    /// Key-Agreement, HKDF oder Wrap/Unwrap fehlgeschlagen.
    /// Schliesst die Verbindung mit generischem Code, faellt nie in
    /// einen unverschluesselten Modus zurueck.
    #[error("Krypto-Fehler: {0}")]
    Krypto(String),

    /// Senden an eine registrierte Verbindung fehlgeschlagen.
    /// Wird lokal durch Entfernen aus allen Registern behoben.
    #[error("Transport-Fehler: {0}")]
    Transport(String),

    /// Handshake nicht innerhalb der Frist abgeschlossen
    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    /// Konfigurationsfehler beim Start
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl KlatschError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Erstellt eine Protokollverletzung
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokollverletzung(msg.into())
    }
}
