//! Gemeinsame Identifikationstypen fuer Klatsch
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prozess-lebenslange, zufaellige Server-Kennung
///
/// Wird einmal beim Serverstart erzeugt und danach nicht mehr veraendert.
/// Clients muessen die exakte Kennung im HELLO-Schritt vorweisen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerKennung(pub Uuid);

impl ServerKennung {
    /// Erstellt eine neue zufaellige ServerKennung
    pub fn neu() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die Kennung als Wire-String zurueck (ohne Praefix)
    pub fn als_string(&self) -> String {
        self.0.to_string()
    }

    /// Vergleicht die Kennung mit einem vom Peer behaupteten String
    pub fn stimmt_ueberein(&self, behauptet: &str) -> bool {
        self.als_string() == behauptet
    }
}

impl std::fmt::Display for ServerKennung {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Eindeutige ID einer Transport-Verbindung im Register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    /// Erstellt eine neue zufaellige VerbindungsId
    pub fn neu() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::neu()
    }
}

impl std::fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "verbindung:{}", self.0)
    }
}
