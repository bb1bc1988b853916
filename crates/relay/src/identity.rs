//! Prozess-lebenslange Server-Identitaet
//!
//! Beim Start erzeugt der Server einmalig seine Kennung, ein
//! X25519-Schluesselpaar und den 32-Byte-Gruppenschluessel. Alle drei
//! bleiben bis zum Prozessende unveraendert; jede Verbindung bekommt
//! denselben Gruppenschluessel individuell eingewickelt.

use klatsch_core::ServerKennung;
use klatsch_crypto::{Schluesselpaar, SecretBytes};

/// Unveraenderliche Identitaet eines laufenden Servers
pub struct ServerIdentity {
    kennung: ServerKennung,
    schluesselpaar: Schluesselpaar,
    gruppenschluessel: SecretBytes,
}

impl ServerIdentity {
    /// Erzeugt eine frische Identitaet (Kennung, Schluesselpaar, Gruppenschluessel)
    pub fn generieren() -> Self {
        Self {
            kennung: ServerKennung::neu(),
            schluesselpaar: Schluesselpaar::generieren(),
            gruppenschluessel: SecretBytes::zufaellig_32(),
        }
    }

    pub fn kennung(&self) -> &ServerKennung {
        &self.kennung
    }

    pub fn schluesselpaar(&self) -> &Schluesselpaar {
        &self.schluesselpaar
    }

    /// Der stehende Gruppenschluessel (nur zum Einwickeln im Handshake)
    pub fn gruppenschluessel(&self) -> &SecretBytes {
        &self.gruppenschluessel
    }
}

impl std::fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerIdentity")
            .field("kennung", &self.kennung)
            .finish_non_exhaustive()
    }
}
