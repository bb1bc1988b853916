//! Accept-Schleife des Relay-Servers
//!
//! Nimmt TCP-Verbindungen an und startet pro Verbindung einen eigenen
//! Task. Der watch-Kanal traegt das Shutdown-Signal in die Schleife und
//! in jeden Verbindungs-Task hinein.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::broadcast::BroadcastVerteiler;
use crate::connection::{verbindung_verarbeiten, VerbindungsKontext};
use crate::error::RelayResult;
use crate::identity::ServerIdentity;
use crate::registry::VerbindungsRegister;

/// Der Broadcast-Relay-Server
pub struct RelayServer {
    identitaet: Arc<ServerIdentity>,
    register: Arc<VerbindungsRegister>,
    verteiler: BroadcastVerteiler,
}

impl RelayServer {
    pub fn neu(identitaet: Arc<ServerIdentity>) -> Self {
        let register = VerbindungsRegister::neu();
        let verteiler = BroadcastVerteiler::neu(Arc::clone(&register));
        Self {
            identitaet,
            register,
            verteiler,
        }
    }

    pub fn identitaet(&self) -> Arc<ServerIdentity> {
        Arc::clone(&self.identitaet)
    }

    /// Das Verbindungs-Register (z.B. fuer Diagnose und Tests)
    pub fn register(&self) -> Arc<VerbindungsRegister> {
        Arc::clone(&self.register)
    }

    /// Bedient den gebundenen Listener bis zum Shutdown-Signal
    pub async fn starten(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> RelayResult<()> {
        let adresse = listener.local_addr()?;
        info!(%adresse, kennung = %self.identitaet.kennung(), "Relay-Server lauscht");

        let kontext = VerbindungsKontext {
            identitaet: Arc::clone(&self.identitaet),
            register: Arc::clone(&self.register),
            verteiler: self.verteiler.clone(),
        };

        let mut shutdown = shutdown_rx.clone();
        loop {
            tokio::select! {
                angenommen = listener.accept() => {
                    match angenommen {
                        Ok((stream, peer)) => {
                            tokio::spawn(verbindung_verarbeiten(
                                kontext.clone(),
                                stream,
                                peer,
                                shutdown_rx.clone(),
                            ));
                        }
                        Err(e) => {
                            // Einzelner Accept-Fehler beendet den Server nicht
                            debug!(fehler = %e, "Accept fehlgeschlagen");
                        }
                    }
                }
                Ok(()) = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Shutdown-Signal empfangen, Accept-Schleife endet");
                        return Ok(());
                    }
                }
            }
        }
    }
}
