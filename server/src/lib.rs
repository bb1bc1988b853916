//! klatsch-server – Bibliotheks-Root
//!
//! Setzt Identitaet und Relay zusammen und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::watch;

use klatsch_relay::{RelayServer, ServerIdentity};

use config::ServerConfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Relay-Server und laeuft bis zum Shutdown-Signal
    pub async fn starten(self) -> Result<()> {
        let identitaet = Arc::new(ServerIdentity::generieren());
        // Die Kennung muss ins Log: Clients brauchen sie fuer ihr HELLO
        tracing::info!(
            server_name = %self.config.server.name,
            kennung = %identitaet.kennung(),
            "Server-Identitaet erzeugt"
        );

        let listener = TcpListener::bind(self.config.bind_adresse()).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let relay = RelayServer::neu(identitaet);
        let relay_task = tokio::spawn(relay.starten(listener, shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        let _ = shutdown_tx.send(true);
        relay_task.await??;
        Ok(())
    }
}
