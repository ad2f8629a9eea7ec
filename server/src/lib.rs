//! klingel-server – Bibliotheks-Root
//!
//! Verdrahtet Relay, Gateway und Health-Check und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use klingel_gateway::{GatewayKonfig, GatewayServer, GatewayState};
use klingel_observability::HealthState;
use klingel_signaling::Relay;
use std::sync::Arc;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Server und laeuft bis zum Shutdown-Signal (Ctrl-C)
    ///
    /// Beim Shutdown meldet `/health` 503, alle Push-Kanaele werden
    /// geschlossen und der HTTP-Server beendet laufende Anfragen.
    pub async fn starten(self) -> Result<()> {
        self.config.validieren()?;
        let bind_addr = self.config.http_bind_adresse()?;

        let relay = Relay::neu(self.config.relay_config());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = GatewayState::neu(Arc::clone(&relay), shutdown_rx);

        let zaehler = Arc::clone(&relay);
        let health = HealthState::neu(Arc::new(move || zaehler.online_anzahl()));

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %bind_addr,
            max_nick_laenge = self.config.server.max_nick_laenge,
            send_queue = self.config.kanal.send_queue_groesse,
            "Server startet"
        );

        let health_shutdown = health.clone();
        let shutdown = async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen");
            }
            tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
            health_shutdown.herunterfahren_markieren();
            let _ = shutdown_tx.send(true);
        };

        let konfig = GatewayKonfig {
            bind_addr,
            cors_origins: self.config.cors.origins.clone(),
        };
        GatewayServer::neu(konfig)
            .starten(state, health, shutdown)
            .await?;

        tracing::info!("Server beendet");
        Ok(())
    }
}
