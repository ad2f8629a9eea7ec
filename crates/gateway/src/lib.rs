//! klingel-gateway – HTTP- und WebSocket-Zugang zum Relay
//!
//! Endpunkte:
//! - `POST /signin`  – Anmelden (Form- oder JSON-Feld `nick`)
//! - `POST /signout` – Abmelden (idempotent)
//! - `GET  /users`   – Angemeldete Nutzer
//! - `GET  /ws`      – WebSocket-Push-Kanal (`?nick=` optional)
//! - `GET  /health`  – Health-Check (aus `klingel-observability`)

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod server;

use klingel_signaling::{MessageDispatcher, Relay, SessionApi};
use std::sync::Arc;
use tokio::sync::watch;

pub use error::{GatewayError, GatewayResult};
pub use server::{app, GatewayKonfig, GatewayServer};

/// Axum-State fuer das Gateway
#[derive(Clone)]
pub struct GatewayState {
    pub api: SessionApi,
    pub dispatcher: Arc<MessageDispatcher>,
    /// Wird beim Herunterfahren auf `true` gesetzt und beendet alle Push-Kanaele
    pub shutdown_rx: watch::Receiver<bool>,
}

impl GatewayState {
    pub fn neu(relay: Arc<Relay>, shutdown_rx: watch::Receiver<bool>) -> Self {
        let api = SessionApi::neu(relay);
        let dispatcher = Arc::new(MessageDispatcher::neu(api.clone()));
        Self {
            api,
            dispatcher,
            shutdown_rx,
        }
    }

    pub fn relay(&self) -> &Arc<Relay> {
        self.api.relay()
    }
}
