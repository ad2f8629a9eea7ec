//! Axum HTTP-Server fuer das Gateway

use std::future::Future;
use std::net::SocketAddr;

use axum::http::{HeaderValue, Method};
use axum::{middleware, Router};
use klingel_observability::{health_router, request_timing_layer, timing_middleware, HealthState};
use tower_http::cors::CorsLayer;

use crate::error::GatewayResult;
use crate::{routes, GatewayState};

/// Gateway-Konfiguration
#[derive(Debug, Clone)]
pub struct GatewayKonfig {
    pub bind_addr: SocketAddr,
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt (nur fuer Entwicklung).
    pub cors_origins: Vec<String>,
}

impl Default for GatewayKonfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cors_origins: vec![],
        }
    }
}

/// CORS konfigurieren: entweder spezifische Origins oder Any
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(wert) => Some(wert),
            Err(_) => {
                tracing::warn!(origin = %o, "Ungueltiger CORS-Origin ignoriert");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

/// Baut die vollstaendige Anwendung (Relay-Routen + Health + Layer)
pub fn app(state: GatewayState, health: HealthState, cors_origins: &[String]) -> Router {
    routes::router()
        .with_state(state)
        .merge(health_router(health))
        .layer(middleware::from_fn(timing_middleware))
        .layer(request_timing_layer())
        .layer(cors_layer(cors_origins))
}

/// Axum HTTP-Server fuer das Gateway
pub struct GatewayServer {
    konfig: GatewayKonfig,
}

impl GatewayServer {
    pub fn neu(konfig: GatewayKonfig) -> Self {
        Self { konfig }
    }

    /// Startet den Server und laeuft bis `shutdown` fertig ist
    pub async fn starten<F>(
        self,
        state: GatewayState,
        health: HealthState,
        shutdown: F,
    ) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = app(state, health, &self.konfig.cors_origins);

        let listener = tokio::net::TcpListener::bind(self.konfig.bind_addr).await?;
        tracing::info!(addr = %self.konfig.bind_addr, "Gateway gestartet");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        tracing::info!("Gateway beendet");
        Ok(())
    }
}
