//! Health-Check-Endpunkt fuer Klingel
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Anzahl angemeldeter Nutzer

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Server faehrt herunter
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub users_online: usize,
}

/// Liefert die aktuelle Anzahl angemeldeter Nutzer
pub type NutzerZaehler = Arc<dyn Fn() -> usize + Send + Sync>;

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    nutzer_online: NutzerZaehler,
    herunterfahren: Arc<AtomicBool>,
}

impl HealthState {
    pub fn neu(nutzer_online: NutzerZaehler) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            nutzer_online,
            herunterfahren: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Markiert den Server als herunterfahrend (`/health` liefert dann 503)
    pub fn herunterfahren_markieren(&self) {
        self.herunterfahren.store(true, Ordering::Relaxed);
    }

    pub fn faehrt_herunter(&self) -> bool {
        self.herunterfahren.load(Ordering::Relaxed)
    }

    pub fn antwort(&self) -> HealthResponse {
        HealthResponse {
            status: if self.faehrt_herunter() {
                HealthStatus::Unhealthy
            } else {
                HealthStatus::Healthy
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            users_online: (self.nutzer_online)(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = state.antwort();
    let http_status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (http_status, Json(response))
}
