//! Fehlertypen fuer das Klingel-Gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use klingel_signaling::SignalingError;
use serde_json::json;
use thiserror::Error;

/// Alle moeglichen Fehler im Gateway-Crate
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Nicht angemeldet: {0}")]
    NichtAngemeldet(String),

    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// HTTP-Statuscode fuer REST-Fehler
impl GatewayError {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::UngueltigeEingabe(_) => StatusCode::BAD_REQUEST,
            Self::NichtAngemeldet(_) => StatusCode::FORBIDDEN,
            Self::Signaling(SignalingError::Validierung(_)) => StatusCode::BAD_REQUEST,
            Self::Signaling(SignalingError::NichtAngemeldet(_)) => StatusCode::FORBIDDEN,
            Self::Signaling(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(fehler = %self, "Interner Gateway-Fehler");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
