//! Extraktor fuer das `nick`-Feld aus Form- oder JSON-Bodies

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::Deserialize;

use crate::error::GatewayError;

#[derive(Debug, Deserialize)]
struct NickFeld {
    nick: String,
}

/// Der vom Client gewuenschte Nickname (noch nicht validiert)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NickEingabe(pub String);

/// Prueft ob der Request einen JSON-Body ankuendigt
fn ist_json(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("application/json"))
}

#[async_trait]
impl<S> FromRequest<S> for NickEingabe
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let feld = if ist_json(&req) {
            let Json(feld) = Json::<NickFeld>::from_request(req, state)
                .await
                .map_err(|e| GatewayError::UngueltigeEingabe(e.body_text()))?;
            feld
        } else {
            let Form(feld) = Form::<NickFeld>::from_request(req, state)
                .await
                .map_err(|e| GatewayError::UngueltigeEingabe(e.body_text()))?;
            feld
        };
        Ok(Self(feld.nick))
    }
}
