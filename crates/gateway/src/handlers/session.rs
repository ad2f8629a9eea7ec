//! Handler fuer Anmeldung, Abmeldung und Nutzerliste

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use klingel_signaling::Anmeldung;
use serde_json::json;

use crate::error::GatewayResult;
use crate::extract::NickEingabe;
use crate::GatewayState;

/// `POST /signin` – liefert `{nick, users}`
pub async fn signin(
    State(state): State<GatewayState>,
    NickEingabe(nick): NickEingabe,
) -> GatewayResult<Json<Anmeldung>> {
    let anmeldung = state.api.signin(&nick)?;
    tracing::debug!(gewuenscht = %nick, nick = %anmeldung.nick, "Anmeldung ueber HTTP");
    Ok(Json(anmeldung))
}

/// `POST /signout` – immer `200 OK`
pub async fn signout(
    State(state): State<GatewayState>,
    NickEingabe(nick): NickEingabe,
) -> impl IntoResponse {
    state.api.signout(&nick);
    (StatusCode::OK, "OK")
}

/// `GET /users`
pub async fn users(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(json!({ "users": state.relay().nutzer_liste() }))
}
