//! Route-Definitionen fuer das Gateway

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, GatewayState};

/// Erstellt den Router mit allen Relay-Endpunkten
pub fn router() -> Router<GatewayState> {
    Router::new()
        // Session
        .route("/signin", post(handlers::session::signin))
        .route("/signout", post(handlers::session::signout))
        .route("/users", get(handlers::session::users))
        // Push-Kanal
        .route("/ws", get(handlers::ws::ws_verbinden))
}
