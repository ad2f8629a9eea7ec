//! Request-Timing Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage und protokolliert sie als
//! strukturiertes Log-Event. Langsame Anfragen werden als Warnung geloggt.

use axum::{
    body::Body,
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;

/// Ab dieser Dauer gilt eine Anfrage als langsam
pub const LANGSAM_AB_MS: u128 = 1000;

/// Erstellt den Tracing-Layer fuer HTTP-Anfragen (Span pro Request).
pub fn request_timing_layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    tower_http::trace::TraceLayer::new_for_http()
}

/// Axum-Middleware-Funktion: misst Antwortzeit und loggt strukturiert.
///
/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn(timing_middleware))
/// ```
pub async fn timing_middleware(req: Request<Body>, next: Next) -> Response<Body> {
    let methode = req.method().to_string();
    let pfad = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let dauer_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    if ist_langsam(dauer_ms) {
        tracing::warn!(
            method = %methode,
            path = %pfad,
            status = status,
            duration_ms = dauer_ms,
            "Langsame HTTP-Anfrage"
        );
    } else {
        tracing::info!(
            method = %methode,
            path = %pfad,
            status = status,
            duration_ms = dauer_ms,
            "HTTP-Anfrage abgeschlossen"
        );
    }

    response
}

fn ist_langsam(dauer_ms: u128) -> bool {
    dauer_ms >= LANGSAM_AB_MS
}
