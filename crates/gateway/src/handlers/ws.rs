//! WebSocket-Upgrade fuer Push-Kanaele
//!
//! Uebersetzt axum-`Message`s in [`Eingehend`] und Text-Frames zurueck in
//! `Message::Text`; den Rest erledigt [`ClientConnection`].

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Query, State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use klingel_signaling::{ClientConnection, Eingehend, MessageDispatcher};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::GatewayError;
use crate::GatewayState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub nick: Option<String>,
}

/// `GET /ws?nick=<nick>`
///
/// Ein unbekannter Nickname wird vor dem Upgrade mit 403 abgewiesen. Ohne
/// `nick` startet der Kanal wartend und meldet sich per `login` an.
pub async fn ws_verbinden(
    State(state): State<GatewayState>,
    Query(query): Query<WsQuery>,
    verbindung: Option<ConnectInfo<SocketAddr>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let nick = query.nick.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    if let Some(nick) = &nick {
        if !state.relay().ist_angemeldet(nick) {
            tracing::warn!(nick = %nick, "WebSocket fuer unbekannten Nutzer abgewiesen");
            return GatewayError::NichtAngemeldet(nick.clone()).into_response();
        }
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(ablehnung) => return ablehnung.into_response(),
    };

    let peer = verbindung.map(|ConnectInfo(addr)| addr);
    let max_groesse = state.relay().config().max_frame_groesse;
    let dispatcher = Arc::clone(&state.dispatcher);
    let shutdown_rx = state.shutdown_rx.clone();

    ws.max_message_size(max_groesse)
        .on_upgrade(move |socket| verbindung_bedienen(socket, dispatcher, nick, peer, shutdown_rx))
}

async fn verbindung_bedienen(
    socket: WebSocket,
    dispatcher: Arc<MessageDispatcher>,
    nick: Option<String>,
    peer: Option<SocketAddr>,
    shutdown_rx: watch::Receiver<bool>,
) {
    let (sender, empfaenger) = socket.split();
    let sink = Box::pin(sender.with(|text: String| async move {
        Ok::<_, axum::Error>(Message::Text(text))
    }));
    let stream = empfaenger.map(|frame| frame.map(eingehend));

    ClientConnection::neu(dispatcher, peer)
        .verarbeiten(nick, sink, stream, shutdown_rx)
        .await;
}

/// Bildet eine axum-Nachricht auf einen transportunabhaengigen Frame ab
fn eingehend(nachricht: Message) -> Eingehend {
    match nachricht {
        Message::Text(text) => Eingehend::Text(text),
        Message::Binary(_) => Eingehend::Binaer,
        Message::Ping(_) | Message::Pong(_) => Eingehend::Steuerung,
        Message::Close(_) => Eingehend::Schliessen,
    }
}
