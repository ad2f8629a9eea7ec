//! Message-Dispatcher – Routet eingehende Push-Events an die Handler
//!
//! Die Zuordnung Topic -> Handler steht in einer expliziten Tabelle. Ein
//! Handler gibt die Events zurueck, die an den Absender gehen; Events an
//! andere Nutzer verschickt der Relay selbst.
//!
//! ## Fehlerbehandlung
//! - Protokollfehler (unbekanntes Topic, kaputte Nutzdaten) werden geloggt
//!   und verworfen, die Verbindung bleibt bestehen
//! - Unerreichbares Ziel -> `presence-unavailable {nick}` an den Absender
//! - Alles andere -> `error {message}` an den Absender

use klingel_core::ConnectionId;
use klingel_protocol::{topic, PushEvent};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};
use crate::handlers::{call_handler, session_handler};
use crate::session::SessionApi;

/// Signatur aller Topic-Handler
pub type HandlerFn =
    fn(&SessionApi, &mut DispatcherContext, &PushEvent) -> SignalingResult<Vec<PushEvent>>;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
#[derive(Debug)]
pub struct DispatcherContext {
    /// Peer-Adresse (nur fuer Logs)
    pub peer_addr: Option<SocketAddr>,
    pub verbindung_id: ConnectionId,
    /// Gebundener Nickname (None solange der Kanal wartet)
    pub nick: Option<String>,
    /// Send-Queue der Verbindung, bis sie beim Login an den Relay geht
    pub sende_tx: Option<mpsc::Sender<PushEvent>>,
    /// Verbindung nach dem Senden der Antworten schliessen
    pub schliessen: bool,
}

impl DispatcherContext {
    pub fn neu(peer_addr: Option<SocketAddr>, verbindung_id: ConnectionId) -> Self {
        Self {
            peer_addr,
            verbindung_id,
            nick: None,
            sende_tx: None,
            schliessen: false,
        }
    }

    /// Nickname des Kanal-Eigentuemers oder `NichtAngemeldet`
    pub fn eigentuemer(&self) -> SignalingResult<&str> {
        self.nick
            .as_deref()
            .ok_or_else(|| SignalingError::NichtAngemeldet(self.verbindung_id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MessageDispatcher
// ---------------------------------------------------------------------------

/// Zentraler Dispatcher mit Topic-Tabelle
pub struct MessageDispatcher {
    api: SessionApi,
    handler: HashMap<&'static str, HandlerFn>,
}

impl MessageDispatcher {
    /// Erstellt einen Dispatcher mit allen bekannten Topics
    pub fn neu(api: SessionApi) -> Self {
        let mut handler: HashMap<&'static str, HandlerFn> = HashMap::new();
        handler.insert(topic::LOGIN, session_handler::handle_login);
        handler.insert(topic::LOGOUT, session_handler::handle_logout);
        handler.insert(topic::SIDEBAR_READY, session_handler::handle_sidebar_ready);
        handler.insert(topic::CALL_OFFER, call_handler::handle_offer);
        handler.insert(topic::CALL_ANSWER, call_handler::handle_answer);
        handler.insert(topic::CALL_HANGUP, call_handler::handle_hangup);
        handler.insert(topic::CHAT_WINDOW_READY, call_handler::handle_chat_window_ready);
        Self { api, handler }
    }

    pub fn api(&self) -> &SessionApi {
        &self.api
    }

    /// Prueft ob fuer ein Topic ein Handler existiert
    pub fn kennt(&self, topic_name: &str) -> bool {
        self.handler.contains_key(topic_name)
    }

    /// Verarbeitet ein eingehendes Event und gibt die Antworten zurueck
    pub fn dispatch(&self, event: &PushEvent, ctx: &mut DispatcherContext) -> Vec<PushEvent> {
        let Some(handler) = self.handler.get(event.topic.as_str()) else {
            tracing::warn!(
                peer = ?ctx.peer_addr,
                topic = %event.topic,
                "Unbekanntes Topic verworfen"
            );
            return Vec::new();
        };

        tracing::trace!(verbindung = %ctx.verbindung_id, topic = %event.topic, "Event empfangen");

        match handler(&self.api, ctx, event) {
            Ok(antworten) => antworten,
            Err(e) if e.ist_protokollfehler() => {
                tracing::warn!(
                    peer = ?ctx.peer_addr,
                    topic = %event.topic,
                    fehler = %e,
                    "Ungueltige Nachricht verworfen"
                );
                Vec::new()
            }
            Err(SignalingError::Unerreichbar(nick)) => {
                tracing::debug!(topic = %event.topic, nick = %nick, "Ziel nicht erreichbar");
                vec![PushEvent::unerreichbar(nick)]
            }
            Err(e) => {
                tracing::debug!(topic = %event.topic, fehler = %e, "Handler-Fehler");
                vec![PushEvent::error(e.to_string())]
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
