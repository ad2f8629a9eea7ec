//! Client-Connection – Verwaltet einen einzelnen Push-Kanal
//!
//! Jede WebSocket-Verbindung bekommt eine `ClientConnection` in einem
//! eigenen tokio-Task. Die Verbindung ist transportunabhaengig: sie liest
//! [`Eingehend`]-Frames aus einem Stream und schreibt Text-Frames in einen
//! Sink. Das Gateway uebersetzt axum-Nachrichten in beide Richtungen.
//!
//! ## Ablauf
//! ```text
//! mit Nick:  kanal_binden -> presence-open
//! ohne Nick: presence-pending -> (login) -> gebunden
//!     |
//!     v
//! Schleife: Send-Queue -> Socket, Socket -> Dispatcher -> Socket
//!     |
//!     v
//! Ende (Close, Fehler, Queue zu, logout, Shutdown) -> kanal_schliessen
//! ```
//!
//! Die Send-Queue gehoert nach dem Binden dem Relay. Ersetzt der Relay den
//! Kanal oder meldet den Nutzer ab, endet `recv()` mit `None` und die
//! Verbindung schliesst sich.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use klingel_core::ConnectionId;
use klingel_protocol::control::ErrorInfo;
use klingel_protocol::{topic, PushEvent, WireCodec};
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};

// ---------------------------------------------------------------------------
// Eingehende Frames
// ---------------------------------------------------------------------------

/// Transportunabhaengiger eingehender Frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eingehend {
    /// Text-Frame mit JSON
    Text(String),
    /// Binaer-Frame (nicht unterstuetzt)
    Binaer,
    /// Ping/Pong, vom Transport selbst beantwortet
    Steuerung,
    /// Close-Frame
    Schliessen,
}

// ---------------------------------------------------------------------------
// ClientConnection
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne Push-Kanal-Verbindung
pub struct ClientConnection {
    dispatcher: Arc<MessageDispatcher>,
    codec: WireCodec,
    peer_addr: Option<SocketAddr>,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(dispatcher: Arc<MessageDispatcher>, peer_addr: Option<SocketAddr>) -> Self {
        let codec = WireCodec::with_max_size(dispatcher.api().relay().config().max_frame_groesse);
        Self {
            dispatcher,
            codec,
            peer_addr,
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, der Relay den Kanal schliesst, der
    /// Client sich abmeldet oder das Shutdown-Signal kommt. Danach wird der
    /// Kanal beim Relay abgemeldet.
    pub async fn verarbeiten<S, St, E>(
        self,
        nick: Option<String>,
        mut sink: S,
        mut stream: St,
        mut shutdown_rx: watch::Receiver<bool>,
    ) where
        S: Sink<String> + Unpin,
        S::Error: Display,
        St: Stream<Item = Result<Eingehend, E>> + Unpin,
        E: Display,
    {
        let peer = self.peer_addr;
        let relay = Arc::clone(self.dispatcher.api().relay());
        let id = ConnectionId::new();
        let (sende_tx, mut sende_rx) = relay.send_queue();
        let mut ctx = DispatcherContext::neu(peer, id);

        tracing::info!(peer = ?peer, verbindung = %id, nick = ?nick, "Neue Push-Verbindung");

        // Begruessung: sofort binden oder auf login warten
        let begruessung = match nick {
            Some(nick) => match relay.kanal_binden(&nick, id, sende_tx) {
                Ok(()) => {
                    ctx.nick = Some(nick);
                    PushEvent::leer(topic::PRESENCE_OPEN)
                }
                Err(e) => {
                    tracing::warn!(peer = ?peer, fehler = %e, "Push-Kanal konnte nicht gebunden werden");
                    let _ = self.senden(&mut sink, &PushEvent::error(e.to_string())).await;
                    let _ = sink.close().await;
                    return;
                }
            },
            None => {
                ctx.sende_tx = Some(sende_tx);
                PushEvent::leer(topic::PRESENCE_PENDING)
            }
        };
        if !self.senden(&mut sink, &begruessung).await {
            relay.kanal_schliessen(&id);
            return;
        }

        'verbindung: loop {
            tokio::select! {
                biased;

                // Ausgehendes Event aus der Send-Queue
                ausgehend = sende_rx.recv() => {
                    match ausgehend {
                        Some(event) => {
                            if !self.senden(&mut sink, &event).await {
                                break 'verbindung;
                            }
                        }
                        None => {
                            tracing::info!(verbindung = %id, "Push-Kanal vom Relay geschlossen");
                            break 'verbindung;
                        }
                    }
                }

                // Eingehender Frame vom Client
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Eingehend::Text(text))) => {
                            let events = match self.codec.decode(&text) {
                                Ok(events) => events,
                                Err(e) => {
                                    tracing::warn!(peer = ?peer, fehler = %e, "Frame verworfen");
                                    continue;
                                }
                            };
                            for event in events {
                                for antwort in self.dispatcher.dispatch(&event, &mut ctx) {
                                    if !self.senden(&mut sink, &antwort).await {
                                        break 'verbindung;
                                    }
                                }
                                if ctx.schliessen {
                                    tracing::info!(verbindung = %id, "Verbindung nach Abmeldung geschlossen");
                                    break 'verbindung;
                                }
                            }
                        }
                        Some(Ok(Eingehend::Binaer)) => {
                            let fehler = PushEvent::neu(
                                topic::WEBSOCKET_ERROR,
                                ErrorInfo {
                                    message: "Binaer-Frames werden nicht unterstuetzt".into(),
                                },
                            );
                            if !self.senden(&mut sink, &fehler).await {
                                break 'verbindung;
                            }
                        }
                        Some(Ok(Eingehend::Steuerung)) => {}
                        Some(Ok(Eingehend::Schliessen)) | None => {
                            tracing::info!(peer = ?peer, "Verbindung vom Client getrennt");
                            break 'verbindung;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = ?peer, fehler = %e, "Frame-Lesefehler");
                            break 'verbindung;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = ?peer, "Shutdown-Signal – Verbindung wird getrennt");
                        break 'verbindung;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        relay.kanal_schliessen(&id);
        let _ = sink.close().await;

        tracing::info!(peer = ?peer, verbindung = %id, "Verbindungs-Task beendet");
    }

    /// Kodiert und sendet ein Event; `false` wenn der Socket weg ist
    async fn senden<S>(&self, sink: &mut S, event: &PushEvent) -> bool
    where
        S: Sink<String> + Unpin,
        S::Error: Display,
    {
        let text = match self.codec.encode(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(topic = %event.topic, fehler = %e, "Event nicht kodierbar – verworfen");
                return true;
            }
        };
        match sink.send(text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(peer = ?self.peer_addr, fehler = %e, "Senden fehlgeschlagen");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::{Relay, RelayConfig};
    use crate::session::SessionApi;
    use futures_util::{sink, stream};
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    type Ausgabe = Arc<Mutex<Vec<String>>>;

    fn dispatcher() -> Arc<MessageDispatcher> {
        Arc::new(MessageDispatcher::neu(SessionApi::neu(Relay::neu(
            RelayConfig::default(),
        ))))
    }

    fn sammel_sink(ausgabe: Ausgabe) -> impl Sink<String, Error = std::io::Error> + Unpin {
        Box::pin(sink::unfold(ausgabe, |ausgabe, text: String| async move {
            ausgabe.lock().push(text);
            Ok::<_, std::io::Error>(ausgabe)
        }))
    }

    fn frames(
        texte: &[Value],
    ) -> impl Stream<Item = Result<Eingehend, std::io::Error>> + Unpin {
        let frames: Vec<_> = texte
            .iter()
            .map(|v| Ok(Eingehend::Text(v.to_string())))
            .collect();
        stream::iter(frames)
    }

    fn gesendet(ausgabe: &Ausgabe) -> Vec<Value> {
        ausgabe
            .lock()
            .iter()
            .map(|t| serde_json::from_str(t).expect("gueltiges JSON"))
            .collect()
    }

    #[tokio::test]
    async fn ohne_nick_startet_wartend_und_login_klappt() {
        let d = dispatcher();
        let ausgabe = Ausgabe::default();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        ClientConnection::neu(Arc::clone(&d), None)
            .verarbeiten(
                None,
                sammel_sink(Arc::clone(&ausgabe)),
                frames(&[json!({"login": {"username": "foo"}})]),
                shutdown_rx,
            )
            .await;

        let frames = gesendet(&ausgabe);
        assert_eq!(frames[0], json!({"presence-pending": {}}));
        assert_eq!(frames[1], json!({"login-success": {"nick": "foo", "users": []}}));
        // Stream zu Ende -> Kanal verloren -> abgemeldet
        assert!(d.api().relay().nutzer_liste().is_empty());
    }

    #[tokio::test]
    async fn mit_nick_wird_sofort_gebunden() {
        let d = dispatcher();
        d.api().signin("alice").unwrap();
        let ausgabe = Ausgabe::default();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        ClientConnection::neu(Arc::clone(&d), None)
            .verarbeiten(
                Some("alice".into()),
                sammel_sink(Arc::clone(&ausgabe)),
                frames(&[json!({"topic": "sidebar-ready", "data": {}})]),
                shutdown_rx,
            )
            .await;

        let frames = gesendet(&ausgabe);
        assert_eq!(frames[0], json!({"presence-open": {}}));
        assert_eq!(frames[1], json!({"login-success": {"nick": "alice"}}));
        assert_eq!(frames[2], json!({"users": []}));
    }

    #[tokio::test]
    async fn unbekannter_nick_wird_abgewiesen() {
        let d = dispatcher();
        let ausgabe = Ausgabe::default();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        ClientConnection::neu(Arc::clone(&d), None)
            .verarbeiten(
                Some("niemand".into()),
                sammel_sink(Arc::clone(&ausgabe)),
                frames(&[]),
                shutdown_rx,
            )
            .await;

        let frames = gesendet(&ausgabe);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].get("error").is_some());
    }

    #[tokio::test]
    async fn binaer_frame_liefert_websocket_error() {
        let d = dispatcher();
        let ausgabe = Ausgabe::default();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        ClientConnection::neu(Arc::clone(&d), None)
            .verarbeiten(
                None,
                sammel_sink(Arc::clone(&ausgabe)),
                stream::iter(vec![Ok::<_, std::io::Error>(Eingehend::Binaer)]),
                shutdown_rx,
            )
            .await;

        let frames = gesendet(&ausgabe);
        assert_eq!(frames.len(), 2);
        assert!(frames[1].get("websocket-error").is_some());
    }

    #[tokio::test]
    async fn kaputter_frame_haelt_verbindung_offen() {
        let d = dispatcher();
        let ausgabe = Ausgabe::default();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let eingaben = stream::iter(vec![
            Ok::<_, std::io::Error>(Eingehend::Text("kein json".into())),
            Ok(Eingehend::Text(json!({"unbekannt": 1}).to_string())),
            Ok(Eingehend::Text(json!({"login": {"username": "foo"}}).to_string())),
        ]);
        ClientConnection::neu(Arc::clone(&d), None)
            .verarbeiten(None, sammel_sink(Arc::clone(&ausgabe)), eingaben, shutdown_rx)
            .await;

        let frames = gesendet(&ausgabe);
        assert_eq!(frames.len(), 2);
        assert!(frames[1].get("login-success").is_some());
    }

    #[tokio::test]
    async fn logout_schliesst_verbindung() {
        let d = dispatcher();
        let ausgabe = Ausgabe::default();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let eingaben = frames(&[
            json!({"login": {"username": "foo"}}),
            json!({"logout": {}}),
            json!({"sidebar-ready": {}}),
        ]);
        ClientConnection::neu(Arc::clone(&d), None)
            .verarbeiten(None, sammel_sink(Arc::clone(&ausgabe)), eingaben, shutdown_rx)
            .await;

        let frames = gesendet(&ausgabe);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], json!({"logout-success": {}}));
    }
}
