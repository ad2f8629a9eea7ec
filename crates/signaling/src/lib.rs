//! klingel-signaling – Presence- und Call-Signaling-Relay
//!
//! Dieser Crate haelt den gesamten In-Memory-Zustand von Klingel: wer ist
//! angemeldet, wer hat einen offenen Push-Kanal und welche Anrufe werden
//! gerade verhandelt. Er ist transportunabhaengig; HTTP und WebSocket
//! bindet `klingel-gateway` an.
//!
//! ## Architektur
//!
//! ```text
//! SessionApi (signin / signout)          ClientConnection (pro Push-Kanal ein Task)
//!     |                                      |
//!     |                                      v
//!     |                                  MessageDispatcher (Topic -> Handler)
//!     |                                      +-- session_handler (login, logout, sidebar-ready)
//!     |                                      +-- call_handler    (offer, answer, hangup, chat-window-ready)
//!     v                                      v
//! Relay (ein Mutex, jede Operation ein kritischer Abschnitt)
//!     +-- UserDirectory        – Wer ist angemeldet (Nickname-Aufloesung via nick)
//!     +-- PushChannelRegistry  – Nickname -> Send-Queue
//!     +-- CallRelay            – Anrufsitzungen pro Nutzerpaar
//! ```

pub mod broadcast;
pub mod call_relay;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod nick;
pub mod presence;
pub mod server_state;
pub mod session;

// Bequeme Re-Exporte
pub use broadcast::PushChannelRegistry;
pub use call_relay::{AnrufZustand, CallRelay, CallSession};
pub use connection::{ClientConnection, Eingehend};
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use presence::UserDirectory;
pub use server_state::{Relay, RelayConfig};
pub use session::{Anmeldung, SessionApi};
