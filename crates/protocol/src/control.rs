//! Push-Kanal-Nachrichten
//!
//! Jede Nachricht zwischen Relay und Client ist ein `PushEvent` mit einem
//! Topic (String-Tag) und beliebigen JSON-Nutzdaten. Der Transport kuemmert
//! sich nur um das Framing, nicht um die Interpretation.
//!
//! ## Design
//! - SDP/ICE-Nutzdaten (`offer`, `answer`) bleiben opakes JSON
//! - Typisierte Payload-Structs fuer alles, was der Relay selbst liest
//! - Topics als `&'static str`-Konstanten, damit die Dispatch-Tabelle
//!   und die Tests dieselben Namen verwenden

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// Alle Topics, die der Relay erzeugt oder verarbeitet
pub mod topic {
    // Vom Relay erzeugt
    pub const PRESENCE_PENDING: &str = "presence-pending";
    pub const PRESENCE_OPEN: &str = "presence-open";
    pub const PRESENCE_UNAVAILABLE: &str = "presence-unavailable";
    pub const WEBSOCKET_ERROR: &str = "websocket-error";
    pub const CALL_START: &str = "call-start";
    pub const CALL_INCOMING: &str = "call-incoming";
    pub const CALL_ESTABLISHMENT: &str = "call-establishment";
    pub const USERS: &str = "users";
    pub const LOGIN_SUCCESS: &str = "login-success";
    pub const LOGIN_FAILURE: &str = "login-failure";
    pub const LOGOUT_SUCCESS: &str = "logout-success";
    pub const ERROR: &str = "error";

    // Vom Client gesendet
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const SIDEBAR_READY: &str = "sidebar-ready";
    pub const CALL_OFFER: &str = "call-offer";
    pub const CALL_ANSWER: &str = "call-answer";
    pub const CHAT_WINDOW_READY: &str = "chat-window-ready";

    // In beide Richtungen
    pub const CALL_HANGUP: &str = "call-hangup";
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Ein Event auf dem Push-Kanal: `{topic, data}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    pub topic: String,
    #[serde(default)]
    pub data: Value,
}

impl PushEvent {
    /// Erstellt ein Event aus beliebigen serialisierbaren Nutzdaten
    ///
    /// Nutzdaten, die sich nicht als JSON darstellen lassen, werden zu `null`.
    pub fn neu(topic: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            topic: topic.into(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    /// Event ohne Nutzdaten (`data: {}`)
    pub fn leer(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            data: Value::Object(Default::default()),
        }
    }

    /// Roster-Event mit der Liste der Nicknames
    pub fn users(nicks: &[String]) -> Self {
        Self::neu(topic::USERS, nicks)
    }

    /// Fehler-Event fuer den Client
    pub fn error(nachricht: impl Into<String>) -> Self {
        Self::neu(
            topic::ERROR,
            ErrorInfo {
                message: nachricht.into(),
            },
        )
    }

    /// Meldet, dass `nick` keinen offenen Push-Kanal hat
    pub fn unerreichbar(nick: impl Into<String>) -> Self {
        Self::neu(topic::PRESENCE_UNAVAILABLE, PresenceInfo { nick: nick.into() })
    }

    /// Deserialisiert die Nutzdaten in einen typisierten Payload
    pub fn daten<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

// ---------------------------------------------------------------------------
// Presence- und Session-Payloads
// ---------------------------------------------------------------------------

/// Login ueber den Push-Kanal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

/// Bestaetigter Login: aufgeloester Nickname und die anderen Nutzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSuccess {
    pub nick: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
}

/// Nickname, dessen Presence sich geaendert hat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceInfo {
    pub nick: String,
}

/// Fehlertext fuer `error`- und `login-failure`-Events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Call-Signaling-Payloads
// ---------------------------------------------------------------------------

/// Anrufangebot: `{caller, callee, offer}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOffer {
    pub caller: String,
    pub callee: String,
    #[serde(default)]
    pub offer: Value,
}

/// Anrufannahme: `{caller, callee, answer}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallAnswer {
    pub caller: String,
    pub callee: String,
    #[serde(default)]
    pub answer: Value,
}

/// Auflegen: `{other}` – beim Senden der Gegenueber, beim Empfang der Ausloeser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallHangup {
    pub other: String,
}

/// Ausgehender Anruf, der im Chat-Fenster gestartet werden soll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStart {
    pub caller: String,
    pub callee: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
