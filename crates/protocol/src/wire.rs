//! Wire-Format fuer WebSocket-Verbindungen
//!
//! Jeder Text-Frame ist ein JSON-Objekt. Ausgehende Events werden als
//! Objekt mit einem einzigen Schluessel kodiert:
//!
//! ```text
//! {"incoming_call": {"caller": "alice", "callee": "bob", "offer": {...}}}
//! {"users": ["alice", "bob"]}
//! ```
//!
//! Die Call-Topics verwenden dabei die historischen Wire-Schluessel
//! (`incoming_call`, `call_accepted`, `call_hangup`), alle anderen Topics
//! ihren eigenen Namen.
//!
//! Eingehende Frames werden in zwei Formen akzeptiert:
//! - Envelope: `{"topic": "call-offer", "data": {...}}`
//! - Bare-Key: `{"call_offer": {...}}` – jeder Schluessel ergibt ein Event

use serde_json::{Map, Value};
use thiserror::Error;

use crate::control::{topic, PushEvent};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (64 KB, reicht fuer SDP mit ICE-Kandidaten)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Wire-Schluessel eingehender Frames -> internes Topic
const EINGEHENDE_SCHLUESSEL: [(&str, &str); 4] = [
    ("call_offer", topic::CALL_OFFER),
    ("call_accepted", topic::CALL_ANSWER),
    ("call_hangup", topic::CALL_HANGUP),
    ("incoming_call", topic::CALL_INCOMING),
];

/// Internes Topic -> Wire-Schluessel ausgehender Frames
const AUSGEHENDE_SCHLUESSEL: [(&str, &str); 4] = [
    (topic::CALL_INCOMING, "incoming_call"),
    (topic::CALL_ESTABLISHMENT, "call_accepted"),
    (topic::CALL_HANGUP, "call_hangup"),
    (topic::CALL_OFFER, "call_offer"),
];

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Kodieren oder Dekodieren eines Frames
#[derive(Debug, Error)]
pub enum WireError {
    /// Frame ueberschreitet die maximale Groesse
    #[error("Frame zu gross: {groesse} Bytes (Maximum: {maximum} Bytes)")]
    ZuGross { groesse: usize, maximum: usize },

    /// Kein gueltiges JSON
    #[error("Ungueltiges JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON ist kein Objekt
    #[error("Frame ist kein JSON-Objekt")]
    KeinObjekt,

    /// Objekt ohne Schluessel
    #[error("Frame enthaelt keine Nachricht")]
    Leer,
}

// ---------------------------------------------------------------------------
// WireCodec
// ---------------------------------------------------------------------------

/// Kodiert `PushEvent`s in Text-Frames und zurueck
#[derive(Debug, Clone)]
pub struct WireCodec {
    /// Maximale erlaubte Groesse eingehender Frames in Bytes
    max_frame_size: usize,
}

impl WireCodec {
    /// Erstellt einen neuen `WireCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `WireCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Kodiert ein Event als Bare-Key-Objekt
    ///
    /// Das Frame-Limit gilt nur eingehend. Ein ausgehendes Event wurde dem
    /// Absender bereits als zugestellt gemeldet und darf hier nicht mehr
    /// verloren gehen (`incoming_call` ist laenger als `call_offer`).
    pub fn encode(&self, event: &PushEvent) -> Result<String, WireError> {
        let mut objekt = Map::new();
        objekt.insert(
            ausgehender_schluessel(&event.topic).to_string(),
            event.data.clone(),
        );
        Ok(serde_json::to_string(&Value::Object(objekt))?)
    }

    /// Dekodiert einen Text-Frame in ein oder mehrere Events
    pub fn decode(&self, text: &str) -> Result<Vec<PushEvent>, WireError> {
        if text.len() > self.max_frame_size {
            return Err(WireError::ZuGross {
                groesse: text.len(),
                maximum: self.max_frame_size,
            });
        }

        let objekt = match serde_json::from_str::<Value>(text)? {
            Value::Object(objekt) => objekt,
            _ => return Err(WireError::KeinObjekt),
        };
        if objekt.is_empty() {
            return Err(WireError::Leer);
        }

        // Envelope-Form: {"topic": "...", "data": ...}
        if let (Some(Value::String(t)), Some(data)) = (objekt.get("topic"), objekt.get("data")) {
            if objekt.len() == 2 {
                return Ok(vec![PushEvent {
                    topic: t.clone(),
                    data: data.clone(),
                }]);
            }
        }

        // Bare-Key-Form: jeder Schluessel ist ein Event
        Ok(objekt
            .into_iter()
            .map(|(schluessel, data)| PushEvent {
                topic: eingehendes_topic(&schluessel).to_string(),
                data,
            })
            .collect())
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

/// Bildet einen eingehenden Wire-Schluessel auf das interne Topic ab
pub fn eingehendes_topic(schluessel: &str) -> &str {
    EINGEHENDE_SCHLUESSEL
        .iter()
        .find(|(wire, _)| *wire == schluessel)
        .map(|(_, intern)| *intern)
        .unwrap_or(schluessel)
}

/// Bildet ein internes Topic auf den ausgehenden Wire-Schluessel ab
pub fn ausgehender_schluessel(topic_name: &str) -> &str {
    AUSGEHENDE_SCHLUESSEL
        .iter()
        .find(|(intern, _)| *intern == topic_name)
        .map(|(_, wire)| *wire)
        .unwrap_or(topic_name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
