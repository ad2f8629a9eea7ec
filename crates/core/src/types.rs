//! Identifikationstypen fuer Klingel
//!
//! Nutzer werden ueber ihren Nickname identifiziert (ein einfacher `String`).
//! Push-Kanaele dagegen brauchen eine eigene ID, weil ein Nickname im Laufe
//! der Zeit mehrere Verbindungen nacheinander besitzen kann.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige ID einer Push-Kanal-Verbindung (WebSocket)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}
