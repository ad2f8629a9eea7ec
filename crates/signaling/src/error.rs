//! Fehlertypen fuer den Signaling-Relay

use klingel_protocol::WireError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Relay
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Ungueltiger Nickname bei Anmeldung
    #[error("Ungueltiger Nickname: {0}")]
    Validierung(String),

    /// Ziel hat keinen offenen Push-Kanal
    #[error("Nutzer nicht erreichbar: {0}")]
    Unerreichbar(String),

    /// Ungueltige eingehende Nachricht (falsches Format, falscher Absender)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Nutzdaten passen nicht zum Topic
    #[error("Ungueltige Nutzdaten: {0}")]
    Nutzdaten(#[from] serde_json::Error),

    /// Frame konnte nicht dekodiert werden
    #[error("Wire-Fehler: {0}")]
    Wire(#[from] WireError),

    /// Annahme ohne vorheriges Angebot
    #[error("Kein offenes Anrufangebot von {caller} an {callee}")]
    KeinAngebot { caller: String, callee: String },

    /// Aktion erfordert einen angemeldeten Push-Kanal
    #[error("Nicht angemeldet: {0}")]
    NichtAngemeldet(String),

    /// Push-Kanal ist bereits an einen Nickname gebunden
    #[error("Bereits angemeldet als {0}")]
    BereitsAngemeldet(String),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SignalingError {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    /// Protokollfehler werden geloggt und verworfen, nicht beantwortet
    pub fn ist_protokollfehler(&self) -> bool {
        matches!(self, Self::Protokoll(_) | Self::Nutzdaten(_) | Self::Wire(_))
    }
}

/// Result-Typ fuer den Signaling-Relay
pub type SignalingResult<T> = Result<T, SignalingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protokollfehler_erkennung() {
        assert!(SignalingError::protokoll("kaputt").ist_protokollfehler());
        let json_fehler = serde_json::from_str::<u32>("x").unwrap_err();
        assert!(SignalingError::from(json_fehler).ist_protokollfehler());
        assert!(!SignalingError::Validierung("".into()).ist_protokollfehler());
        assert!(!SignalingError::Unerreichbar("bob".into()).ist_protokollfehler());
    }

    #[test]
    fn kein_angebot_anzeige() {
        let e = SignalingError::KeinAngebot {
            caller: "alice".into(),
            callee: "bob".into(),
        };
        assert_eq!(e.to_string(), "Kein offenes Anrufangebot von alice an bob");
    }
}
