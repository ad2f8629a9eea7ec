//! Session-API – Anmelden und Abmelden
//!
//! Transportunabhaengiger Kern fuer `POST /signin`, `POST /signout` und den
//! `login`/`logout`-Topics auf dem Push-Kanal. Validiert den Nickname und
//! delegiert an den [`Relay`].

use klingel_core::ConnectionId;
use klingel_protocol::PushEvent;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};
use crate::server_state::Relay;

/// Ergebnis einer Anmeldung
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anmeldung {
    /// Aufgeloester Nickname
    pub nick: String,
    /// Alle anderen angemeldeten Nutzer in Anmelde-Reihenfolge
    pub users: Vec<String>,
}

/// Prueft einen gewuenschten Nickname und gibt ihn getrimmt zurueck
pub fn nick_pruefen(roh: &str, max_laenge: usize) -> SignalingResult<&str> {
    let nick = roh.trim();
    if nick.is_empty() {
        return Err(SignalingError::Validierung(
            "Nickname darf nicht leer sein".into(),
        ));
    }
    if nick.chars().count() > max_laenge {
        return Err(SignalingError::Validierung(format!(
            "Nickname ist laenger als {max_laenge} Zeichen"
        )));
    }
    if nick.chars().any(char::is_control) {
        return Err(SignalingError::Validierung(
            "Nickname enthaelt Steuerzeichen".into(),
        ));
    }
    Ok(nick)
}

// ---------------------------------------------------------------------------
// SessionApi
// ---------------------------------------------------------------------------

/// An- und Abmeldung gegen den gemeinsamen Relay
#[derive(Debug, Clone)]
pub struct SessionApi {
    relay: Arc<Relay>,
}

impl SessionApi {
    pub fn neu(relay: Arc<Relay>) -> Self {
        Self { relay }
    }

    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Meldet einen Nutzer ohne Push-Kanal an (HTTP)
    pub fn signin(&self, roh: &str) -> SignalingResult<Anmeldung> {
        let nick = nick_pruefen(roh, self.relay.config().max_nick_laenge)?;
        Ok(self.relay.anmelden(nick, None))
    }

    /// Meldet einen Nutzer an und bindet sofort seinen Push-Kanal
    pub fn signin_mit_kanal(
        &self,
        roh: &str,
        id: ConnectionId,
        tx: mpsc::Sender<PushEvent>,
    ) -> SignalingResult<Anmeldung> {
        let nick = nick_pruefen(roh, self.relay.config().max_nick_laenge)?;
        Ok(self.relay.anmelden(nick, Some((id, tx))))
    }

    /// Meldet einen Nutzer ab; unbekannte Nutzer sind kein Fehler
    pub fn signout(&self, nick: &str) {
        if !self.relay.abmelden(nick.trim()) {
            tracing::debug!(nick = %nick, "Abmeldung fuer unbekannten Nutzer ignoriert");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
