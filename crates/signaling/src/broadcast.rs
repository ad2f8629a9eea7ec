//! Push-Kanal-Registry – Sendet Events an angemeldete Nutzer
//!
//! Jeder angemeldete Nutzer besitzt hoechstens einen Push-Kanal. Ein Kanal
//! ist die Send-Queue einer WebSocket-Verbindung; die `ClientConnection`
//! liest daraus und schreibt die Events auf den Socket.
//!
//! ## Selektives Senden
//! - An einen Nutzer: `senden`
//! - An alle (optional ausser einem): `an_alle_senden`

use klingel_core::ConnectionId;
use klingel_protocol::PushEvent;
use std::collections::HashMap;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Send-Queue pro Kanal
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// PushKanal
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct PushKanal {
    pub id: ConnectionId,
    pub nick: String,
    pub tx: mpsc::Sender<PushEvent>,
}

impl PushKanal {
    pub fn neu(id: ConnectionId, nick: impl Into<String>, tx: mpsc::Sender<PushEvent>) -> Self {
        Self {
            id,
            nick: nick.into(),
            tx,
        }
    }

    /// Sendet ein Event nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, event: PushEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(nick = %self.nick, topic = %event.topic, "Send-Queue voll – Event verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(nick = %self.nick, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }

    /// Prueft ob die Verbindung hinter dem Kanal noch liest
    pub fn ist_offen(&self) -> bool {
        !self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// PushChannelRegistry
// ---------------------------------------------------------------------------

/// Zuordnung Nickname -> Push-Kanal
#[derive(Debug, Default)]
pub struct PushChannelRegistry {
    kanaele: HashMap<String, PushKanal>,
}

impl PushChannelRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Bindet einen Kanal an seinen Nickname
    ///
    /// Ein bereits vorhandener Kanal desselben Nutzers wird ersetzt und
    /// zurueckgegeben. Sobald er gedroppt wird, ist seine Queue geschlossen
    /// und die alte Verbindung beendet sich.
    pub fn registrieren(&mut self, kanal: PushKanal) -> Option<PushKanal> {
        let nick = kanal.nick.clone();
        let id = kanal.id;
        let ersetzt = self.kanaele.insert(nick.clone(), kanal);
        match &ersetzt {
            Some(alt) => tracing::info!(nick = %nick, alt = %alt.id, neu = %id, "Push-Kanal ersetzt"),
            None => tracing::debug!(nick = %nick, verbindung = %id, "Push-Kanal registriert"),
        }
        ersetzt
    }

    /// Entfernt einen Kanal anhand seiner Verbindungs-ID
    ///
    /// Gibt den Nickname nur zurueck, wenn der Kanal noch die aktive Bindung
    /// des Nutzers war. Ein bereits ersetzter Kanal liefert `None`.
    pub fn entfernen(&mut self, id: &ConnectionId) -> Option<String> {
        let nick = self
            .kanaele
            .iter()
            .find(|(_, kanal)| kanal.id == *id)
            .map(|(nick, _)| nick.clone())?;
        self.kanaele.remove(&nick);
        tracing::debug!(nick = %nick, verbindung = %id, "Push-Kanal entfernt");
        Some(nick)
    }

    /// Entfernt den Kanal eines Nutzers (z.B. bei Abmeldung ueber HTTP)
    pub fn entfernen_fuer_nick(&mut self, nick: &str) -> Option<PushKanal> {
        self.kanaele.remove(nick)
    }

    /// Sendet ein Event an einen einzelnen Nutzer
    ///
    /// Gibt `false` zurueck wenn der Nutzer keinen offenen Kanal hat.
    pub fn senden(&self, nick: &str, event: PushEvent) -> bool {
        match self.kanaele.get(nick) {
            Some(kanal) => kanal.senden(event),
            None => {
                tracing::debug!(nick = %nick, topic = %event.topic, "Senden an Nutzer ohne Push-Kanal");
                false
            }
        }
    }

    /// Sendet an alle Kanaele, optional ausser einem Nutzer
    ///
    /// `erzeugen` baut das Event pro Empfaenger (z.B. eine Nutzerliste ohne
    /// den Empfaenger selbst). Gibt die Anzahl der erfolgreichen Sendungen
    /// zurueck.
    pub fn an_alle_senden<F>(&self, ausgenommen: Option<&str>, erzeugen: F) -> usize
    where
        F: Fn(&str) -> PushEvent,
    {
        self.kanaele
            .iter()
            .filter(|(nick, _)| Some(nick.as_str()) != ausgenommen)
            .filter(|(nick, kanal)| kanal.senden(erzeugen(nick)))
            .count()
    }

    /// Prueft ob ein Nutzer einen offenen Kanal hat
    pub fn ist_erreichbar(&self, nick: &str) -> bool {
        self.kanaele.get(nick).is_some_and(PushKanal::ist_offen)
    }

    /// Gibt die Anzahl der registrierten Kanaele zurueck
    pub fn anzahl(&self) -> usize {
        self.kanaele.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use klingel_protocol::topic;

    fn test_kanal(nick: &str) -> (PushKanal, mpsc::Receiver<PushEvent>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        (PushKanal::neu(ConnectionId::new(), nick, tx), rx)
    }

    #[tokio::test]
    async fn registrieren_und_senden() {
        let mut registry = PushChannelRegistry::neu();
        let (kanal, mut rx) = test_kanal("alice");
        registry.registrieren(kanal);

        assert!(registry.ist_erreichbar("alice"));
        assert!(registry.senden("alice", PushEvent::leer(topic::PRESENCE_OPEN)));

        let empfangen = rx.try_recv().expect("Event muss vorhanden sein");
        assert_eq!(empfangen.topic, topic::PRESENCE_OPEN);
    }

    #[test]
    fn senden_ohne_kanal_ist_kein_fehler() {
        let registry = PushChannelRegistry::neu();
        assert!(!registry.senden("bob", PushEvent::leer(topic::USERS)));
    }

    #[test]
    fn neuer_kanal_ersetzt_alten() {
        let mut registry = PushChannelRegistry::neu();
        let (alt, mut alt_rx) = test_kanal("alice");
        let (neu, mut neu_rx) = test_kanal("alice");
        let alt_id = alt.id;

        assert!(registry.registrieren(alt).is_none());
        let ersetzt = registry.registrieren(neu).expect("alter Kanal muss zurueckkommen");
        assert_eq!(ersetzt.id, alt_id);
        drop(ersetzt);

        assert_eq!(registry.anzahl(), 1);
        registry.senden("alice", PushEvent::leer(topic::USERS));
        assert!(neu_rx.try_recv().is_ok());
        // Alte Queue ist geschlossen
        assert!(matches!(
            alt_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn entfernen_eines_ersetzten_kanals_liefert_none() {
        let mut registry = PushChannelRegistry::neu();
        let (alt, _alt_rx) = test_kanal("alice");
        let (neu, _neu_rx) = test_kanal("alice");
        let alt_id = alt.id;
        let neu_id = neu.id;

        registry.registrieren(alt);
        registry.registrieren(neu);

        assert_eq!(registry.entfernen(&alt_id), None);
        assert!(registry.ist_erreichbar("alice"));
        assert_eq!(registry.entfernen(&neu_id), Some("alice".to_string()));
        assert!(!registry.ist_erreichbar("alice"));
    }

    #[test]
    fn an_alle_ausser_einem() {
        let mut registry = PushChannelRegistry::neu();
        let (a, mut rx_a) = test_kanal("a");
        let (b, mut rx_b) = test_kanal("b");
        let (c, mut rx_c) = test_kanal("c");
        registry.registrieren(a);
        registry.registrieren(b);
        registry.registrieren(c);

        let gesendet = registry.an_alle_senden(Some("a"), |_| PushEvent::leer(topic::USERS));
        assert_eq!(gesendet, 2);
        assert!(rx_a.try_recv().is_err(), "Ausgenommener darf nichts empfangen");
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_c.try_recv().is_ok());

        assert_eq!(registry.an_alle_senden(None, |_| PushEvent::leer(topic::USERS)), 3);
    }

    #[test]
    fn an_alle_erzeugt_event_pro_empfaenger() {
        let mut registry = PushChannelRegistry::neu();
        let (a, mut rx_a) = test_kanal("a");
        let (b, mut rx_b) = test_kanal("b");
        registry.registrieren(a);
        registry.registrieren(b);

        registry.an_alle_senden(None, |nick| PushEvent::users(&[nick.to_string()]));
        assert_eq!(rx_a.try_recv().unwrap(), PushEvent::users(&["a".to_string()]));
        assert_eq!(rx_b.try_recv().unwrap(), PushEvent::users(&["b".to_string()]));
    }

    #[test]
    fn geschlossener_kanal_ist_nicht_erreichbar() {
        let mut registry = PushChannelRegistry::neu();
        let (kanal, rx) = test_kanal("alice");
        registry.registrieren(kanal);
        drop(rx);

        assert!(!registry.ist_erreichbar("alice"));
        assert!(!registry.senden("alice", PushEvent::leer(topic::USERS)));
    }

    #[test]
    fn volle_queue_verwirft_event() {
        let mut registry = PushChannelRegistry::neu();
        let (tx, _rx) = mpsc::channel(1);
        registry.registrieren(PushKanal::neu(ConnectionId::new(), "alice", tx));

        assert!(registry.senden("alice", PushEvent::leer(topic::USERS)));
        assert!(!registry.senden("alice", PushEvent::leer(topic::USERS)));
    }
}
