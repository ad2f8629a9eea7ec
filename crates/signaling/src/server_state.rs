//! Gemeinsamer Relay-Zustand
//!
//! Der `Relay` besitzt Nutzerverzeichnis, Push-Kanaele und Anrufsitzungen
//! hinter EINEM Mutex. Jede oeffentliche Operation sperrt genau einmal und
//! laeuft inklusive aller Folgeaktionen (Roster-Broadcast, Auflegen bei
//! Abmeldung) bis zum Ende durch. Gesendet wird nur ueber `try_send`, der
//! Lock wird also nie ueber ein `.await` gehalten.

use klingel_core::ConnectionId;
use klingel_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use klingel_protocol::PushEvent;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::broadcast::{PushChannelRegistry, PushKanal, SEND_QUEUE_GROESSE};
use crate::call_relay::{Auflegen, CallRelay, CallSession};
use crate::error::{SignalingError, SignalingResult};
use crate::presence::UserDirectory;
use crate::session::Anmeldung;

/// Konfiguration fuer den Relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximale Laenge eines Nicknames in Zeichen
    pub max_nick_laenge: usize,
    /// Groesse der Send-Queue pro Push-Kanal
    pub send_queue_groesse: usize,
    /// Maximale Groesse eines eingehenden Text-Frames in Bytes
    pub max_frame_groesse: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_nick_laenge: 64,
            send_queue_groesse: SEND_QUEUE_GROESSE,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

// ---------------------------------------------------------------------------
// RelayKern
// ---------------------------------------------------------------------------

/// Alles, was unter dem Lock steht
#[derive(Debug, Default)]
struct RelayKern {
    verzeichnis: UserDirectory,
    kanaele: PushChannelRegistry,
    anrufe: CallRelay,
}

impl RelayKern {
    /// Schickt jedem Kanal die Liste der jeweils anderen Nutzer
    fn roster_senden(&self, ausgenommen: Option<&str>) {
        let verzeichnis = &self.verzeichnis;
        let empfaenger = self.kanaele.an_alle_senden(ausgenommen, |nick| {
            PushEvent::users(&verzeichnis.andere_nutzer(nick))
        });
        tracing::debug!(empfaenger, "Roster verschickt");
    }

    /// Abmeldung mit allen Folgen: Kanal loesen, Anrufe beenden, Roster
    fn abmelden(&mut self, nick: &str) -> bool {
        // Alten Kanal droppen, die Verbindung beendet sich dann selbst
        drop(self.kanaele.entfernen_fuer_nick(nick));

        let beendet = self.anrufe.alle_auflegen(&self.kanaele, nick);
        if beendet > 0 {
            tracing::info!(nick = %nick, beendet, "Anrufe bei Abmeldung beendet");
        }

        let entfernt = self.verzeichnis.abmelden(nick);
        if entfernt {
            self.roster_senden(None);
        }
        entfernt
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Prozessweiter Relay-Zustand (thread-safe, Arc-geteilt)
#[derive(Debug)]
pub struct Relay {
    config: RelayConfig,
    kern: Mutex<RelayKern>,
}

impl Relay {
    /// Erstellt einen neuen Relay
    pub fn neu(config: RelayConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            kern: Mutex::new(RelayKern::default()),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Erstellt eine Send-Queue in der konfigurierten Groesse
    pub fn send_queue(&self) -> (mpsc::Sender<PushEvent>, mpsc::Receiver<PushEvent>) {
        mpsc::channel(self.config.send_queue_groesse.max(1))
    }

    // -----------------------------------------------------------------------
    // Anmeldung
    // -----------------------------------------------------------------------

    /// Meldet einen (bereits validierten) Nickname an
    ///
    /// Mit `kanal` wird der Push-Kanal unter dem aufgeloesten Namen gebunden.
    /// Alle anderen Kanaele bekommen den neuen Roster, der neue Nutzer
    /// bekommt die anderen Nutzer im Ergebnis.
    pub fn anmelden(
        &self,
        gewuenscht: &str,
        kanal: Option<(ConnectionId, mpsc::Sender<PushEvent>)>,
    ) -> Anmeldung {
        let mut kern = self.kern.lock();
        let nick = kern.verzeichnis.anmelden(gewuenscht);
        let users = kern.verzeichnis.andere_nutzer(&nick);

        if let Some((id, tx)) = kanal {
            kern.kanaele.registrieren(PushKanal::neu(id, nick.clone(), tx));
        }
        kern.roster_senden(Some(&nick));

        Anmeldung { nick, users }
    }

    /// Meldet einen Nutzer ab (idempotent)
    pub fn abmelden(&self, nick: &str) -> bool {
        self.kern.lock().abmelden(nick)
    }

    // -----------------------------------------------------------------------
    // Push-Kanaele
    // -----------------------------------------------------------------------

    /// Bindet einen Push-Kanal an einen angemeldeten Nutzer
    ///
    /// Ein vorhandener Kanal des Nutzers wird ersetzt.
    pub fn kanal_binden(
        &self,
        nick: &str,
        id: ConnectionId,
        tx: mpsc::Sender<PushEvent>,
    ) -> SignalingResult<()> {
        let mut kern = self.kern.lock();
        if !kern.verzeichnis.ist_angemeldet(nick) {
            return Err(SignalingError::NichtAngemeldet(nick.to_string()));
        }
        kern.kanaele.registrieren(PushKanal::neu(id, nick, tx));
        Ok(())
    }

    /// Behandelt den Verlust eines Push-Kanals
    ///
    /// War der Kanal noch die aktive Bindung, wird sein Nutzer abgemeldet
    /// (inklusive Auflegen und Roster). Ein bereits ersetzter Kanal aendert
    /// nichts. Gibt den abgemeldeten Nickname zurueck.
    pub fn kanal_schliessen(&self, id: &ConnectionId) -> Option<String> {
        let mut kern = self.kern.lock();
        let nick = kern.kanaele.entfernen(id)?;
        kern.abmelden(&nick);
        tracing::info!(nick = %nick, verbindung = %id, "Push-Kanal verloren – Nutzer abgemeldet");
        Some(nick)
    }

    /// Sendet ein Event an einen einzelnen Nutzer
    pub fn senden(&self, nick: &str, event: PushEvent) -> bool {
        self.kern.lock().kanaele.senden(nick, event)
    }

    // -----------------------------------------------------------------------
    // Anrufe
    // -----------------------------------------------------------------------

    pub fn anruf_anbieten(&self, caller: &str, callee: &str, offer: Value) -> SignalingResult<()> {
        let mut kern = self.kern.lock();
        let RelayKern {
            kanaele, anrufe, ..
        } = &mut *kern;
        anrufe.anbieten(kanaele, caller, callee, offer)
    }

    pub fn anruf_annehmen(&self, caller: &str, callee: &str, answer: Value) -> SignalingResult<()> {
        let mut kern = self.kern.lock();
        let RelayKern {
            kanaele, anrufe, ..
        } = &mut *kern;
        anrufe.annehmen(kanaele, caller, callee, answer)
    }

    pub fn auflegen(&self, initiator: &str, other: &str) -> Auflegen {
        let mut kern = self.kern.lock();
        let RelayKern {
            kanaele, anrufe, ..
        } = &mut *kern;
        anrufe.auflegen(kanaele, initiator, other)
    }

    /// Alle Sitzungen, an denen `nick` beteiligt ist
    pub fn sitzungen_von(&self, nick: &str) -> Vec<CallSession> {
        self.kern.lock().anrufe.sitzungen_von(nick)
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Alle angemeldeten Nicknames in Anmelde-Reihenfolge
    pub fn nutzer_liste(&self) -> Vec<String> {
        self.kern.lock().verzeichnis.alle_nicks()
    }

    /// Alle Nicknames ausser `nick`
    pub fn andere_nutzer(&self, nick: &str) -> Vec<String> {
        self.kern.lock().verzeichnis.andere_nutzer(nick)
    }

    pub fn ist_angemeldet(&self, nick: &str) -> bool {
        self.kern.lock().verzeichnis.ist_angemeldet(nick)
    }

    pub fn online_anzahl(&self) -> usize {
        self.kern.lock().verzeichnis.anzahl()
    }

    pub fn kanal_anzahl(&self) -> usize {
        self.kern.lock().kanaele.anzahl()
    }

    pub fn anruf_anzahl(&self) -> usize {
        self.kern.lock().anrufe.anzahl()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use klingel_protocol::topic;
    use serde_json::json;

    fn alle(rx: &mut mpsc::Receiver<PushEvent>) -> Vec<PushEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn mit_kanal(relay: &Relay, nick: &str) -> (String, ConnectionId, mpsc::Receiver<PushEvent>) {
        let (tx, rx) = relay.send_queue();
        let id = ConnectionId::new();
        let anmeldung = relay.anmelden(nick, Some((id, tx)));
        (anmeldung.nick, id, rx)
    }

    #[test]
    fn anmelden_schickt_roster_an_andere() {
        let relay = Relay::neu(RelayConfig::default());
        let (_, _, mut alice) = mit_kanal(&relay, "alice");
        assert!(alle(&mut alice).is_empty(), "Eigener Kanal bekommt keinen Roster");

        let (_, _, mut bob) = mit_kanal(&relay, "bob");
        let events = alle(&mut alice);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], PushEvent::users(&["bob".into()]));
        assert!(alle(&mut bob).is_empty());
    }

    #[test]
    fn abmelden_schickt_roster_an_alle() {
        let relay = Relay::neu(RelayConfig::default());
        let (_, _, mut alice) = mit_kanal(&relay, "alice");
        let _ = relay.anmelden("bob", None);
        alle(&mut alice);

        assert!(relay.abmelden("bob"));
        assert_eq!(alle(&mut alice), vec![PushEvent::users(&[])]);

        // Zweites Abmelden: kein Broadcast
        assert!(!relay.abmelden("bob"));
        assert!(alle(&mut alice).is_empty());
    }

    #[test]
    fn kanal_binden_erfordert_anmeldung() {
        let relay = Relay::neu(RelayConfig::default());
        let (tx, _rx) = relay.send_queue();
        let fehler = relay
            .kanal_binden("niemand", ConnectionId::new(), tx)
            .unwrap_err();
        assert!(matches!(fehler, SignalingError::NichtAngemeldet(_)));
    }

    #[test]
    fn kanalverlust_meldet_ab_und_legt_auf() {
        let relay = Relay::neu(RelayConfig::default());
        let (_, _, mut alice) = mit_kanal(&relay, "alice");
        let (_, bob_id, _bob) = mit_kanal(&relay, "bob");
        alle(&mut alice);

        relay.anruf_anbieten("alice", "bob", json!({})).unwrap();
        assert_eq!(relay.kanal_schliessen(&bob_id), Some("bob".to_string()));

        let topics: Vec<String> = alle(&mut alice).into_iter().map(|e| e.topic).collect();
        assert_eq!(topics, vec![topic::CALL_HANGUP, topic::USERS]);
        assert!(!relay.ist_angemeldet("bob"));
        assert_eq!(relay.anruf_anzahl(), 0);
    }

    #[test]
    fn ersetzter_kanal_meldet_nicht_ab() {
        let relay = Relay::neu(RelayConfig::default());
        let (_, alt_id, _alt) = mit_kanal(&relay, "alice");
        let (tx, _neu) = relay.send_queue();
        relay.kanal_binden("alice", ConnectionId::new(), tx).unwrap();

        assert_eq!(relay.kanal_schliessen(&alt_id), None);
        assert!(relay.ist_angemeldet("alice"));
        assert_eq!(relay.kanal_anzahl(), 1);
    }

    #[test]
    fn abmelden_schliesst_den_kanal() {
        let relay = Relay::neu(RelayConfig::default());
        let (_, _, mut alice) = mit_kanal(&relay, "alice");
        relay.abmelden("alice");
        assert!(matches!(
            alice.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
