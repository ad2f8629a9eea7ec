//! Call-Relay – Anrufverhandlung zwischen zwei Nutzern
//!
//! Der Relay interpretiert keine SDP/ICE-Nutzdaten. Er merkt sich pro
//! (ungeordnetem) Nutzerpaar hoechstens eine Sitzung und leitet Angebot,
//! Annahme und Auflegen ueber den Push-Kanal der Gegenseite weiter.
//!
//! ## Zustaende pro Paar
//! ```text
//! IDLE --anbieten--> ANGEBOTEN --annehmen--> AUFGEBAUT --> IDLE
//!                        |
//!                        +--auflegen (Callee)--> ABGELEHNT --> IDLE
//! ```
//!
//! Ein zweites Angebot fuer ein Paar im Zustand `Angeboten` ersetzt das
//! erste. Auflegen ist idempotent.

use chrono::{DateTime, Utc};
use klingel_protocol::control::{CallAnswer, CallHangup, CallOffer};
use klingel_protocol::{topic, PushEvent};
use serde_json::Value;
use std::collections::HashMap;

use crate::broadcast::PushChannelRegistry;
use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Sitzung
// ---------------------------------------------------------------------------

/// Verhandlungszustand einer Sitzung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnrufZustand {
    /// Angebot an den Callee weitergeleitet, Antwort steht aus
    Angeboten,
    /// Callee hat angenommen
    Aufgebaut,
}

/// Laufende Anrufverhandlung zwischen zwei Nutzern
#[derive(Debug, Clone, PartialEq)]
pub struct CallSession {
    pub caller: String,
    pub callee: String,
    pub zustand: AnrufZustand,
    /// Zuletzt weitergeleitete Nutzdaten (Offer bzw. Answer)
    pub payload: Value,
    pub erstellt: DateTime<Utc>,
}

impl CallSession {
    /// Prueft ob `nick` an der Sitzung beteiligt ist
    pub fn beteiligt(&self, nick: &str) -> bool {
        self.caller == nick || self.callee == nick
    }

    /// Gibt den Gegenueber von `nick` zurueck
    pub fn gegenueber(&self, nick: &str) -> Option<&str> {
        if self.caller == nick {
            Some(&self.callee)
        } else if self.callee == nick {
            Some(&self.caller)
        } else {
            None
        }
    }
}

/// Schluessel fuer ein ungeordnetes Nutzerpaar
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PaarSchluessel(String, String);

impl PaarSchluessel {
    fn neu(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Ergebnis von auflegen
// ---------------------------------------------------------------------------

/// Was beim Auflegen passiert ist
#[derive(Debug, Clone, PartialEq)]
pub struct Auflegen {
    /// Die beendete Sitzung, falls eine existierte
    pub beendet: Option<CallSession>,
    /// Callee hat ein offenes Angebot abgelehnt
    pub abgelehnt: bool,
    /// `call-hangup` wurde an den Gegenueber zugestellt
    pub zugestellt: bool,
}

// ---------------------------------------------------------------------------
// CallRelay
// ---------------------------------------------------------------------------

/// Sitzungen pro Nutzerpaar
#[derive(Debug, Default)]
pub struct CallRelay {
    sitzungen: HashMap<PaarSchluessel, CallSession>,
}

impl CallRelay {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Leitet ein Anrufangebot an den Callee weiter
    ///
    /// Die Sitzung wird immer angelegt bzw. ersetzt, auch wenn der Callee
    /// gerade keinen offenen Push-Kanal hat. Er bekommt das Angebot dann
    /// spaeter ueber `chat-window-ready`; der Caller erhaelt `Unerreichbar`.
    pub fn anbieten(
        &mut self,
        kanaele: &PushChannelRegistry,
        caller: &str,
        callee: &str,
        offer: Value,
    ) -> SignalingResult<()> {
        if caller == callee {
            return Err(SignalingError::protokoll(format!(
                "{caller} kann sich nicht selbst anrufen"
            )));
        }

        let ersetzt = self.sitzungen.insert(
            PaarSchluessel::neu(caller, callee),
            CallSession {
                caller: caller.to_string(),
                callee: callee.to_string(),
                zustand: AnrufZustand::Angeboten,
                payload: offer.clone(),
                erstellt: Utc::now(),
            },
        );
        if ersetzt.is_some() {
            tracing::debug!(caller = %caller, callee = %callee, "Vorheriges Angebot ersetzt");
        }

        let event = PushEvent::neu(
            topic::CALL_INCOMING,
            CallOffer {
                caller: caller.to_string(),
                callee: callee.to_string(),
                offer,
            },
        );
        if !kanaele.senden(callee, event) {
            tracing::info!(caller = %caller, callee = %callee, "Anruf angeboten, Callee nicht erreichbar");
            return Err(SignalingError::Unerreichbar(callee.to_string()));
        }

        tracing::info!(caller = %caller, callee = %callee, "Anruf angeboten");
        Ok(())
    }

    /// Leitet die Annahme eines Angebots an den Caller weiter
    ///
    /// Die Sitzung muss im Zustand `Angeboten` sein und genau diese
    /// Richtung haben. Nach der Weiterleitung wird sie entfernt.
    pub fn annehmen(
        &mut self,
        kanaele: &PushChannelRegistry,
        caller: &str,
        callee: &str,
        answer: Value,
    ) -> SignalingResult<()> {
        let schluessel = PaarSchluessel::neu(caller, callee);
        let passt = self.sitzungen.get(&schluessel).is_some_and(|s| {
            s.zustand == AnrufZustand::Angeboten && s.caller == caller && s.callee == callee
        });
        if !passt {
            return Err(SignalingError::KeinAngebot {
                caller: caller.to_string(),
                callee: callee.to_string(),
            });
        }

        if let Some(sitzung) = self.sitzungen.get_mut(&schluessel) {
            sitzung.zustand = AnrufZustand::Aufgebaut;
            sitzung.payload = answer.clone();
        }

        let zugestellt = kanaele.senden(
            caller,
            PushEvent::neu(
                topic::CALL_ESTABLISHMENT,
                CallAnswer {
                    caller: caller.to_string(),
                    callee: callee.to_string(),
                    answer,
                },
            ),
        );
        self.sitzungen.remove(&schluessel);

        if !zugestellt {
            return Err(SignalingError::Unerreichbar(caller.to_string()));
        }
        tracing::info!(caller = %caller, callee = %callee, "Anruf aufgebaut");
        Ok(())
    }

    /// Beendet die Sitzung zwischen `initiator` und `other`
    ///
    /// Entfernt eine vorhandene Sitzung und schickt `call-hangup` mit dem
    /// Initiator als `other` an die Gegenseite. Ohne Sitzung wird trotzdem
    /// weitergeleitet.
    pub fn auflegen(
        &mut self,
        kanaele: &PushChannelRegistry,
        initiator: &str,
        other: &str,
    ) -> Auflegen {
        let beendet = self.sitzungen.remove(&PaarSchluessel::neu(initiator, other));
        let abgelehnt = beendet
            .as_ref()
            .is_some_and(|s| s.zustand == AnrufZustand::Angeboten && s.callee == initiator);

        let zugestellt = kanaele.senden(
            other,
            PushEvent::neu(
                topic::CALL_HANGUP,
                CallHangup {
                    other: initiator.to_string(),
                },
            ),
        );

        if abgelehnt {
            tracing::info!(caller = %other, callee = %initiator, "Anruf abgelehnt");
        } else {
            tracing::info!(initiator = %initiator, other = %other, "Aufgelegt");
        }

        Auflegen {
            beendet,
            abgelehnt,
            zugestellt,
        }
    }

    /// Beendet alle Sitzungen eines Nutzers (Abmeldung, Kanalverlust)
    ///
    /// Gibt die Anzahl der beendeten Sitzungen zurueck.
    pub fn alle_auflegen(&mut self, kanaele: &PushChannelRegistry, nick: &str) -> usize {
        let gegenueber: Vec<String> = self
            .sitzungen
            .values()
            .filter_map(|s| s.gegenueber(nick).map(str::to_string))
            .collect();

        for other in &gegenueber {
            self.auflegen(kanaele, nick, other);
        }
        gegenueber.len()
    }

    /// Gibt die Sitzung eines Paares zurueck (Reihenfolge egal)
    pub fn sitzung(&self, a: &str, b: &str) -> Option<&CallSession> {
        self.sitzungen.get(&PaarSchluessel::neu(a, b))
    }

    /// Alle Sitzungen, an denen `nick` beteiligt ist, aelteste zuerst
    pub fn sitzungen_von(&self, nick: &str) -> Vec<CallSession> {
        let mut gefunden: Vec<CallSession> = self
            .sitzungen
            .values()
            .filter(|s| s.beteiligt(nick))
            .cloned()
            .collect();
        gefunden.sort_by_key(|s| s.erstellt);
        gefunden
    }

    /// Anzahl der offenen Sitzungen
    pub fn anzahl(&self) -> usize {
        self.sitzungen.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::PushKanal;
    use klingel_core::ConnectionId;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn kanal(registry: &mut PushChannelRegistry, nick: &str) -> mpsc::Receiver<PushEvent> {
        let (tx, rx) = mpsc::channel(16);
        registry.registrieren(PushKanal::neu(ConnectionId::new(), nick, tx));
        rx
    }

    fn alle(rx: &mut mpsc::Receiver<PushEvent>) -> Vec<PushEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[test]
    fn paar_schluessel_ist_ungeordnet() {
        assert_eq!(PaarSchluessel::neu("a", "b"), PaarSchluessel::neu("b", "a"));
    }

    #[test]
    fn angebot_wird_weitergeleitet() {
        let mut kanaele = PushChannelRegistry::neu();
        let mut bob = kanal(&mut kanaele, "bob");
        let mut relay = CallRelay::neu();

        relay
            .anbieten(&kanaele, "alice", "bob", json!({"sdp": "v=0"}))
            .expect("Angebot muss klappen");

        let events = alle(&mut bob);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic, topic::CALL_INCOMING);
        let angebot: CallOffer = events[0].daten().expect("CallOffer erwartet");
        assert_eq!(angebot.caller, "alice");
        assert_eq!(angebot.offer, json!({"sdp": "v=0"}));

        let sitzung = relay.sitzung("bob", "alice").expect("Sitzung muss existieren");
        assert_eq!(sitzung.zustand, AnrufZustand::Angeboten);
    }

    #[test]
    fn angebot_an_unerreichbaren_wird_trotzdem_gespeichert() {
        let kanaele = PushChannelRegistry::neu();
        let mut relay = CallRelay::neu();

        let ergebnis = relay.anbieten(&kanaele, "alice", "bob", json!({"sdp": "o"}));
        assert!(matches!(ergebnis, Err(SignalingError::Unerreichbar(ref n)) if n == "bob"));

        let sitzung = relay.sitzung("alice", "bob").expect("Sitzung muss existieren");
        assert_eq!(sitzung.zustand, AnrufZustand::Angeboten);
        assert_eq!(sitzung.payload, json!({"sdp": "o"}));
    }

    #[test]
    fn unzustellbares_angebot_ersetzt_altes() {
        let mut kanaele = PushChannelRegistry::neu();
        let bob = kanal(&mut kanaele, "bob");
        let mut relay = CallRelay::neu();

        relay.anbieten(&kanaele, "alice", "bob", json!(1)).unwrap();
        drop(bob);
        assert!(relay.anbieten(&kanaele, "alice", "bob", json!(2)).is_err());

        assert_eq!(relay.anzahl(), 1);
        assert_eq!(relay.sitzung("alice", "bob").unwrap().payload, json!(2));
    }

    #[test]
    fn auflegen_durch_caller_erreicht_callee_einmal() {
        let mut kanaele = PushChannelRegistry::neu();
        let mut bob = kanal(&mut kanaele, "bob");
        let mut relay = CallRelay::neu();

        relay.anbieten(&kanaele, "alice", "bob", json!({})).unwrap();
        alle(&mut bob);

        let ergebnis = relay.auflegen(&kanaele, "alice", "bob");
        assert!(!ergebnis.abgelehnt);
        assert!(ergebnis.zugestellt);
        assert_eq!(relay.anzahl(), 0);

        let events = alle(&mut bob);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic, topic::CALL_HANGUP);
    }

    #[test]
    fn auflegen_ohne_kanal_beim_callee_stellt_nichts_zu() {
        let kanaele = PushChannelRegistry::neu();
        let mut relay = CallRelay::neu();

        let _ = relay.anbieten(&kanaele, "alice", "bob", json!({}));
        let ergebnis = relay.auflegen(&kanaele, "alice", "bob");

        assert!(ergebnis.beendet.is_some());
        assert!(!ergebnis.zugestellt);
        assert_eq!(relay.anzahl(), 0);
    }

    #[test]
    fn selbstanruf_ist_protokollfehler() {
        let mut kanaele = PushChannelRegistry::neu();
        let _alice = kanal(&mut kanaele, "alice");
        let mut relay = CallRelay::neu();

        let fehler = relay
            .anbieten(&kanaele, "alice", "alice", json!({}))
            .unwrap_err();
        assert!(fehler.ist_protokollfehler());
    }

    #[test]
    fn zweites_angebot_ersetzt_erstes() {
        let mut kanaele = PushChannelRegistry::neu();
        let _bob = kanal(&mut kanaele, "bob");
        let mut relay = CallRelay::neu();

        relay.anbieten(&kanaele, "alice", "bob", json!(1)).unwrap();
        relay.anbieten(&kanaele, "alice", "bob", json!(2)).unwrap();

        assert_eq!(relay.anzahl(), 1);
        assert_eq!(relay.sitzung("alice", "bob").unwrap().payload, json!(2));
    }

    #[test]
    fn annahme_ohne_angebot_leitet_nichts_weiter() {
        let mut kanaele = PushChannelRegistry::neu();
        let mut alice = kanal(&mut kanaele, "alice");
        let mut relay = CallRelay::neu();

        let fehler = relay
            .annehmen(&kanaele, "alice", "bob", json!({}))
            .unwrap_err();
        assert!(matches!(fehler, SignalingError::KeinAngebot { .. }));
        assert!(alle(&mut alice).is_empty());
    }

    #[test]
    fn annahme_in_falscher_richtung_wird_abgelehnt() {
        let mut kanaele = PushChannelRegistry::neu();
        let _alice = kanal(&mut kanaele, "alice");
        let _bob = kanal(&mut kanaele, "bob");
        let mut relay = CallRelay::neu();

        relay.anbieten(&kanaele, "alice", "bob", json!({})).unwrap();
        let fehler = relay
            .annehmen(&kanaele, "bob", "alice", json!({}))
            .unwrap_err();
        assert!(matches!(fehler, SignalingError::KeinAngebot { .. }));
        assert_eq!(relay.anzahl(), 1);
    }

    #[test]
    fn annahme_erreicht_caller_und_entfernt_sitzung() {
        let mut kanaele = PushChannelRegistry::neu();
        let mut alice = kanal(&mut kanaele, "alice");
        let _bob = kanal(&mut kanaele, "bob");
        let mut relay = CallRelay::neu();

        relay.anbieten(&kanaele, "alice", "bob", json!("offer")).unwrap();
        relay
            .annehmen(&kanaele, "alice", "bob", json!("answer"))
            .unwrap();

        let events = alle(&mut alice);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic, topic::CALL_ESTABLISHMENT);
        let antwort: CallAnswer = events[0].daten().unwrap();
        assert_eq!(antwort.answer, json!("answer"));
        assert_eq!(relay.anzahl(), 0);
    }

    #[test]
    fn auflegen_durch_callee_ist_ablehnung() {
        let mut kanaele = PushChannelRegistry::neu();
        let mut alice = kanal(&mut kanaele, "alice");
        let _bob = kanal(&mut kanaele, "bob");
        let mut relay = CallRelay::neu();

        relay.anbieten(&kanaele, "alice", "bob", json!({})).unwrap();
        let ergebnis = relay.auflegen(&kanaele, "bob", "alice");

        assert!(ergebnis.abgelehnt);
        assert!(ergebnis.zugestellt);
        assert!(ergebnis.beendet.is_some());

        let events = alle(&mut alice);
        assert_eq!(events.len(), 1);
        let auflegen: CallHangup = events[0].daten().unwrap();
        assert_eq!(auflegen.other, "bob");
    }

    #[test]
    fn auflegen_ist_idempotent() {
        let mut kanaele = PushChannelRegistry::neu();
        let _bob = kanal(&mut kanaele, "bob");
        let mut relay = CallRelay::neu();

        let erstes = relay.auflegen(&kanaele, "alice", "bob");
        let zweites = relay.auflegen(&kanaele, "alice", "bob");
        assert!(erstes.beendet.is_none());
        assert!(zweites.beendet.is_none());
        assert!(!zweites.abgelehnt);
    }

    #[test]
    fn alle_auflegen_benachrichtigt_jeden_gegenueber() {
        let mut kanaele = PushChannelRegistry::neu();
        let _alice = kanal(&mut kanaele, "alice");
        let mut bob = kanal(&mut kanaele, "bob");
        let mut carol = kanal(&mut kanaele, "carol");
        let mut relay = CallRelay::neu();

        relay.anbieten(&kanaele, "bob", "alice", json!({})).unwrap();
        relay.anbieten(&kanaele, "carol", "alice", json!({})).unwrap();

        assert_eq!(relay.sitzungen_von("alice").len(), 2);
        assert_eq!(relay.alle_auflegen(&kanaele, "alice"), 2);
        assert_eq!(relay.anzahl(), 0);

        for rx in [&mut bob, &mut carol] {
            let events = alle(rx);
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].topic, topic::CALL_HANGUP);
        }
    }
}
