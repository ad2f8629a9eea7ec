//! Nutzerverzeichnis – Wer ist gerade angemeldet?
//!
//! Haelt die Menge aller angemeldeten Nutzer in Anmelde-Reihenfolge. Der
//! Nickname ist der Schluessel und zu jedem Zeitpunkt eindeutig: eine
//! Anmeldung mit vergebenem Namen schlaegt nie fehl, sondern wird ueber
//! [`nick::aufloesen`](crate::nick::aufloesen) umbenannt.
//!
//! Das Verzeichnis selbst verschickt nichts. Roster-Benachrichtigungen
//! uebernimmt der [`Relay`](crate::server_state::Relay), der Verzeichnis und
//! Push-Kanaele gemeinsam besitzt.

use chrono::{DateTime, Utc};

use crate::nick;

// ---------------------------------------------------------------------------
// Nutzer
// ---------------------------------------------------------------------------

/// Ein angemeldeter Nutzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nutzer {
    pub nick: String,
    pub angemeldet_seit: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// UserDirectory
// ---------------------------------------------------------------------------

/// Verzeichnis aller angemeldeten Nutzer
#[derive(Debug, Default)]
pub struct UserDirectory {
    /// Nutzer in Anmelde-Reihenfolge
    nutzer: Vec<Nutzer>,
}

impl UserDirectory {
    /// Erstellt ein leeres Verzeichnis
    pub fn neu() -> Self {
        Self::default()
    }

    /// Meldet einen Nutzer an und gibt den aufgeloesten Nickname zurueck
    pub fn anmelden(&mut self, gewuenscht: &str) -> String {
        let nick = nick::aufloesen(gewuenscht, |kandidat| self.ist_angemeldet(kandidat));
        if nick != gewuenscht {
            tracing::debug!(gewuenscht = %gewuenscht, nick = %nick, "Nickname umbenannt");
        }

        self.nutzer.push(Nutzer {
            nick: nick.clone(),
            angemeldet_seit: Utc::now(),
        });
        tracing::info!(nick = %nick, "Nutzer angemeldet");
        nick
    }

    /// Meldet einen Nutzer ab
    ///
    /// Gibt `true` zurueck wenn der Nutzer angemeldet war.
    pub fn abmelden(&mut self, nick: &str) -> bool {
        let vorher = self.nutzer.len();
        self.nutzer.retain(|n| n.nick != nick);
        let entfernt = self.nutzer.len() != vorher;
        if entfernt {
            tracing::info!(nick = %nick, "Nutzer abgemeldet");
        }
        entfernt
    }

    /// Alle Nicknames ausser dem des Anfragenden
    pub fn andere_nutzer(&self, ausser: &str) -> Vec<String> {
        self.nutzer
            .iter()
            .filter(|n| n.nick != ausser)
            .map(|n| n.nick.clone())
            .collect()
    }

    /// Alle Nicknames in Anmelde-Reihenfolge
    pub fn alle_nicks(&self) -> Vec<String> {
        self.nutzer.iter().map(|n| n.nick.clone()).collect()
    }

    /// Prueft ob ein Nickname angemeldet ist
    pub fn ist_angemeldet(&self, nick: &str) -> bool {
        self.nutzer.iter().any(|n| n.nick == nick)
    }

    /// Gibt den Eintrag eines Nutzers zurueck
    pub fn nutzer(&self, nick: &str) -> Option<&Nutzer> {
        self.nutzer.iter().find(|n| n.nick == nick)
    }

    /// Anzahl der angemeldeten Nutzer
    pub fn anzahl(&self) -> usize {
        self.nutzer.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.nutzer.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leer_beim_start() {
        let verzeichnis = UserDirectory::neu();
        assert!(verzeichnis.ist_leer());
        assert!(verzeichnis.alle_nicks().is_empty());
    }

    #[test]
    fn anmelden_und_abmelden() {
        let mut verzeichnis = UserDirectory::neu();

        assert_eq!(verzeichnis.anmelden("foo"), "foo");
        assert!(verzeichnis.ist_angemeldet("foo"));
        assert_eq!(verzeichnis.alle_nicks(), vec!["foo"]);

        assert!(verzeichnis.abmelden("foo"));
        assert!(verzeichnis.ist_leer());
    }

    #[test]
    fn abmelden_unbekannter_nutzer_ist_kein_fehler() {
        let mut verzeichnis = UserDirectory::neu();
        assert!(!verzeichnis.abmelden("niemand"));
        assert!(!verzeichnis.abmelden("niemand"));
    }

    #[test]
    fn doppelter_nick_wird_umbenannt() {
        let mut verzeichnis = UserDirectory::neu();
        assert_eq!(verzeichnis.anmelden("foo"), "foo");
        assert_eq!(verzeichnis.anmelden("foo"), "foo1");
        assert_eq!(verzeichnis.anmelden("foo"), "foo2");
        assert_eq!(verzeichnis.alle_nicks(), vec!["foo", "foo1", "foo2"]);
    }

    #[test]
    fn andere_nutzer_schliesst_anfragenden_aus() {
        let mut verzeichnis = UserDirectory::neu();
        verzeichnis.anmelden("foo");
        verzeichnis.anmelden("bar");
        verzeichnis.anmelden("baz");

        assert_eq!(verzeichnis.andere_nutzer("bar"), vec!["foo", "baz"]);
        assert_eq!(verzeichnis.andere_nutzer("unbekannt").len(), 3);
    }

    #[test]
    fn abgemeldeter_nick_wird_wieder_frei() {
        let mut verzeichnis = UserDirectory::neu();
        verzeichnis.anmelden("foo");
        verzeichnis.abmelden("foo");
        assert_eq!(verzeichnis.anmelden("foo"), "foo");
    }

    #[test]
    fn zeitstempel_wird_gesetzt() {
        let vorher = Utc::now();
        let mut verzeichnis = UserDirectory::neu();
        verzeichnis.anmelden("foo");
        let nutzer = verzeichnis.nutzer("foo").expect("Nutzer muss existieren");
        assert!(nutzer.angemeldet_seit >= vorher);
    }
}
