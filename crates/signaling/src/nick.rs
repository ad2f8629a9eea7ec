//! Nickname-Aufloesung – kollisionsfreie Anzeigenamen
//!
//! Ist ein gewuenschter Nickname schon vergeben, wird die abschliessende
//! Ziffernfolge hochgezaehlt (bzw. eine `1` angehaengt), bis ein freier Name
//! gefunden ist. Nur die *abschliessenden* Ziffern zaehlen als Suffix; Ziffern
//! weiter vorne gehoeren zum Stamm (`fo1o` -> `fo1o1`).
//!
//! Das Hochzaehlen arbeitet direkt auf der Ziffernfolge: die Breite bleibt
//! erhalten, solange kein Uebertrag ueber die erste Stelle hinaus entsteht
//! (`01` -> `02`, `09` -> `10`, `99` -> `100`).

/// Loest `gewuenscht` gegen die vergebenen Nicknames auf
///
/// Gibt `gewuenscht` unveraendert zurueck, wenn der Name frei ist. Rein und
/// deterministisch; `ist_vergeben` wird fuer jeden Kandidaten neu gefragt.
pub fn aufloesen(gewuenscht: &str, ist_vergeben: impl Fn(&str) -> bool) -> String {
    let mut kandidat = gewuenscht.to_string();
    while ist_vergeben(&kandidat) {
        kandidat = naechster_kandidat(&kandidat);
    }
    kandidat
}

/// Berechnet den naechsten Kandidaten fuer einen vergebenen Nickname
pub fn naechster_kandidat(nick: &str) -> String {
    let (stamm, ziffern) = aufteilen(nick);
    if ziffern.is_empty() {
        format!("{stamm}1")
    } else {
        format!("{stamm}{}", ziffern_erhoehen(ziffern))
    }
}

/// Teilt einen Nickname in Stamm und abschliessende ASCII-Ziffernfolge
fn aufteilen(nick: &str) -> (&str, &str) {
    let stamm_laenge = nick.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    nick.split_at(stamm_laenge)
}

/// Erhoeht eine Dezimal-Ziffernfolge um eins, ohne Ueberlaufgrenze
fn ziffern_erhoehen(ziffern: &str) -> String {
    let mut stellen: Vec<char> = ziffern.chars().collect();
    for stelle in stellen.iter_mut().rev() {
        if *stelle == '9' {
            *stelle = '0';
        } else {
            *stelle = char::from(*stelle as u8 + 1);
            return stellen.into_iter().collect();
        }
    }
    // Uebertrag ueber die erste Stelle hinaus
    std::iter::once('1').chain(stellen).collect()
}
