//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (hat Vorrang vor der Config-Datei):
//! - `KLINGEL_LOG_LEVEL`: Filter im `EnvFilter`-Format, Standard: info
//! - `KLINGEL_LOG_FORMAT`: Format (text/json), Standard: text

use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "KLINGEL_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "KLINGEL_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anders => Err(format!("Unbekanntes Log-Format: {anders}")),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// `KLINGEL_LOG_LEVEL` und `KLINGEL_LOG_FORMAT` ueberschreiben die
/// Parameter. Ein ungueltiger Filter faellt auf `info` zurueck, ein
/// unbekanntes Format auf `text`. Ein zweiter Aufruf ist wirkungslos.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format_roh = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| format.to_string());
    let format = format_roh.parse::<LogFormat>().unwrap_or_default();

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    match ergebnis {
        Ok(()) => {
            if !log_format_gueltig(&format_roh) {
                tracing::warn!(format = %format_roh, "Unbekanntes Log-Format – verwende text");
            }
        }
        Err(e) => eprintln!("Logging bereits initialisiert: {e}"),
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    format.parse::<LogFormat>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level));
        }
    }

    #[test]
    fn log_level_ungueltige_werte() {
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_parsen() {
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("xml".parse::<LogFormat>().is_err());
        assert!(!log_format_gueltig("JSON"));
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn doppelte_initialisierung_paniert_nicht() {
        logging_initialisieren("debug", "text");
        logging_initialisieren("info", "json");
    }
}
