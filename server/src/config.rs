//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use anyhow::{bail, Context};
use klingel_observability::logging::{log_format_gueltig, log_level_gueltig};
use klingel_signaling::RelayConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Push-Kanal-Einstellungen
    pub kanal: KanalEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// CORS-Einstellungen
    pub cors: CorsEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Laenge eines Nicknames in Zeichen
    pub max_nick_laenge: usize,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Klingel Server".into(),
            max_nick_laenge: 64,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer HTTP und WebSocket
    pub bind_adresse: String,
    /// Port fuer HTTP und WebSocket
    pub http_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            http_port: 8080,
        }
    }
}

/// Push-Kanal-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KanalEinstellungen {
    /// Groesse der Send-Queue pro Verbindung (volle Queue verwirft Events)
    pub send_queue_groesse: usize,
    /// Maximale Groesse eines WebSocket-Frames in Bytes
    pub max_frame_groesse: usize,
}

impl Default for KanalEinstellungen {
    fn default() -> Self {
        let relay = RelayConfig::default();
        Self {
            send_queue_groesse: relay.send_queue_groesse,
            max_frame_groesse: relay.max_frame_groesse,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level bzw. EnvFilter-Direktive, z.B. "info" oder "klingel_signaling=debug"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// CORS-Einstellungen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsEinstellungen {
    /// Erlaubte Origins (leer = alle erlaubt)
    pub origins: Vec<String>,
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Parst die Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(inhalt)?)
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.server.max_nick_laenge == 0 {
            bail!("server.max_nick_laenge muss groesser als 0 sein");
        }
        if self.kanal.send_queue_groesse == 0 {
            bail!("kanal.send_queue_groesse muss groesser als 0 sein");
        }
        if self.kanal.max_frame_groesse == 0 {
            bail!("kanal.max_frame_groesse muss groesser als 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!(
                "logging.level '{}' ist ungueltig (erlaubt: trace, debug, info, warn, error)",
                self.logging.level
            );
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!(
                "logging.format '{}' ist ungueltig (erlaubt: text, json)",
                self.logging.format
            );
        }
        self.http_bind_adresse()?;
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer HTTP zurueck
    pub fn http_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .netzwerk
            .bind_adresse
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{}'", self.netzwerk.bind_adresse))?;
        Ok(SocketAddr::new(ip, self.netzwerk.http_port))
    }

    /// Relay-Konfiguration aus den Server-Einstellungen
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            max_nick_laenge: self.server.max_nick_laenge,
            send_queue_groesse: self.kanal.send_queue_groesse,
            max_frame_groesse: self.kanal.max_frame_groesse,
        }
    }
}
