//! klingel-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die Identifikationstypen bereit, die vom Protokoll,
//! vom Signaling-Relay und vom HTTP-Gateway gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::ConnectionId;
