//! klingel-protocol – Push-Kanal-Protokoll
//!
//! Dieses Crate definiert das Envelope `{topic, data}`, alle bekannten Topics,
//! die Nutzdaten der Call-Signaling-Nachrichten und das Wire-Format, mit dem
//! Events ueber den WebSocket uebertragen werden.

pub mod control;
pub mod wire;

pub use control::{topic, PushEvent};
pub use wire::{WireCodec, WireError};
