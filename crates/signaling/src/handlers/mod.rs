//! Handler fuer alle eingehenden Push-Kanal-Topics
//!
//! Jeder Handler hat dieselbe Signatur ([`HandlerFn`](crate::dispatcher::HandlerFn))
//! und gibt die Events zurueck, die direkt an den Absender gehen.

pub mod call_handler;
pub mod session_handler;
