//! HTTP-Handler

pub mod session;
pub mod ws;
