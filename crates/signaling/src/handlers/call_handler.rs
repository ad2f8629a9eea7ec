//! Call-Handler – Angebot, Annahme, Auflegen und Chat-Fenster-Replay
//!
//! Der Absender muss immer der Eigentuemer des Push-Kanals sein: beim
//! Angebot als `caller`, bei der Annahme als `callee`, beim Auflegen als
//! Initiator.

use klingel_protocol::control::{CallAnswer, CallHangup, CallOffer, CallStart};
use klingel_protocol::{topic, PushEvent};

use crate::call_relay::AnrufZustand;
use crate::dispatcher::DispatcherContext;
use crate::error::{SignalingError, SignalingResult};
use crate::session::SessionApi;

pub fn handle_offer(
    api: &SessionApi,
    ctx: &mut DispatcherContext,
    event: &PushEvent,
) -> SignalingResult<Vec<PushEvent>> {
    let eigentuemer = ctx.eigentuemer()?;
    let angebot: CallOffer = event.daten()?;
    if angebot.caller != eigentuemer {
        return Err(SignalingError::protokoll(format!(
            "Angebot im Namen von {} ueber den Kanal von {eigentuemer}",
            angebot.caller
        )));
    }

    api.relay()
        .anruf_anbieten(&angebot.caller, &angebot.callee, angebot.offer)?;
    Ok(Vec::new())
}

pub fn handle_answer(
    api: &SessionApi,
    ctx: &mut DispatcherContext,
    event: &PushEvent,
) -> SignalingResult<Vec<PushEvent>> {
    let eigentuemer = ctx.eigentuemer()?;
    let antwort: CallAnswer = event.daten()?;
    if antwort.callee != eigentuemer {
        return Err(SignalingError::protokoll(format!(
            "Annahme im Namen von {} ueber den Kanal von {eigentuemer}",
            antwort.callee
        )));
    }

    api.relay()
        .anruf_annehmen(&antwort.caller, &antwort.callee, antwort.answer)?;
    Ok(Vec::new())
}

pub fn handle_hangup(
    api: &SessionApi,
    ctx: &mut DispatcherContext,
    event: &PushEvent,
) -> SignalingResult<Vec<PushEvent>> {
    let eigentuemer = ctx.eigentuemer()?;
    let auflegen: CallHangup = event.daten()?;

    let ergebnis = api.relay().auflegen(eigentuemer, &auflegen.other);
    if !ergebnis.zugestellt {
        return Ok(vec![PushEvent::unerreichbar(auflegen.other)]);
    }
    Ok(Vec::new())
}

/// Chat-Fenster ist geladen: offene Verhandlungen erneut ausliefern
///
/// Als Callee bekommt der Eigentuemer das gespeicherte Angebot nochmal
/// (`call-incoming`), als Caller ein `call-start`.
pub fn handle_chat_window_ready(
    api: &SessionApi,
    ctx: &mut DispatcherContext,
    _event: &PushEvent,
) -> SignalingResult<Vec<PushEvent>> {
    let eigentuemer = ctx.eigentuemer()?;

    let events = api
        .relay()
        .sitzungen_von(eigentuemer)
        .into_iter()
        .filter(|s| s.zustand == AnrufZustand::Angeboten)
        .map(|s| {
            if s.callee == eigentuemer {
                PushEvent::neu(
                    topic::CALL_INCOMING,
                    CallOffer {
                        caller: s.caller,
                        callee: s.callee,
                        offer: s.payload,
                    },
                )
            } else {
                PushEvent::neu(
                    topic::CALL_START,
                    CallStart {
                        caller: s.caller,
                        callee: s.callee,
                    },
                )
            }
        })
        .collect();
    Ok(events)
}
