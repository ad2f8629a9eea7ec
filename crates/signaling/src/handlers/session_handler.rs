//! Session-Handler – login, logout, sidebar-ready

use klingel_protocol::control::{ErrorInfo, LoginRequest, LoginSuccess};
use klingel_protocol::{topic, PushEvent};

use crate::dispatcher::DispatcherContext;
use crate::error::{SignalingError, SignalingResult};
use crate::session::SessionApi;

/// Anmeldung ueber einen wartenden Push-Kanal
///
/// Bei Erfolg geht die Send-Queue der Verbindung an den Relay und der
/// Kanal ist unter dem aufgeloesten Nickname gebunden.
pub fn handle_login(
    api: &SessionApi,
    ctx: &mut DispatcherContext,
    event: &PushEvent,
) -> SignalingResult<Vec<PushEvent>> {
    if let Some(nick) = &ctx.nick {
        return Err(SignalingError::BereitsAngemeldet(nick.clone()));
    }
    let anfrage: LoginRequest = event.daten()?;
    let tx = ctx
        .sende_tx
        .take()
        .ok_or_else(|| SignalingError::intern("Verbindung hat keine Send-Queue"))?;

    match api.signin_mit_kanal(&anfrage.username, ctx.verbindung_id, tx.clone()) {
        Ok(anmeldung) => {
            tracing::info!(
                nick = %anmeldung.nick,
                verbindung = %ctx.verbindung_id,
                "Login ueber Push-Kanal"
            );
            ctx.nick = Some(anmeldung.nick.clone());
            Ok(vec![PushEvent::neu(
                topic::LOGIN_SUCCESS,
                LoginSuccess {
                    nick: anmeldung.nick,
                    users: Some(anmeldung.users),
                },
            )])
        }
        Err(SignalingError::Validierung(grund)) => {
            ctx.sende_tx = Some(tx);
            Ok(vec![PushEvent::neu(
                topic::LOGIN_FAILURE,
                ErrorInfo { message: grund },
            )])
        }
        Err(e) => {
            ctx.sende_tx = Some(tx);
            Err(e)
        }
    }
}

/// Abmeldung; die Verbindung wird danach geschlossen
pub fn handle_logout(
    api: &SessionApi,
    ctx: &mut DispatcherContext,
    _event: &PushEvent,
) -> SignalingResult<Vec<PushEvent>> {
    let nick = ctx.eigentuemer()?.to_string();
    api.signout(&nick);

    ctx.nick = None;
    ctx.schliessen = true;
    Ok(vec![PushEvent::leer(topic::LOGOUT_SUCCESS)])
}

/// Seitenleiste ist geladen: Nickname und Nutzerliste erneut schicken
pub fn handle_sidebar_ready(
    api: &SessionApi,
    ctx: &mut DispatcherContext,
    _event: &PushEvent,
) -> SignalingResult<Vec<PushEvent>> {
    let Some(nick) = ctx.nick.clone() else {
        return Ok(Vec::new());
    };

    let andere = api.relay().andere_nutzer(&nick);
    Ok(vec![
        PushEvent::neu(topic::LOGIN_SUCCESS, LoginSuccess { nick, users: None }),
        PushEvent::users(&andere),
    ])
}
