use {
    axum::{Extension, body::Bytes, extract::State},
    serde::de::DeserializeOwned,
    tracing::{debug, info, warn},
};

use smsrelay_common::{AlertInfo, Notification, SmsInfo};

use crate::{auth_middleware::AuthenticatedAccount, error::GatewayError, server::AppState};

/// `POST /alert`: `{"sender", "title", "description"}`.
pub async fn alert_handler(
    State(state): State<AppState>,
    Extension(account): Extension<AuthenticatedAccount>,
    body: Bytes,
) -> Result<&'static str, GatewayError> {
    relay::<AlertInfo>(&state, &account, &body).await
}

/// `POST /sms`: `{"from", "text", "sentStamp", "receivedStamp", "sim"}`.
pub async fn sms_handler(
    State(state): State<AppState>,
    Extension(account): Extension<AuthenticatedAccount>,
    body: Bytes,
) -> Result<&'static str, GatewayError> {
    relay::<SmsInfo>(&state, &account, &body).await
}

/// Parse, wait for the session, send once. Delivery is fire-and-forget: a
/// failed send is logged and the caller still gets `200`.
async fn relay<T>(
    state: &AppState,
    account: &AuthenticatedAccount,
    body: &[u8],
) -> Result<&'static str, GatewayError>
where
    T: Notification + DeserializeOwned,
{
    let notification: T = serde_json::from_slice(body).map_err(|e| {
        debug!(kind = T::KIND, error = %e, "unparseable body");
        GatewayError::BadRequest
    })?;

    if let Err(e) = state.session.wait_connected(state.ready_timeout).await {
        warn!(kind = T::KIND, error = %e, "irc session not ready, rejecting");
        return Err(GatewayError::ServiceUnavailable);
    }

    let line = notification.to_line();
    match state.session.send(&line).await {
        Ok(()) => info!(
            kind = T::KIND,
            account = %account.0,
            channel = state.session.channel(),
            "relayed notification"
        ),
        Err(e) => warn!(kind = T::KIND, error = %e, "irc send failed"),
    }

    Ok("OK")
}
