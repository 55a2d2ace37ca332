use {
    axum::{
        extract::{Request, State},
        middleware::Next,
        response::{IntoResponse, Response},
    },
    tracing::{debug, error},
};

use smsrelay_auth::{authenticate, parse_basic_auth};

use crate::{error::GatewayError, server::AppState};

/// The account that passed [`require_basic_auth`], available to handlers as
/// a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount(pub String);

/// Middleware that requires `Authorization: Basic` credentials matching an
/// account in the store. Runs before the body is read, so rejected requests
/// never reach JSON parsing or the IRC session.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let credential = match parse_basic_auth(request.headers()) {
        Ok(credential) => credential,
        Err(e) => {
            debug!(error = %e, path = %request.uri().path(), "rejecting request");
            return GatewayError::Unauthorized.into_response();
        },
    };

    match authenticate(&state.accounts, &credential).await {
        Ok(account) => {
            request
                .extensions_mut()
                .insert(AuthenticatedAccount(account.username));
            next.run(request).await
        },
        Err(e) => {
            if e.is_rejection() {
                debug!(error = %e, "rejecting request");
            } else {
                error!(error = %e, "account lookup failed");
            }
            GatewayError::from(e).into_response()
        },
    }
}
