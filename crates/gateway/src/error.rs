use axum::{
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};

/// Realm advertised in `WWW-Authenticate` challenges.
pub const AUTH_REALM: &str = "smsrelay";

/// Per-request failures. Each maps to exactly one status code and a short
/// plain-text body; none of them affect other requests.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("bad request")]
    BadRequest,

    #[error("not authenticated")]
    Unauthorized,

    #[error("irc session unavailable")]
    ServiceUnavailable,

    #[error("internal error")]
    Internal,
}

impl GatewayError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<smsrelay_auth::Error> for GatewayError {
    fn from(err: smsrelay_auth::Error) -> Self {
        if err.is_rejection() {
            Self::Unauthorized
        } else {
            Self::Internal
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.to_string()).into_response();
        if matches!(self, Self::Unauthorized) {
            let challenge = format!("Basic realm=\"{AUTH_REALM}\"");
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(GatewayError::BadRequest, 400)]
    #[case(GatewayError::Unauthorized, 401)]
    #[case(GatewayError::ServiceUnavailable, 503)]
    #[case(GatewayError::Internal, 500)]
    fn status_codes(#[case] err: GatewayError, #[case] status: u16) {
        assert_eq!(err.into_response().status().as_u16(), status);
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let response = GatewayError::Unauthorized.into_response();
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).map(HeaderValue::as_bytes),
            Some(&b"Basic realm=\"smsrelay\""[..])
        );
    }

    #[test]
    fn auth_errors_split_by_fault() {
        let rejected: GatewayError = smsrelay_auth::Error::MissingCredentials.into();
        assert!(matches!(rejected, GatewayError::Unauthorized));

        let fault: GatewayError = smsrelay_auth::Error::Hash {
            message: "boom".into(),
        }
        .into();
        assert!(matches!(fault, GatewayError::Internal));
    }
}
