use {
    axum::http::{HeaderMap, header::AUTHORIZATION},
    base64::Engine,
    secrecy::Secret,
};

use crate::error::{Error, Result};

/// Username/password pair presented by a caller.
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub password: Secret<String>,
}

/// Extract `Authorization: Basic <base64(user:pass)>` credentials.
///
/// The scheme name is matched case-insensitively. The password may itself
/// contain `:`; only the first colon separates the two parts.
pub fn parse_basic_auth(headers: &HeaderMap) -> Result<Credential> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(Error::MissingCredentials)?
        .to_str()
        .map_err(|_| Error::MalformedHeader {
            reason: "header is not valid ASCII",
        })?;

    let (scheme, encoded) = value.trim().split_once(' ').ok_or(Error::MalformedHeader {
        reason: "missing scheme",
    })?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(Error::MalformedHeader {
            reason: "scheme is not Basic",
        });
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| Error::MalformedHeader {
            reason: "invalid base64",
        })?;
    let decoded = String::from_utf8(decoded).map_err(|_| Error::MalformedHeader {
        reason: "credentials are not UTF-8",
    })?;

    let (username, password) = decoded.split_once(':').ok_or(Error::MalformedHeader {
        reason: "missing ':' separator",
    })?;
    if username.is_empty() {
        return Err(Error::MalformedHeader {
            reason: "empty username",
        });
    }

    Ok(Credential {
        username: username.to_string(),
        password: Secret::new(password.to_string()),
    })
}
