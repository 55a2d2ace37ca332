//! Semantic validation of a loaded [`RelayConfig`].
//!
//! Parsing already guarantees the shape; this catches values that parse fine
//! but would make the relay useless or insecure at runtime.

use std::collections::HashSet;

use {password_hash::PasswordHash, secrecy::ExposeSecret};

use crate::schema::RelayConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "irc.channel"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a loaded config.
#[must_use]
pub fn validate(config: &RelayConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let irc = &config.irc;

    if irc.server.trim().is_empty() {
        result.push(Severity::Error, "irc.server", "server address is empty");
    }
    if irc.port == 0 {
        result.push(Severity::Error, "irc.port", "port must be non-zero");
    }
    if irc.nick.is_empty() || irc.nick.contains([' ', ',', '*', '?', '!', '@']) {
        result.push(
            Severity::Error,
            "irc.nick",
            format!("'{}' is not a valid nickname", irc.nick),
        );
    }
    if !irc.channel.starts_with(['#', '&']) || irc.channel.contains([' ', ',', '\x07']) {
        result.push(
            Severity::Error,
            "irc.channel",
            format!("'{}' is not a valid channel name", irc.channel),
        );
    }
    if irc.channel_key.as_deref().is_some_and(|k| k.contains(' ')) {
        result.push(Severity::Error, "irc.channel_key", "channel key contains a space");
    }
    if irc.sasl_user.is_some() != irc.sasl_password.is_some() {
        result.push(
            Severity::Warning,
            "irc.sasl_user",
            "SASL needs both sasl_user and sasl_password; SASL will be skipped",
        );
    }
    if irc.sasl_credentials().is_some() && !irc.tls {
        result.push(
            Severity::Warning,
            "irc.tls",
            "SASL credentials will be sent over a plaintext connection",
        );
    }
    if irc.reconnect_delay_secs == 0 {
        result.push(
            Severity::Warning,
            "irc.reconnect_delay_secs",
            "a zero reconnect delay hammers the server while it is unreachable",
        );
    }
    if irc.connect_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "irc.connect_timeout_secs",
            "connect timeout must be non-zero",
        );
    }

    if config.server.ready_timeout_secs == 0 {
        result.push(
            Severity::Warning,
            "server.ready_timeout_secs",
            "requests will fail immediately whenever the IRC session is not connected",
        );
    }

    if config.auth.accounts.is_empty() {
        result.push(
            Severity::Warning,
            "auth.accounts",
            "no accounts configured; every request will be rejected with 401",
        );
    }
    let mut seen = HashSet::new();
    for (i, account) in config.auth.accounts.iter().enumerate() {
        let path = format!("auth.accounts[{i}]");
        if account.username.is_empty() || account.username.contains(':') {
            result.push(
                Severity::Error,
                format!("{path}.username"),
                "username must be non-empty and must not contain ':'",
            );
        }
        if !seen.insert(account.username.as_str()) {
            result.push(
                Severity::Error,
                format!("{path}.username"),
                format!("duplicate account '{}'", account.username),
            );
        }
        match PasswordHash::new(account.password_hash.expose_secret()) {
            Ok(parsed) if parsed.hash.is_none() => result.push(
                Severity::Error,
                format!("{path}.password_hash"),
                "PHC string has no hash output (see `smsrelay hash-password`)",
            ),
            Ok(parsed) if parsed.algorithm.as_str().starts_with("argon2") => {},
            Ok(parsed) => result.push(
                Severity::Error,
                format!("{path}.password_hash"),
                format!(
                    "unsupported hash algorithm '{}'; expected argon2 (see `smsrelay hash-password`)",
                    parsed.algorithm
                ),
            ),
            Err(e) => result.push(
                Severity::Error,
                format!("{path}.password_hash"),
                format!("unparseable PHC string: {e} (see `smsrelay hash-password`)"),
            ),
        }
    }

    result
}
