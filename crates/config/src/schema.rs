//! Config schema types (server, irc, auth, metrics).

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub irc: IrcConfig,
    pub auth: AuthConfig,
    pub metrics: MetricsConfig,
}

/// Inbound HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    pub port: u16,
    /// How long a request waits for the IRC session before giving up with 503.
    pub ready_timeout_secs: u64,
}

impl ServerConfig {
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8090,
            ready_timeout_secs: 30,
        }
    }
}

/// Outbound IRC session settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    pub server: String,
    pub port: u16,
    /// Connect over TLS. Plaintext is only meant for local test networks.
    pub tls: bool,
    pub nick: String,
    /// Username sent in `USER`.
    pub user: String,
    /// Real name sent in `USER`.
    pub realname: String,
    pub sasl_user: Option<String>,
    pub sasl_password: Option<Secret<String>>,
    /// Channel to join and relay into, e.g. `#alerts`.
    pub channel: String,
    pub channel_key: Option<String>,
    /// Fixed delay between failed connect attempts.
    pub reconnect_delay_secs: u64,
    /// Upper bound on TCP connect plus registration.
    pub connect_timeout_secs: u64,
}

impl IrcConfig {
    /// SASL PLAIN credentials, present only when both user and password are
    /// non-empty.
    #[must_use]
    pub fn sasl_credentials(&self) -> Option<(&str, &Secret<String>)> {
        let user = self.sasl_user.as_deref().filter(|u| !u.is_empty())?;
        let pass = self
            .sasl_password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty())?;
        Some((user, pass))
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: "irc.terminaldweller.com".into(),
            port: 6697,
            tls: true,
            nick: "soulhack".into(),
            user: "soulshack".into(),
            realname: "soulshack".into(),
            sasl_user: None,
            sasl_password: None,
            channel: "#soulhack".into(),
            channel_key: None,
            reconnect_delay_secs: 30,
            connect_timeout_secs: 30,
        }
    }
}

/// Accounts allowed to post notifications.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub accounts: Vec<AccountConfig>,
}

/// A single account: username plus an argon2 PHC hash of its password.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    pub password_hash: Secret<String>,
}

/// Metrics and observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
