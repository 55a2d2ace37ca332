use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// What the relay needs from an IRC protocol layer.
///
/// Implementations own the socket and its event loop. Only the
/// [`ConnectionManager`](crate::ConnectionManager) calls [`connect`]; every
/// other caller only checks state and sends.
///
/// [`connect`]: IrcClient::connect
#[async_trait]
pub trait IrcClient: Send + Sync {
    /// Open the connection and complete registration. Registered
    /// [`ConnectedHandler`]s run before this returns `Ok`.
    async fn connect(&self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Queue a PRIVMSG to `channel`. Must be safe to call concurrently.
    /// Returns once the line is queued, not once the server has seen it.
    async fn send_message(&self, channel: &str, text: &str) -> Result<()>;

    async fn join(&self, channel: &str, key: Option<&str>) -> Result<()>;

    /// Register a callback that runs after every successful registration.
    fn on_connected(&self, handler: Arc<dyn ConnectedHandler>);

    /// Resolves once the current connection is gone. Resolves immediately
    /// when not connected.
    async fn closed(&self);

    /// Politely leave the network. No-op by default.
    async fn quit(&self, _reason: &str) -> Result<()> {
        Ok(())
    }
}

/// Callback run by an [`IrcClient`] each time a connection is established.
#[async_trait]
pub trait ConnectedHandler: Send + Sync {
    async fn on_connected(&self, client: &dyn IrcClient) -> Result<()>;
}
