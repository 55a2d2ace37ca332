use std::{sync::Arc, time::Duration};

use {
    serde::Serialize,
    tokio::sync::watch,
    tracing::debug,
};

use crate::{
    client::IrcClient,
    error::{Error, Result},
};

/// Lifecycle of the shared session.
///
/// `Disconnected -> Connecting -> Connected -> Disconnected -> ...`, driven
/// only by the [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

impl SessionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

struct SessionInner {
    client: Arc<dyn IrcClient>,
    channel: String,
    state: watch::Sender<SessionState>,
}

/// Cheap, cloneable handle to the one IRC session the process keeps.
///
/// The handle exists from startup on; whether it is usable is a question for
/// [`Session::state`] or [`Session::wait_connected`].
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn new(client: Arc<dyn IrcClient>, channel: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            inner: Arc::new(SessionInner {
                client,
                channel: channel.into(),
                state,
            }),
        }
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.inner.channel
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Connected according to both the state machine and the client. The
    /// client can notice a dead socket before the manager does.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected && self.inner.client.is_connected()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Wait until the session is connected in the sense of
    /// [`is_connected`](Self::is_connected), giving up after `timeout`.
    ///
    /// A `Connected` state whose socket is already gone does not count; the
    /// wait continues until the manager has reconnected.
    pub async fn wait_connected(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.subscribe();
        let ready = async {
            loop {
                rx.wait_for(|s| *s == SessionState::Connected).await?;
                if self.inner.client.is_connected() {
                    return Ok::<_, watch::error::RecvError>(());
                }
                rx.wait_for(|s| *s != SessionState::Connected).await?;
            }
        };
        match tokio::time::timeout(timeout, ready).await {
            Ok(Ok(())) => Ok(()),
            // The sender is owned by `self`, so a closed channel means teardown.
            Ok(Err(_)) => Err(Error::NotConnected),
            Err(_) => Err(Error::NotReady { timeout }),
        }
    }

    /// Send `text` as a PRIVMSG to the session's channel.
    pub async fn send(&self, text: &str) -> Result<()> {
        let result = self.inner.client.send_message(&self.inner.channel, text).await;

        #[cfg(feature = "metrics")]
        {
            use smsrelay_metrics::{counter, irc};
            match &result {
                Ok(()) => counter!(irc::MESSAGES_SENT_TOTAL).increment(1),
                Err(_) => counter!(irc::SEND_ERRORS_TOTAL).increment(1),
            }
        }

        result
    }

    pub(crate) fn client(&self) -> &Arc<dyn IrcClient> {
        &self.inner.client
    }

    pub(crate) fn transition(&self, next: SessionState) {
        let prev = self.inner.state.send_replace(next);
        if prev != next {
            debug!(from = prev.as_str(), to = next.as_str(), "irc session state changed");
        }

        #[cfg(feature = "metrics")]
        smsrelay_metrics::gauge!(smsrelay_metrics::irc::CONNECTED)
            .set(f64::from(u8::from(next == SessionState::Connected)));
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("channel", &self.inner.channel)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
