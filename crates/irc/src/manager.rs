use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tokio::{task::JoinHandle, time::Instant},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use smsrelay_config::IrcConfig;

use crate::{
    client::{ConnectedHandler, IrcClient},
    error::Result,
    session::{Session, SessionState},
};

/// Joins the relay channel each time the client (re)registers.
#[derive(Debug, Clone)]
pub struct JoinChannel {
    pub channel: String,
    pub key: Option<String>,
}

#[async_trait]
impl ConnectedHandler for JoinChannel {
    async fn on_connected(&self, client: &dyn IrcClient) -> Result<()> {
        client.join(&self.channel, self.key.as_deref()).await
    }
}

/// Owns connection establishment for the process's single IRC session.
///
/// [`ConnectionManager::start`] returns at once; the handshake runs in a
/// background task that retries forever with a fixed delay and reconnects
/// after every drop.
pub struct ConnectionManager {
    session: Session,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ConnectionManager {
    pub fn start(config: &IrcConfig, client: Arc<dyn IrcClient>, cancel: CancellationToken) -> Self {
        client.on_connected(Arc::new(JoinChannel {
            channel: config.channel.clone(),
            key: config.channel_key.clone(),
        }));

        let session = Session::new(client, config.channel.clone());
        let task = tokio::spawn(connection_loop(
            session.clone(),
            config.server.clone(),
            config.reconnect_delay(),
            cancel.clone(),
        ));

        Self {
            session,
            cancel,
            task,
        }
    }

    /// The shared session handle. Valid immediately, connected or not.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.clone()
    }

    /// Cancel the connect loop and wait for it to leave the network.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "irc connection task ended abnormally");
        }
    }
}

async fn connection_loop(session: Session, server: String, delay: Duration, cancel: CancellationToken) {
    let client = Arc::clone(session.client());
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        session.transition(SessionState::Connecting);
        info!(server = %server, attempt, "connecting to irc server");

        #[cfg(feature = "metrics")]
        smsrelay_metrics::counter!(smsrelay_metrics::irc::CONNECT_ATTEMPTS_TOTAL).increment(1);

        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = client.connect() => result,
        };

        let backoff = match result {
            Ok(()) => {
                session.transition(SessionState::Connected);
                info!(server = %server, channel = session.channel(), "irc session connected");
                let since = Instant::now();

                tokio::select! {
                    () = cancel.cancelled() => {
                        if let Err(e) = client.quit("shutting down").await {
                            debug!(error = %e, "quit not sent");
                        }
                        break;
                    },
                    () = client.closed() => {},
                }

                session.transition(SessionState::Disconnected);
                warn!(server = %server, "irc connection lost, reconnecting");
                delay.saturating_sub(since.elapsed())
            },
            Err(e) => {
                error!(server = %server, attempt, error = %e, "irc connect failed");

                #[cfg(feature = "metrics")]
                smsrelay_metrics::counter!(smsrelay_metrics::irc::CONNECT_FAILURES_TOTAL)
                    .increment(1);

                session.transition(SessionState::Disconnected);
                delay
            },
        };

        if !backoff.is_zero() {
            info!(delay_secs = backoff.as_secs(), "retrying irc connect after delay");
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(backoff) => {},
            }
        }
    }

    session.transition(SessionState::Disconnected);
    info!("irc connection manager stopped");
}
