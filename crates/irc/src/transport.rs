use std::{
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    base64::Engine,
    secrecy::{ExposeSecret, Secret},
    tokio::{
        io::{
            AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
            WriteHalf,
        },
        net::TcpStream,
        sync::{mpsc, watch},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, trace, warn},
};

use smsrelay_config::IrcConfig;

use crate::{
    client::{ConnectedHandler, IrcClient},
    error::{Error, Result},
    message::{Command, Message, split_message, text_budget},
    tls,
};

/// AUTHENTICATE payloads are sent in chunks of at most this many bytes.
const SASL_CHUNK: usize = 400;

/// Inbound lines longer than this are discarded unread.
const MAX_INBOUND_LINE: usize = 8 * 1024;

trait IrcStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> IrcStream for T {}

type LineReader = BufReader<ReadHalf<Box<dyn IrcStream>>>;
type LineWriter = WriteHalf<Box<dyn IrcStream>>;

/// Connection parameters, copied out of [`IrcConfig`] at construction.
#[derive(Debug, Clone)]
struct ClientConfig {
    server: String,
    port: u16,
    tls: bool,
    nick: String,
    user: String,
    realname: String,
    sasl: Option<(String, Secret<String>)>,
    connect_timeout: Duration,
}

/// A live socket: the write queue feeding the writer task and the token that
/// stops both I/O tasks.
struct Link {
    id: u64,
    tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

struct Inner {
    config: ClientConfig,
    link: Mutex<Option<Link>>,
    next_link_id: AtomicU64,
    connected: watch::Sender<bool>,
    handlers: RwLock<Vec<Arc<dyn ConnectedHandler>>>,
}

impl Inner {
    fn sender(&self) -> Option<mpsc::UnboundedSender<String>> {
        self.link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|link| link.tx.clone())
    }

    fn queue(&self, command: Command<'_>) -> Result<()> {
        self.queue_batch([command])
    }

    /// Queue several lines as one write-queue entry, so lines from different
    /// callers never interleave and a dropped link takes all of them or none.
    fn queue_batch<'a>(&self, commands: impl IntoIterator<Item = Command<'a>>) -> Result<()> {
        let batch = commands
            .into_iter()
            .map(|command| command.to_string())
            .collect::<Vec<_>>()
            .join("\r\n");
        if batch.is_empty() {
            return Ok(());
        }
        let tx = self.sender().ok_or(Error::NotConnected)?;
        tx.send(batch).map_err(|_| Error::NotConnected)
    }

    /// Tear down link `id`. A stale task from an earlier connection must not
    /// clobber a newer one, hence the id check.
    fn drop_link(&self, id: u64, reason: &str) {
        let mut slot = self.link.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|link| link.id == id)
            && let Some(link) = slot.take()
        {
            link.cancel.cancel();
            self.connected.send_replace(false);
            info!(server = %self.config.server, reason, "irc connection closed");
        }
    }
}

/// IRC client over TCP, with TLS by default.
///
/// Registration (CAP/SASL PLAIN, NICK, USER) happens inside [`connect`]. After
/// that a reader task answers PINGs and a writer task drains a queue of
/// outbound lines, so [`send_message`] is cheap and safe from any task.
///
/// [`connect`]: IrcClient::connect
/// [`send_message`]: IrcClient::send_message
#[derive(Clone)]
pub struct TlsIrcClient {
    inner: Arc<Inner>,
}

impl TlsIrcClient {
    #[must_use]
    pub fn new(config: &IrcConfig) -> Self {
        let sasl = config
            .sasl_credentials()
            .map(|(user, pass)| (user.to_string(), pass.clone()));
        let (connected, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config: ClientConfig {
                    server: config.server.clone(),
                    port: config.port,
                    tls: config.tls,
                    nick: config.nick.clone(),
                    user: config.user.clone(),
                    realname: config.realname.clone(),
                    sasl,
                    connect_timeout: config.connect_timeout(),
                },
                link: Mutex::new(None),
                next_link_id: AtomicU64::new(1),
                connected,
                handlers: RwLock::new(Vec::new()),
            }),
        }
    }

    async fn open(&self) -> Result<(LineReader, LineWriter)> {
        let config = &self.inner.config;
        let tcp = TcpStream::connect((config.server.as_str(), config.port)).await?;
        tcp.set_nodelay(true)?;

        let stream: Box<dyn IrcStream> = if config.tls {
            Box::new(tls::wrap(&config.server, tcp).await?)
        } else {
            Box::new(tcp)
        };
        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);
        let mut writer = write_half;

        register(config, &mut reader, &mut writer).await?;
        Ok((reader, writer))
    }

    async fn run_handlers(&self) {
        let handlers = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            if let Err(e) = handler.on_connected(self).await {
                warn!(error = %e, "irc on-connected handler failed");
            }
        }
    }
}

#[async_trait]
impl IrcClient for TlsIrcClient {
    async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let config = &self.inner.config;
        debug!(server = %config.server, port = config.port, tls = config.tls, "opening irc connection");
        let (reader, writer) = tokio::time::timeout(config.connect_timeout, self.open())
            .await
            .map_err(|_| Error::ConnectTimeout {
                server: config.server.clone(),
                timeout: config.connect_timeout,
            })??;

        let id = self.inner.next_link_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        {
            let mut slot = self.inner.link.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(old) = slot.replace(Link {
                id,
                tx: tx.clone(),
                cancel: cancel.clone(),
            }) {
                old.cancel.cancel();
            }
        }
        self.inner.connected.send_replace(true);

        tokio::spawn(write_loop(Arc::clone(&self.inner), id, writer, rx, cancel.clone()));
        tokio::spawn(read_loop(Arc::clone(&self.inner), id, reader, tx, cancel));

        info!(server = %config.server, "irc registration complete");
        self.run_handlers().await;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.inner.connected.borrow()
    }

    async fn send_message(&self, channel: &str, text: &str) -> Result<()> {
        self.inner.queue_batch(
            split_message(text, text_budget(channel))
                .into_iter()
                .map(|chunk| Command::Privmsg {
                    target: channel,
                    text: chunk,
                }),
        )
    }

    async fn join(&self, channel: &str, key: Option<&str>) -> Result<()> {
        debug!(channel, keyed = key.is_some(), "joining channel");
        self.inner.queue(Command::Join { channel, key })
    }

    fn on_connected(&self, handler: Arc<dyn ConnectedHandler>) {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    async fn closed(&self) {
        let mut rx = self.inner.connected.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot error.
        let _ = rx.wait_for(|connected| !*connected).await;
    }

    async fn quit(&self, reason: &str) -> Result<()> {
        self.inner.queue(Command::Quit(reason))
    }
}

/// Drive CAP/SASL/NICK/USER until the server welcomes us with `001`.
async fn register(config: &ClientConfig, reader: &mut LineReader, writer: &mut LineWriter) -> Result<()> {
    if config.sasl.is_some() {
        write_line(writer, Command::CapReq("sasl")).await?;
    }
    let mut nick = config.nick.clone();
    write_line(writer, Command::Nick(&nick)).await?;
    write_line(writer, Command::User {
        user: &config.user,
        realname: &config.realname,
    })
    .await?;

    loop {
        let Some(msg) = read_message(reader).await? else {
            return Err(Error::closed("server closed the connection during registration"));
        };
        trace!(command = %msg.command, "registration reply");

        match msg.command.as_str() {
            "PING" => write_line(writer, Command::Pong(msg.trailing())).await?,
            "CAP" => match msg.param(1) {
                Some("ACK") if msg.trailing().split(' ').any(|cap| cap == "sasl") => {
                    write_line(writer, Command::Authenticate("PLAIN")).await?;
                },
                Some("NAK") => {
                    warn!(server = %config.server, "server refused SASL, continuing unauthenticated");
                    write_line(writer, Command::CapEnd).await?;
                },
                _ => {},
            },
            "AUTHENTICATE" if msg.param(0) == Some("+") => {
                if let Some((user, pass)) = &config.sasl {
                    for chunk in sasl_plain_chunks(user, pass) {
                        write_line(writer, Command::Authenticate(&chunk)).await?;
                    }
                }
            },
            "903" => {
                debug!("sasl authentication succeeded");
                write_line(writer, Command::CapEnd).await?;
            },
            "902" | "904" | "905" | "906" => {
                return Err(Error::SaslRejected {
                    reason: msg.trailing().to_string(),
                });
            },
            "433" => {
                nick.push('_');
                debug!(nick = %nick, "nickname in use, retrying");
                write_line(writer, Command::Nick(&nick)).await?;
            },
            "001" => {
                debug!(nick = %nick, "registered");
                return Ok(());
            },
            "ERROR" => return Err(Error::closed(msg.trailing())),
            _ => {},
        }
    }
}

/// Base64 `authzid\0authcid\0password`, split for AUTHENTICATE. A payload
/// that is an exact multiple of the chunk size ends with a lone `+`.
fn sasl_plain_chunks(user: &str, pass: &Secret<String>) -> Vec<String> {
    let raw = format!("{user}\0{user}\0{}", pass.expose_secret());
    let encoded = base64::engine::general_purpose::STANDARD.encode(raw);

    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();
    if encoded.len() % SASL_CHUNK == 0 {
        chunks.push("+".to_string());
    }
    chunks
}

async fn write_line(writer: &mut LineWriter, command: Command<'_>) -> Result<()> {
    let mut line = command.to_string();
    line.push_str("\r\n");
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the next non-blank line. `None` on EOF. Invalid UTF-8 is replaced
/// rather than treated as fatal; oversized lines are skipped.
async fn read_message(reader: &mut LineReader) -> Result<Option<Message>> {
    let mut buf = Vec::with_capacity(512);
    loop {
        buf.clear();
        let n = (&mut *reader)
            .take(MAX_INBOUND_LINE as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        if n == MAX_INBOUND_LINE && buf.last() != Some(&b'\n') {
            let skipped = n + discard_line(reader).await?;
            warn!(bytes = skipped, "discarding oversized irc line");
            continue;
        }
        if let Some(msg) = Message::parse(&String::from_utf8_lossy(&buf)) {
            return Ok(Some(msg));
        }
    }
}

/// Consume input up to and including the next `\n` without buffering it.
async fn discard_line(reader: &mut LineReader) -> Result<usize> {
    let mut skipped = 0;
    loop {
        let (newline, available) = {
            let chunk = reader.fill_buf().await?;
            (chunk.iter().position(|&b| b == b'\n'), chunk.len())
        };
        match newline {
            Some(i) => {
                reader.consume(i + 1);
                return Ok(skipped + i + 1);
            },
            None if available == 0 => return Ok(skipped),
            None => {
                reader.consume(available);
                skipped += available;
            },
        }
    }
}

async fn write_loop(
    inner: Arc<Inner>,
    id: u64,
    mut writer: LineWriter,
    mut rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    let reason = loop {
        let line = tokio::select! {
            () = cancel.cancelled() => break "cancelled",
            line = rx.recv() => line,
        };
        let Some(mut line) = line else {
            break "write queue closed";
        };
        line.push_str("\r\n");
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!(error = %e, "irc write failed");
            break "write error";
        }
        if let Err(e) = writer.flush().await {
            warn!(error = %e, "irc flush failed");
            break "write error";
        }
    };
    // Best effort: flush anything already written (e.g. a QUIT) before closing.
    let _ = writer.shutdown().await;
    inner.drop_link(id, reason);
}

async fn read_loop(
    inner: Arc<Inner>,
    id: u64,
    mut reader: LineReader,
    tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
) {
    let reason = loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break "cancelled".to_string(),
            next = read_message(&mut reader) => next,
        };
        match next {
            Ok(Some(msg)) => match msg.command.as_str() {
                "PING" => {
                    let _ = tx.send(Command::Pong(msg.trailing()).to_string());
                },
                "ERROR" => break format!("server error: {}", msg.trailing()),
                "KICK" => {
                    warn!(
                        channel = msg.param(0).unwrap_or_default(),
                        target = msg.param(1).unwrap_or_default(),
                        "kick observed"
                    );
                },
                _ => trace!(command = %msg.command, "ignoring irc message"),
            },
            Ok(None) => break "server closed the connection".to_string(),
            Err(e) => break format!("read error: {e}"),
        }
    };
    inner.drop_link(id, &reason);
}
