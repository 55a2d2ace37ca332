mod auth_commands;
mod config_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Args, Parser, Subcommand},
    secrecy::Secret,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    smsrelay_auth::ConfigAccountStore,
    smsrelay_config::{RelayConfig, Severity, validate},
    smsrelay_gateway::{AppState, start_gateway},
    smsrelay_irc::{ConnectionManager, TlsIrcClient},
};

#[derive(Parser)]
#[command(name = "smsrelay", version, about = "smsrelay: relay HTTP alerts and SMS into an IRC channel")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching for smsrelay.{toml,yaml,json}.
    #[arg(long, global = true, env = "SMSRELAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay (default when no subcommand is provided).
    Serve,
    /// Read a password from stdin and print an argon2 hash for `auth.accounts`.
    HashPassword,
    /// Load and validate the configuration, then report diagnostics.
    CheckConfig,
}

/// Command-line values that take precedence over the config file.
#[derive(Args, Default)]
struct Overrides {
    /// Address to bind the HTTP listener to.
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port for the HTTP listener.
    #[arg(long, global = true)]
    port: Option<u16>,
    #[arg(long, global = true, env = "SMSRELAY_IRC_SERVER")]
    irc_server: Option<String>,
    #[arg(long, global = true, env = "SMSRELAY_IRC_PORT")]
    irc_port: Option<u16>,
    #[arg(long, global = true, env = "SMSRELAY_IRC_NICK")]
    irc_nick: Option<String>,
    #[arg(long, global = true, env = "SMSRELAY_IRC_SASL_USER")]
    irc_sasl_user: Option<String>,
    /// SASL PLAIN password. Prefer the environment variable over the flag.
    #[arg(long, global = true, env = "SMSRELAY_IRC_SASL_PASS", hide_env_values = true)]
    irc_sasl_pass: Option<String>,
    #[arg(long, global = true, env = "SMSRELAY_IRC_CHANNEL")]
    irc_channel: Option<String>,
    #[arg(long, global = true, env = "SMSRELAY_IRC_CHANNEL_KEY", hide_env_values = true)]
    irc_channel_key: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut RelayConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        let irc = &mut config.irc;
        if let Some(server) = self.irc_server {
            irc.server = server;
        }
        if let Some(port) = self.irc_port {
            irc.port = port;
        }
        if let Some(nick) = self.irc_nick {
            irc.nick = nick;
        }
        if let Some(user) = self.irc_sasl_user {
            irc.sasl_user = Some(user);
        }
        if let Some(pass) = self.irc_sasl_pass {
            irc.sasl_password = Some(Secret::new(pass));
        }
        if let Some(channel) = self.irc_channel {
            irc.channel = channel;
        }
        if let Some(key) = self.irc_channel_key {
            irc.channel_key = Some(key);
        }
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the explicit `--config` file, or discover one. A file that exists but
/// cannot be read or parsed is fatal; no file at all means defaults.
fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<RelayConfig> {
    let config = match path {
        Some(path) => smsrelay_config::load_config(path)?,
        None => smsrelay_config::discover_and_load()?,
    };
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received, stopping relay");
}

async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let report = validate(&config);
    for d in &report.diagnostics {
        match d.severity {
            Severity::Error => error!("config {d}"),
            Severity::Warning => warn!("config {d}"),
        }
    }
    if report.has_errors() {
        anyhow::bail!(
            "invalid configuration: {} error(s)",
            report.count(Severity::Error)
        );
    }

    #[cfg(feature = "metrics")]
    let metrics_handle = smsrelay_metrics::init_metrics(smsrelay_metrics::MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        ..Default::default()
    })?;

    let accounts = ConfigAccountStore::from_config(&config.auth);
    info!(accounts = accounts.len(), "loaded relay accounts");

    let cancel = CancellationToken::new();
    let client = Arc::new(TlsIrcClient::new(&config.irc));
    let manager = ConnectionManager::start(&config.irc, client, cancel);

    let state = AppState::new(
        manager.session(),
        Arc::new(accounts),
        config.server.ready_timeout(),
    );
    #[cfg(feature = "metrics")]
    let state = state.with_metrics(metrics_handle);

    let served = start_gateway(
        &config.server.bind,
        config.server.port,
        state,
        shutdown_signal(),
    )
    .await;

    manager.shutdown().await;
    served
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Serve) => {
            info!(version = env!("CARGO_PKG_VERSION"), "smsrelay starting");
            let mut config = load_config(cli.config.as_deref())?;
            cli.overrides.apply(&mut config);
            serve(config).await
        },
        Some(Commands::HashPassword) => auth_commands::hash_password(),
        Some(Commands::CheckConfig) => {
            let mut config = load_config(cli.config.as_deref())?;
            cli.overrides.apply(&mut config);
            config_commands::check(cli.config.as_deref(), &config)
        },
    }
}
