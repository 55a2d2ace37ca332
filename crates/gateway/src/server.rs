use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use {
    axum::{
        Router,
        extract::{DefaultBodyLimit, State},
        middleware,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer},
    tracing::info,
};

use {smsrelay_auth::AccountStore, smsrelay_irc::Session};

use crate::{
    auth_middleware::require_basic_auth,
    relay::{alert_handler, sms_handler},
};

/// Largest request body accepted on any route.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub session: Session,
    pub accounts: Arc<dyn AccountStore>,
    /// How long a relay request waits for the session before answering 503.
    pub ready_timeout: Duration,
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<smsrelay_metrics::MetricsHandle>,
}

impl AppState {
    pub fn new(session: Session, accounts: Arc<dyn AccountStore>, ready_timeout: Duration) -> Self {
        Self {
            session,
            accounts,
            ready_timeout,
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        }
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, handle: smsrelay_metrics::MetricsHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: AppState) -> Router {
    let relay = Router::new()
        .route("/alert", post(alert_handler))
        .route("/alert/{*rest}", post(alert_handler))
        .route("/sms", post(sms_handler))
        .route("/sms/{*rest}", post(sms_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ));

    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(relay);

    #[cfg(feature = "prometheus")]
    let router = router.route("/metrics", get(prometheus_metrics_handler));

    #[cfg(feature = "metrics")]
    let router = router.layer(middleware::from_fn(
        crate::metrics_middleware::http_metrics_middleware,
    ));

    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `bind:port` and serve until `shutdown` resolves.
pub async fn start_gateway(
    bind: &str,
    port: u16,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, channel = state.session.channel(), "relay gateway listening");

    let app = build_gateway_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("relay gateway stopped");
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "irc": state.session.state(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Prometheus scrape endpoint. Unauthenticated so scrapers need no
/// credentials.
#[cfg(feature = "prometheus")]
async fn prometheus_metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    use axum::http::{StatusCode, header};

    match state.metrics_handle.as_ref() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "metrics not enabled".to_string(),
        ),
    }
}
