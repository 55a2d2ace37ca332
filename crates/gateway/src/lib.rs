//! Gateway: the HTTP side of the relay.
//!
//! Every relay request passes the same pipeline:
//! 1. Basic auth against the account store (`401` on failure)
//! 2. JSON body into the route's notification shape (`400` on failure)
//! 3. Wait for the shared IRC session to be connected (`503` on timeout)
//! 4. Format one line and hand it to the session, then answer `200 OK`

pub mod auth_middleware;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics_middleware;
pub mod relay;
pub mod server;

pub use {
    error::GatewayError,
    server::{AppState, build_gateway_app, start_gateway},
};
