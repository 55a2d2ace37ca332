//! Metric names and the recorder setup for smsrelay.
//!
//! Call sites record through the `metrics` facade macros re-exported here.
//! Without an installed recorder every call is a no-op, so library crates can
//! record unconditionally.
//!
//! ```rust,ignore
//! use smsrelay_metrics::{counter, irc};
//!
//! counter!(irc::MESSAGES_SENT_TOTAL).increment(1);
//! ```
//!
//! # Features
//!
//! - `prometheus`: install a Prometheus recorder and render it for `/metrics`

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
