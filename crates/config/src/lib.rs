//! Configuration loading, validation and env substitution.
//!
//! Config files: `smsrelay.toml`, `smsrelay.yaml` or `smsrelay.json`,
//! searched in `./` then `~/.config/smsrelay/`.
//!
//! Supports `${ENV_VAR}` substitution anywhere in the raw file.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{AccountConfig, AuthConfig, IrcConfig, MetricsConfig, RelayConfig, ServerConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
