//! The relay's single outbound IRC session.
//!
//! - [`client`]: the capability set the relay needs from an IRC protocol
//!   layer, plus [`TlsIrcClient`], the implementation used in production.
//! - [`session`]: the shared [`Session`] handle and its state machine.
//! - [`manager`]: the background task that owns connect, reconnect and
//!   channel join.

pub mod client;
pub mod error;
pub mod manager;
pub mod message;
pub mod session;
mod tls;
mod transport;

pub use {
    client::{ConnectedHandler, IrcClient},
    error::{Error, Result},
    manager::{ConnectionManager, JoinChannel},
    session::{Session, SessionState},
    transport::TlsIrcClient,
};
