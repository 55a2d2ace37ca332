//! Request authorization for the relay endpoints.
//!
//! This crate provides:
//! - `Credential` extraction from `Authorization: Basic` headers
//! - the `AccountStore` seam plus a config-backed implementation
//! - argon2 password hashing and verification

pub mod basic;
pub mod error;
pub mod password;
pub mod store;

pub use {
    basic::{Credential, parse_basic_auth},
    error::{Error, Result},
    password::{hash_password, verify_password},
    store::{Account, AccountStore, ConfigAccountStore, authenticate},
};
