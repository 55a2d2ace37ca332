//! Data contracts shared by the relay crates: the inbound notification
//! payloads and the chat line each one renders to.

pub mod notification;

pub use notification::{AlertInfo, Notification, SmsInfo};
