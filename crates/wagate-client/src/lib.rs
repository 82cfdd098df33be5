//! Client for a multi-device chat gateway over WebSocket.
//!
//! The gateway owns the actual messaging protocol: pairing, encryption,
//! and delivery all happen on its side. This crate speaks a small JSON
//! envelope protocol to it, persists the opaque credentials it hands
//! back, and surfaces connection lifecycle events to the caller.

pub mod address;
pub mod client;
mod connection;
pub mod creds;
pub mod error;
pub mod protocol;

pub use address::normalize_recipient;
pub use client::{ChatClient, ClientCommand, ClientConfig};
pub use creds::{AuthState, CredentialStore};
pub use error::ClientError;
pub use protocol::{ClientEvent, DisconnectReason};
