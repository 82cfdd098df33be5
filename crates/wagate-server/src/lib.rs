//! HTTP façade over a persistent chat-network session.
//!
//! Three moving parts: a session runner that owns the gateway connection
//! and drives reconnection, a QR cache holding the latest pairing
//! challenge, and an axum router translating HTTP requests into reads of
//! the shared session context.

pub mod api;
pub mod config;
pub mod qr;
pub mod session;
