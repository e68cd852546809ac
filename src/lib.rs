//! Self-hosted OAuth 2.0 authorization-code broker.
//!
//! Users authenticate against a third-party storage provider through this
//! service; it performs the browser-redirect handshake, exchanges the
//! authorization code, hands back an opaque long-lived AuthId and later
//! mints short-lived access tokens on demand (`/refresh`).

pub mod cache;
pub mod catalog;
pub mod config;
pub mod oauth;
pub mod render;
pub mod server;
pub mod shared;
pub mod store;
pub mod test_support;
