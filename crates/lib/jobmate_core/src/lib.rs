//! # jobmate_core
//!
//! Identity and token lifecycle for JobMate: registration, login, OTP-gated
//! verification, OAuth2 federation, and refresh-token rotation.

pub mod auth;
pub mod config;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod oauth;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
