//! Domain models.
//!
//! These are internal domain models, distinct from the HTTP request and
//! response shapes in `jobmate_api` (which use camelCase on the wire).

pub mod auth;
pub mod identity;

pub use auth::*;
pub use identity::*;
