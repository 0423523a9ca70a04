//! Business logic services.

pub mod admin_check;
pub mod auth_session;
pub mod identity;

pub use auth_session::configure_routes as configure_auth_routes;
pub use identity::{IdentityProvider, SessionVerifier};
