//! API E2E test suite.
//!
//! Runs the full middleware stack (rate limiter, CSRF) and routes against a
//! mock identity provider and a mock database. No external services needed.
//!
//! Run with: cargo test --test api_e2e

mod mock_identity_provider;
mod test_helpers;

mod test_admin_api;
mod test_admin_check;
mod test_guards;
mod test_session_flow;
