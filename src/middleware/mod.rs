//! HTTP middleware: request logging, rate limiting and CSRF protection.

pub mod csrf;
pub mod rate_limit;
mod request_logger;

pub use csrf::CsrfProtection;
pub use rate_limit::{InMemoryRateLimitStore, RateLimitDecision, RateLimitStore, RateLimiter};
pub use request_logger::RequestLogger;
