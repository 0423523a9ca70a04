//! Admin verification for session cookies.

use std::future::Future;
use std::time::{Duration, Instant};

use sea_orm::DatabaseConnection;
use tracing::{debug, warn};

use super::identity::SessionVerifier;
use crate::db::users;
use crate::error::{AppError, AppResult};

/// Outcome of a successful session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminStatus {
    pub uid: String,
    pub is_admin: bool,
}

/// Verify a session cookie and look up the admin flag of its user.
///
/// - no cookie: `Unauthorized`
/// - invalid or expired cookie: `Unauthorized`
/// - valid cookie without a user record: not an admin
pub async fn verify_admin<V: SessionVerifier + ?Sized>(
    verifier: &V,
    db: &DatabaseConnection,
    cookie: Option<&str>,
) -> AppResult<AdminStatus> {
    let cookie = cookie.filter(|c| !c.is_empty()).ok_or_else(|| {
        debug!("Admin check without session cookie");
        AppError::Unauthorized("No session".to_string())
    })?;

    let claims = verifier.verify_session_cookie(cookie).await?;
    let uid = claims.sub;

    let is_admin = match users::find_by_uid(db, &uid).await? {
        Some(user) => user.is_admin,
        None => {
            warn!("Verified session for uid={} has no user record", uid);
            false
        }
    };

    Ok(AdminStatus { uid, is_admin })
}

/// Await `fut`, then sleep for whatever is left of `min`.
///
/// Outcomes that finish quickly (missing cookie) and slowly (key fetch,
/// database read) become indistinguishable by timing.
pub async fn with_min_latency<F: Future>(min: Duration, fut: F) -> F::Output {
    let started = Instant::now();
    let output = fut.await;
    let elapsed = started.elapsed();
    if elapsed < min {
        tokio::time::sleep(min - elapsed).await;
    }
    output
}
