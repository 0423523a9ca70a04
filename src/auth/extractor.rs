//! Actix-web extractors for session and admin authentication.
//!
//! # Security
//! - Session cookies are verified against the identity provider's keys on every request
//! - The admin flag is read from the database, never from a cookie
//! - Bootstrap admin keys are wrapped in `SecretString` and compared in constant time

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use futures_util::future::LocalBoxFuture;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use super::AdminKey;
use crate::config::{ADMIN_KEY_HEADER, SESSION_COOKIE};
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::IdentityClaims;
use crate::services::admin_check::verify_admin;
use crate::services::identity::{IdentityProvider, SessionVerifier};

/// Extract a secret header value, wrapping it in SecretString.
/// Returns None if the header is missing or invalid UTF-8.
fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| SecretString::from(s.to_string()))
}

fn session_cookie(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

fn app_data<T: 'static>(req: &HttpRequest) -> Result<web::Data<T>, AppError> {
    req.app_data::<web::Data<T>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("Internal configuration error".to_string()))
}

/// Extractor that requires a valid session cookie.
///
/// ```ignore
/// async fn handler(user: SessionUser) -> impl Responder {
///     // user.uid is the verified provider UID
/// }
/// ```
pub struct SessionUser {
    pub uid: String,
    pub claims: IdentityClaims,
}

impl FromRequest for SessionUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = app_data::<IdentityProvider>(req);
        let cookie = session_cookie(req);

        Box::pin(async move {
            let identity = identity?;
            let cookie = cookie.ok_or_else(|| AppError::Unauthorized("No session".to_string()))?;
            let claims = identity.verify_session_cookie(&cookie).await?;
            Ok(SessionUser {
                uid: claims.sub.clone(),
                claims,
            })
        })
    }
}

/// Extractor that requires an admin.
///
/// Accepts a valid session whose user record carries the admin flag (401
/// without a valid session, 403 when the user is not an admin), or the
/// bootstrap admin key in `X-Admin-Key`.
pub struct AdminUser {
    /// Provider UID, or `None` when authenticated with the bootstrap key.
    pub uid: Option<String>,
}

impl AdminUser {
    /// Identifier recorded as the author of admin edits.
    pub fn actor(&self) -> Option<&str> {
        self.uid.as_deref()
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Bootstrap key first; provided value is dropped (and zeroized) right after
        if let Some(provided) = extract_secret_header(req, ADMIN_KEY_HEADER) {
            let accepted = req
                .app_data::<web::Data<AdminKey>>()
                .is_some_and(|key| key.verify(provided.expose_secret()));
            if accepted {
                return Box::pin(async { Ok(AdminUser { uid: None }) });
            }
            warn!("Rejected request with invalid admin key");
            return Box::pin(async {
                Err(AppError::Unauthorized("Invalid admin key".to_string()))
            });
        }

        let identity = app_data::<IdentityProvider>(req);
        let pool = app_data::<DbPool>(req);
        let cookie = session_cookie(req);
        let path = req.path().to_string();

        Box::pin(async move {
            let identity = identity?;
            let pool = pool?;
            let status =
                verify_admin(identity.get_ref(), pool.connection(), cookie.as_deref()).await?;
            if !status.is_admin {
                warn!("Non-admin uid={} denied access to {}", status.uid, path);
                return Err(AppError::Forbidden("Admin access required".to_string()));
            }
            Ok(AdminUser {
                uid: Some(status.uid),
            })
        })
    }
}
