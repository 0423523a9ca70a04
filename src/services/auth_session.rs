//! Session routes for the web UI.
//!
//! Sessions are provider-issued cookies; nothing is stored server-side.
//!
//! Endpoints:
//! 1. GET /auth/csrf: issue a CSRF token cookie
//! 2. POST /auth/session: exchange a fresh ID token for a session cookie
//! 3. POST /auth/logout: clear session cookies
//! 4. GET /auth/me: current user, or null
//! 5. PUT /auth/profile: edit own display name / photo
//! 6. GET /auth/check-admin: `{isAdmin, uid}` with a latency floor

use std::time::Duration;

use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::{HttpRequest, HttpResponse, ResponseError, get, post, put, web};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use super::admin_check::{verify_admin, with_min_latency};
use super::identity::{IdentityProvider, is_recent_sign_in};
use crate::auth::SessionUser;
use crate::config::{ADMIN_SESSION_COOKIE, CSRF_COOKIE, Config, SESSION_COOKIE};
use crate::db::DbPool;
use crate::db::users::{self, SignInProfile};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::middleware::csrf::generate_token;
use crate::models::{
    AdminCheckResponse, CsrfTokenResponse, CurrentUserResponse, LoginRequest,
    UpdateProfileRequest,
};

/// Configure session routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(csrf_token)
        .service(create_session)
        .service(logout)
        .service(get_current_user)
        .service(update_profile)
        .service(check_admin);
}

fn base_cookie(
    name: &'static str,
    value: String,
    http_only: bool,
    same_site: SameSite,
    secure: bool,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(http_only);
    cookie.set_same_site(same_site);
    cookie.set_secure(secure);
    cookie
}

fn session_cookie(value: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(SESSION_COOKIE, value, true, SameSite::Lax, secure);
    cookie.set_max_age(time::Duration::seconds(ttl.as_secs() as i64));
    cookie
}

/// UI hint only: readable by scripts, never trusted by the server.
fn admin_hint_cookie(ttl: Duration, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(
        ADMIN_SESSION_COOKIE,
        "1".to_string(),
        false,
        SameSite::Lax,
        secure,
    );
    cookie.set_max_age(time::Duration::seconds(ttl.as_secs() as i64));
    cookie
}

fn removal_cookie(name: &'static str, http_only: bool, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(name, String::new(), http_only, SameSite::Lax, secure);
    cookie.make_removal();
    cookie
}

fn session_ttl(config: &Config) -> Duration {
    Duration::from_secs(config.identity.session_ttl_secs)
}

// ============================================================================
// Endpoints
// ============================================================================

/// Issue a CSRF token.
///
/// The token is set as a script-readable cookie and returned in the body;
/// clients echo it in the `x-csrf-token` header on state-changing requests.
#[utoipa::path(
    get,
    path = "/api/auth/csrf",
    tag = "Auth",
    responses(
        (status = 200, description = "Fresh CSRF token", body = CsrfTokenResponse)
    )
)]
#[get("/auth/csrf")]
pub async fn csrf_token(config: web::Data<Config>) -> HttpResponse {
    let token = generate_token();
    let cookie = base_cookie(
        CSRF_COOKIE,
        token.clone(),
        false,
        SameSite::Strict,
        config.environment.is_production(),
    );
    HttpResponse::Ok()
        .cookie(cookie)
        .json(CsrfTokenResponse { csrf_token: token })
}

/// Sign in: exchange a provider ID token for a session cookie.
#[utoipa::path(
    post,
    path = "/api/auth/session",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = CurrentUserResponse),
        (status = 401, description = "Invalid, expired or stale ID token", body = ErrorResponse),
        (status = 403, description = "CSRF token missing or invalid", body = ErrorResponse),
        (status = 502, description = "Identity provider unavailable", body = ErrorResponse)
    )
)]
#[post("/auth/session")]
pub async fn create_session(
    body: web::Json<LoginRequest>,
    identity: web::Data<IdentityProvider>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    if !identity.can_create_sessions() {
        return Err(AppError::InvalidInput(
            "Sign-in is not configured on this server".to_string(),
        ));
    }

    let id_token = SecretString::from(body.into_inner().id_token);
    let claims = identity.verify_id_token(&id_token).await?;

    let now = Utc::now().timestamp().max(0) as u64;
    if !is_recent_sign_in(&claims, now) {
        warn!("Sign-in rejected for uid={}: ID token is not recent", claims.sub);
        return Err(AppError::Unauthorized("Recent sign-in required".to_string()));
    }

    let ttl = session_ttl(&config);
    let session = identity.create_session_cookie(&id_token, ttl).await?;

    let user = users::upsert_on_sign_in(
        pool.connection(),
        &claims.sub,
        SignInProfile {
            display_name: claims.name.as_deref(),
            email: claims.email.as_deref(),
            photo_url: claims.picture.as_deref(),
        },
    )
    .await?;

    info!("Session created for uid={}", user.uid);

    let secure = config.environment.is_production();
    let hint = if user.is_admin {
        admin_hint_cookie(ttl, secure)
    } else {
        removal_cookie(ADMIN_SESSION_COOKIE, false, secure)
    };

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(
            session.expose_secret().to_string(),
            ttl,
            secure,
        ))
        .cookie(hint)
        .json(CurrentUserResponse {
            user: Some(user.into()),
        }))
}

/// Sign out: clear the session and admin hint cookies.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Cookies cleared")
    )
)]
#[post("/auth/logout")]
pub async fn logout(config: web::Data<Config>) -> HttpResponse {
    let secure = config.environment.is_production();
    HttpResponse::Ok()
        .cookie(removal_cookie(SESSION_COOKIE, true, secure))
        .cookie(removal_cookie(ADMIN_SESSION_COOKIE, false, secure))
        .json(serde_json::json!({ "message": "Logged out" }))
}

/// Current user from the session cookie; `{user: null}` when signed out.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user or null", body = CurrentUserResponse)
    )
)]
#[get("/auth/me")]
pub async fn get_current_user(
    session: Option<SessionUser>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let user = match session {
        Some(s) => users::find_by_uid(pool.connection(), &s.uid).await?,
        None => None,
    };
    Ok(HttpResponse::Ok().json(CurrentUserResponse {
        user: user.map(Into::into),
    }))
}

/// Edit the signed-in user's profile.
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    tag = "Auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated user", body = CurrentUserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
#[put("/auth/profile")]
pub async fn update_profile(
    session: SessionUser,
    body: web::Json<UpdateProfileRequest>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let user = users::update_profile(pool.connection(), &session.uid, &body).await?;
    Ok(HttpResponse::Ok().json(CurrentUserResponse {
        user: Some(user.into()),
    }))
}

/// Check whether the session belongs to an admin.
///
/// Never answers faster than the configured minimum latency. Refreshes the
/// admin hint cookie to match the answer.
#[utoipa::path(
    get,
    path = "/api/auth/check-admin",
    tag = "Auth",
    responses(
        (status = 200, description = "Admin status", body = AdminCheckResponse),
        (status = 401, description = "Missing, invalid or expired session", body = ErrorResponse)
    )
)]
#[get("/auth/check-admin")]
pub async fn check_admin(
    req: HttpRequest,
    identity: web::Data<IdentityProvider>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> HttpResponse {
    let cookie = req
        .cookie(SESSION_COOKIE)
        .map(|c| c.value().to_string());
    let secure = config.environment.is_production();

    let result = with_min_latency(
        config.security.admin_check_min_latency(),
        verify_admin(identity.get_ref(), pool.connection(), cookie.as_deref()),
    )
    .await;

    match result {
        Ok(status) => {
            let hint = if status.is_admin {
                admin_hint_cookie(session_ttl(&config), secure)
            } else {
                removal_cookie(ADMIN_SESSION_COOKIE, false, secure)
            };
            HttpResponse::Ok().cookie(hint).json(AdminCheckResponse {
                is_admin: status.is_admin,
                uid: status.uid,
            })
        }
        Err(err) => {
            let mut response = err.error_response();
            if let Err(e) = response.add_cookie(&removal_cookie(ADMIN_SESSION_COOKIE, false, secure))
            {
                warn!("Failed to clear admin hint cookie: {}", e);
            }
            response
        }
    }
}
