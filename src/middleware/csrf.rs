//! CSRF double-submit protection.
//!
//! State-changing requests must echo the `csrf-token` cookie in the
//! `x-csrf-token` header.

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::Method;
use actix_web::{Error, HttpResponse, web};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::auth::AdminKey;
use crate::config::{ADMIN_KEY_HEADER, CSRF_COOKIE, CSRF_HEADER};
use crate::error::ErrorResponse;

/// Error code returned on a failed check.
pub const CSRF_ERROR_CODE: &str = "CSRF_TOKEN_INVALID";

/// Generate a fresh token: 32 random bytes, hex-encoded.
pub fn generate_token() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}

/// Methods that must carry a token.
pub fn requires_token(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Both tokens present, non-empty and equal (constant time).
pub fn tokens_match(header: Option<&str>, cookie: Option<&str>) -> bool {
    match (header, cookie) {
        (Some(h), Some(c)) if !h.is_empty() && !c.is_empty() => {
            h.as_bytes().ct_eq(c.as_bytes()).into()
        }
        _ => false,
    }
}

/// The request carries the configured bootstrap admin key.
///
/// A present but wrong key does not count.
fn has_valid_admin_key(req: &ServiceRequest) -> bool {
    let Some(provided) = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    req.app_data::<web::Data<AdminKey>>()
        .is_some_and(|key| key.verify(provided))
}

/// CSRF middleware factory.
///
/// Requests carrying a valid bootstrap admin key skip the check.
pub struct CsrfProtection;

impl<S, B> Transform<S, ServiceRequest> for CsrfProtection
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = CsrfMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CsrfMiddleware { service }))
    }
}

pub struct CsrfMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for CsrfMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let checked = requires_token(req.method()) && !has_valid_admin_key(&req);

        if checked {
            let header = req
                .headers()
                .get(CSRF_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let cookie = req.cookie(CSRF_COOKIE).map(|c| c.value().to_string());

            if !tokens_match(header.as_deref(), cookie.as_deref()) {
                warn!(
                    method = %req.method(),
                    path = %req.path(),
                    header_present = header.is_some(),
                    cookie_present = cookie.is_some(),
                    "CSRF token check failed"
                );
                let response = HttpResponse::Forbidden().json(ErrorResponse {
                    error: CSRF_ERROR_CODE.to_string(),
                    message: "Invalid CSRF token".to_string(),
                    detail: None,
                });
                return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}
