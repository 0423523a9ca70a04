//! Admin user management.

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::auth::AdminUser;
use crate::db::{DbPool, users};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::{
    Pagination, PaginationParams, SetAdminRequest, UserListResponse, UserResponse,
};

/// List registered users, admins first.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    params(PaginationParams),
    responses(
        (status = 200, description = "Users", body = UserListResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn list_users(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    query: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let (users, total) = users::list(pool.connection(), &query).await?;
    Ok(HttpResponse::Ok().json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        pagination: Pagination::new(query.page(), query.clamped_limit(), total),
    }))
}

/// Grant or revoke admin rights. Admins cannot revoke their own.
#[utoipa::path(
    put,
    path = "/api/admin/users/{uid}/admin",
    tag = "Admin",
    params(("uid" = String, Path, description = "Provider user id")),
    request_body = SetAdminRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 403, description = "Not an admin, or revoking own rights", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn set_admin(
    admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    body: web::Json<SetAdminRequest>,
) -> AppResult<HttpResponse> {
    let uid = path.into_inner();

    if !body.is_admin && admin.actor() == Some(uid.as_str()) {
        return Err(AppError::Forbidden(
            "Admins cannot revoke their own admin rights".to_string(),
        ));
    }

    let user = users::set_admin(pool.connection(), &uid, body.is_admin).await?;
    info!(
        "Admin flag for {} set to {} by {}",
        uid,
        body.is_admin,
        admin.actor().unwrap_or("admin key")
    );
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Admin user routes (mounted under `/admin`).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/users").route(web::get().to(list_users)))
        .service(web::resource("/users/{uid}/admin").route(web::put().to(set_admin)));
}
