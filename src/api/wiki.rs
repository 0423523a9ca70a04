//! Wiki endpoints: public reads and admin editing.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::db::{DbPool, wiki_pages, wiki_revisions};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::content::ContentStatus;
use crate::models::{
    CreateWikiPageRequest, ListWikiQuery, Pagination, PaginationParams, UpdateWikiPageRequest,
    WikiPage, WikiPageListResponse, WikiRevision,
};

fn page_not_found() -> AppError {
    AppError::NotFound("Wiki page".to_string())
}

async fn list_response(
    pool: &DbPool,
    query: &ListWikiQuery,
    public: bool,
) -> AppResult<WikiPageListResponse> {
    let params = PaginationParams::new(query.page, query.limit);
    let (pages, total) = wiki_pages::list_pages(pool.connection(), query, public).await?;
    Ok(WikiPageListResponse {
        pages: pages.into_iter().map(WikiPage::from).collect(),
        pagination: Pagination::new(params.page(), params.clamped_limit(), total),
    })
}

/// List published wiki pages.
#[utoipa::path(
    get,
    path = "/api/wiki",
    tag = "Wiki",
    params(ListWikiQuery),
    responses(
        (status = 200, description = "Published pages", body = WikiPageListResponse)
    )
)]
pub async fn list_public_pages(
    pool: web::Data<DbPool>,
    query: web::Query<ListWikiQuery>,
) -> AppResult<HttpResponse> {
    let response = list_response(&pool, &query, true).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Get a published wiki page by slug.
#[utoipa::path(
    get,
    path = "/api/wiki/{slug}",
    tag = "Wiki",
    params(
        ("slug" = String, Path, description = "Page slug")
    ),
    responses(
        (status = 200, description = "Wiki page", body = WikiPage),
        (status = 404, description = "Not found or not published", body = ErrorResponse)
    )
)]
pub async fn get_public_page(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let page = wiki_pages::get_page_by_slug(pool.connection(), &path)
        .await?
        .filter(|p| p.status == ContentStatus::Published.as_str())
        .ok_or_else(page_not_found)?;
    Ok(HttpResponse::Ok().json(WikiPage::from(page)))
}

/// List wiki pages of any status (admin).
#[utoipa::path(
    get,
    path = "/api/admin/wiki",
    tag = "Admin",
    params(ListWikiQuery),
    responses(
        (status = 200, description = "Pages", body = WikiPageListResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn list_pages(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    query: web::Query<ListWikiQuery>,
) -> AppResult<HttpResponse> {
    let response = list_response(&pool, &query, false).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Create a wiki page (admin).
#[utoipa::path(
    post,
    path = "/api/admin/wiki",
    tag = "Admin",
    request_body = CreateWikiPageRequest,
    responses(
        (status = 201, description = "Page created", body = WikiPage),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn create_page(
    admin: AdminUser,
    pool: web::Data<DbPool>,
    body: web::Json<CreateWikiPageRequest>,
) -> AppResult<HttpResponse> {
    let page = wiki_pages::create_page(pool.connection(), &body, admin.actor()).await?;
    Ok(HttpResponse::Created().json(WikiPage::from(page)))
}

/// Get a wiki page by id, any status (admin).
#[utoipa::path(
    get,
    path = "/api/admin/wiki/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Page id")),
    responses(
        (status = 200, description = "Wiki page", body = WikiPage),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn get_page(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let page = wiki_pages::get_page(pool.connection(), *path)
        .await?
        .ok_or_else(page_not_found)?;
    Ok(HttpResponse::Ok().json(WikiPage::from(page)))
}

/// Edit a wiki page (admin). Stores the previous state as a revision.
#[utoipa::path(
    put,
    path = "/api/admin/wiki/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Page id")),
    request_body = UpdateWikiPageRequest,
    responses(
        (status = 200, description = "Updated page", body = WikiPage),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn update_page(
    admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateWikiPageRequest>,
) -> AppResult<HttpResponse> {
    let page = wiki_pages::update_page(pool.connection(), *path, &body, admin.actor()).await?;
    Ok(HttpResponse::Ok().json(WikiPage::from(page)))
}

/// Archive a wiki page (admin).
#[utoipa::path(
    post,
    path = "/api/admin/wiki/{id}/archive",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Page id")),
    responses(
        (status = 200, description = "Archived page", body = WikiPage),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn archive_page(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let page = wiki_pages::archive_page(pool.connection(), *path).await?;
    Ok(HttpResponse::Ok().json(WikiPage::from(page)))
}

/// Restore an archived wiki page to published (admin).
#[utoipa::path(
    post,
    path = "/api/admin/wiki/{id}/unarchive",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Page id")),
    responses(
        (status = 200, description = "Published page", body = WikiPage),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn unarchive_page(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let page = wiki_pages::unarchive_page(pool.connection(), *path).await?;
    Ok(HttpResponse::Ok().json(WikiPage::from(page)))
}

/// Revision history of a page, oldest first (admin).
#[utoipa::path(
    get,
    path = "/api/admin/wiki/{id}/revisions",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Page id")),
    responses(
        (status = 200, description = "Revisions", body = Vec<WikiRevision>),
        (status = 404, description = "Page not found", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn list_revisions(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let page_id = path.into_inner();
    wiki_pages::get_page(pool.connection(), page_id)
        .await?
        .ok_or_else(page_not_found)?;

    let revisions: Vec<WikiRevision> = wiki_revisions::list_for_page(pool.connection(), page_id)
        .await?
        .into_iter()
        .map(WikiRevision::from)
        .collect();
    Ok(HttpResponse::Ok().json(revisions))
}

/// One stored revision (admin).
#[utoipa::path(
    get,
    path = "/api/admin/wiki/{id}/revisions/{revision_id}",
    tag = "Admin",
    params(
        ("id" = Uuid, Path, description = "Page id"),
        ("revision_id" = Uuid, Path, description = "Revision id")
    ),
    responses(
        (status = 200, description = "Revision", body = WikiRevision),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn get_revision(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (page_id, revision_id) = path.into_inner();
    let revision = wiki_revisions::get(pool.connection(), page_id, revision_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Revision".to_string()))?;
    Ok(HttpResponse::Ok().json(WikiRevision::from(revision)))
}

/// Bring a page back to a stored revision (admin). Recorded as a normal edit.
#[utoipa::path(
    post,
    path = "/api/admin/wiki/{id}/revisions/{revision_id}/restore",
    tag = "Admin",
    params(
        ("id" = Uuid, Path, description = "Page id"),
        ("revision_id" = Uuid, Path, description = "Revision id")
    ),
    responses(
        (status = 200, description = "Restored page", body = WikiPage),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn restore_revision(
    admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (page_id, revision_id) = path.into_inner();
    let page =
        wiki_pages::restore_revision(pool.connection(), page_id, revision_id, admin.actor())
            .await?;
    Ok(HttpResponse::Ok().json(WikiPage::from(page)))
}

/// Public wiki routes.
pub fn configure_public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/wiki").route(web::get().to(list_public_pages)))
        .service(web::resource("/wiki/{slug}").route(web::get().to(get_public_page)));
}

/// Admin wiki routes (mounted under `/admin`).
pub fn configure_admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/wiki")
            .route(web::get().to(list_pages))
            .route(web::post().to(create_page)),
    )
    .service(
        web::resource("/wiki/{id}")
            .route(web::get().to(get_page))
            .route(web::put().to(update_page)),
    )
    .service(web::resource("/wiki/{id}/archive").route(web::post().to(archive_page)))
    .service(web::resource("/wiki/{id}/unarchive").route(web::post().to(unarchive_page)))
    .service(web::resource("/wiki/{id}/revisions").route(web::get().to(list_revisions)))
    .service(
        web::resource("/wiki/{id}/revisions/{revision_id}").route(web::get().to(get_revision)),
    )
    .service(
        web::resource("/wiki/{id}/revisions/{revision_id}/restore")
            .route(web::post().to(restore_revision)),
    );
}
