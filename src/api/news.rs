//! News endpoints: public reads and admin publishing.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::db::{DbPool, news_articles, users};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::content::ContentStatus;
use crate::models::{
    CreateNewsArticleRequest, ListNewsQuery, NewsArticle, NewsArticleListResponse, Pagination,
    PaginationParams, UpdateNewsArticleRequest,
};

/// Byline used when the author has no display name or the bootstrap key is used.
const FALLBACK_AUTHOR: &str = "Admin";

fn article_not_found() -> AppError {
    AppError::NotFound("News article".to_string())
}

async fn list_response(
    pool: &DbPool,
    query: &ListNewsQuery,
    public: bool,
) -> AppResult<NewsArticleListResponse> {
    let params = PaginationParams::new(query.page, query.limit);
    let (articles, total) = news_articles::list(pool.connection(), query, public).await?;
    Ok(NewsArticleListResponse {
        articles: articles.into_iter().map(NewsArticle::from).collect(),
        pagination: Pagination::new(params.page(), params.clamped_limit(), total),
    })
}

/// Byline for a new article when the request names none.
async fn default_author(pool: &DbPool, admin: &AdminUser) -> AppResult<String> {
    let Some(uid) = admin.actor() else {
        return Ok(FALLBACK_AUTHOR.to_string());
    };
    let name = users::find_by_uid(pool.connection(), uid)
        .await?
        .and_then(|u| u.display_name)
        .filter(|n| !n.trim().is_empty());
    Ok(name.unwrap_or_else(|| FALLBACK_AUTHOR.to_string()))
}

/// List published news, newest first.
#[utoipa::path(
    get,
    path = "/api/news",
    tag = "News",
    params(ListNewsQuery),
    responses(
        (status = 200, description = "Published articles", body = NewsArticleListResponse)
    )
)]
pub async fn list_public_articles(
    pool: web::Data<DbPool>,
    query: web::Query<ListNewsQuery>,
) -> AppResult<HttpResponse> {
    let response = list_response(&pool, &query, true).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Get a published article by slug.
#[utoipa::path(
    get,
    path = "/api/news/{slug}",
    tag = "News",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "News article", body = NewsArticle),
        (status = 404, description = "Not found or not published", body = ErrorResponse)
    )
)]
pub async fn get_public_article(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let article = news_articles::get_by_slug(pool.connection(), &path)
        .await?
        .filter(|a| a.status == ContentStatus::Published.as_str())
        .ok_or_else(article_not_found)?;
    Ok(HttpResponse::Ok().json(NewsArticle::from(article)))
}

/// List articles of any status (admin).
#[utoipa::path(
    get,
    path = "/api/admin/news",
    tag = "Admin",
    params(ListNewsQuery),
    responses(
        (status = 200, description = "Articles", body = NewsArticleListResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn list_articles(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    query: web::Query<ListNewsQuery>,
) -> AppResult<HttpResponse> {
    let response = list_response(&pool, &query, false).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Create an article (admin). Drafts unless a status is given.
#[utoipa::path(
    post,
    path = "/api/admin/news",
    tag = "Admin",
    request_body = CreateNewsArticleRequest,
    responses(
        (status = 201, description = "Article created", body = NewsArticle),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn create_article(
    admin: AdminUser,
    pool: web::Data<DbPool>,
    body: web::Json<CreateNewsArticleRequest>,
) -> AppResult<HttpResponse> {
    let author = match body.author.as_deref().map(str::trim) {
        Some(a) if !a.is_empty() => a.to_string(),
        _ => default_author(&pool, &admin).await?,
    };
    let article = news_articles::create(pool.connection(), &body, &author).await?;
    Ok(HttpResponse::Created().json(NewsArticle::from(article)))
}

/// Get an article by id, any status (admin).
#[utoipa::path(
    get,
    path = "/api/admin/news/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "News article", body = NewsArticle),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn get_article(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let article = news_articles::get(pool.connection(), *path)
        .await?
        .ok_or_else(article_not_found)?;
    Ok(HttpResponse::Ok().json(NewsArticle::from(article)))
}

/// Edit an article (admin).
#[utoipa::path(
    put,
    path = "/api/admin/news/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Article id")),
    request_body = UpdateNewsArticleRequest,
    responses(
        (status = 200, description = "Updated article", body = NewsArticle),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn update_article(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateNewsArticleRequest>,
) -> AppResult<HttpResponse> {
    let article = news_articles::update(pool.connection(), *path, &body).await?;
    Ok(HttpResponse::Ok().json(NewsArticle::from(article)))
}

/// Publish an article (admin). The first publish stamps `publishedAt`.
#[utoipa::path(
    post,
    path = "/api/admin/news/{id}/publish",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "Published article", body = NewsArticle),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn publish_article(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let article = news_articles::publish(pool.connection(), *path).await?;
    Ok(HttpResponse::Ok().json(NewsArticle::from(article)))
}

/// Archive an article (admin).
#[utoipa::path(
    post,
    path = "/api/admin/news/{id}/archive",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "Archived article", body = NewsArticle),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("session" = []), ("admin_key" = []))
)]
pub async fn archive_article(
    _admin: AdminUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let article = news_articles::archive(pool.connection(), *path).await?;
    Ok(HttpResponse::Ok().json(NewsArticle::from(article)))
}

pub fn configure_public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/news").route(web::get().to(list_public_articles)))
        .service(web::resource("/news/{slug}").route(web::get().to(get_public_article)));
}

/// Admin news routes (mounted under `/admin`).
pub fn configure_admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/news")
            .route(web::get().to(list_articles))
            .route(web::post().to(create_article)),
    )
    .service(
        web::resource("/news/{id}")
            .route(web::get().to(get_article))
            .route(web::put().to(update_article)),
    )
    .service(web::resource("/news/{id}/publish").route(web::post().to(publish_article)))
    .service(web::resource("/news/{id}/archive").route(web::post().to(archive_article)));
}
