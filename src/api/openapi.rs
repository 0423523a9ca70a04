//! OpenAPI documentation configuration.

use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use crate::config::{ADMIN_KEY_HEADER, SESSION_COOKIE};
use crate::{api, error, models, services};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fan Wiki Server",
        version = "0.3.0",
        description = "Sessions, admin tooling, wiki pages with revision history, and news"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Session endpoints
        services::auth_session::csrf_token,
        services::auth_session::create_session,
        services::auth_session::logout,
        services::auth_session::get_current_user,
        services::auth_session::update_profile,
        services::auth_session::check_admin,
        // Wiki endpoints
        api::wiki::list_public_pages,
        api::wiki::get_public_page,
        api::wiki::list_pages,
        api::wiki::create_page,
        api::wiki::get_page,
        api::wiki::update_page,
        api::wiki::archive_page,
        api::wiki::unarchive_page,
        api::wiki::list_revisions,
        api::wiki::get_revision,
        api::wiki::restore_revision,
        // News endpoints
        api::news::list_public_articles,
        api::news::get_public_article,
        api::news::list_articles,
        api::news::create_article,
        api::news::get_article,
        api::news::update_article,
        api::news::publish_article,
        api::news::archive_article,
        // User management
        api::admin::list_users,
        api::admin::set_admin,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            models::Pagination,
            models::ContentStatus,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Sessions and users
            models::LoginRequest,
            models::CsrfTokenResponse,
            models::CurrentUserResponse,
            models::UpdateProfileRequest,
            models::AdminCheckResponse,
            models::UserResponse,
            models::UserListResponse,
            models::SetAdminRequest,
            // Wiki
            models::WikiCategory,
            models::WikiPage,
            models::WikiRevision,
            models::CreateWikiPageRequest,
            models::UpdateWikiPageRequest,
            models::WikiPageListResponse,
            // News
            models::NewsCategory,
            models::NewsArticle,
            models::CreateNewsArticleRequest,
            models::UpdateNewsArticleRequest,
            models::NewsArticleListResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Sessions, profile and admin check"),
        (name = "Wiki", description = "Published wiki pages"),
        (name = "News", description = "Published news articles"),
        (name = "Admin", description = "Content editing and user management")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Session cookie and bootstrap admin key security schemes.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_KEY_HEADER))),
            );
        }
    }
}
