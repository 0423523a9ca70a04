//! Request and response models for the fan wiki API.

use utoipa::{IntoParams, ToSchema};

pub mod content;
pub mod news;
pub mod session;
pub mod user;
pub mod wiki;

// Re-export commonly used types
pub use content::ContentStatus;
pub use news::{
    CreateNewsArticleRequest, ListNewsQuery, NewsArticle, NewsArticleListResponse, NewsCategory,
    UpdateNewsArticleRequest,
};
pub use session::{CsrfTokenResponse, IdentityClaims, LoginRequest};
pub use user::{
    AdminCheckResponse, CurrentUserResponse, SetAdminRequest, UpdateProfileRequest, UserListResponse,
    UserResponse,
};
pub use wiki::{
    CreateWikiPageRequest, ListWikiQuery, UpdateWikiPageRequest, WikiCategory, WikiPage,
    WikiPageListResponse, WikiRevision,
};

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// Maximum page size for listings.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters.
#[derive(Debug, Clone, Copy, serde::Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PaginationParams {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self { page, limit }
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(default_page()).max(1)
    }

    /// Calculate the offset for database queries.
    pub fn offset(&self) -> u64 {
        (self.page() as u64 - 1) * self.clamped_limit() as u64
    }

    /// Clamp limit to maximum allowed value.
    pub fn clamped_limit(&self) -> u32 {
        self.limit.unwrap_or(default_limit()).clamp(1, MAX_PAGE_SIZE)
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Clone, serde::Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    /// Create pagination metadata.
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if total == 0 || limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64) as u32
        };

        Pagination {
            page,
            limit,
            total,
            total_pages,
        }
    }
}
