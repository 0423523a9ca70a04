//! News article DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::Pagination;
use super::content::ContentStatus;
use crate::entity::news_article;

pub const MAX_EXCERPT_LEN: usize = 500;
pub const MAX_AUTHOR_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NewsCategory {
    Announcements,
    Updates,
    Events,
    Community,
    PatchNotes,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Announcements => "announcements",
            Self::Updates => "updates",
            Self::Events => "events",
            Self::Community => "community",
            Self::PatchNotes => "patch-notes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "announcements" => Some(Self::Announcements),
            "updates" => Some(Self::Updates),
            "events" => Some(Self::Events),
            "community" => Some(Self::Community),
            "patch-notes" => Some(Self::PatchNotes),
            _ => None,
        }
    }
}

impl std::fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// News article as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub category: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub image_url: Option<String>,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<news_article::Model> for NewsArticle {
    fn from(m: news_article::Model) -> Self {
        Self {
            id: m.id,
            slug: m.slug,
            title: m.title,
            category: m.category,
            excerpt: m.excerpt,
            content: m.content,
            author: m.author,
            image_url: m.image_url,
            status: m.status,
            published_at: m.published_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Request to create a news article.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNewsArticleRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub category: NewsCategory,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    /// Defaults to the signed-in admin's display name.
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Defaults to `draft`.
    #[serde(default)]
    pub status: Option<ContentStatus>,
}

/// Partial update of a news article.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNewsArticleRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub category: Option<NewsCategory>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListNewsQuery {
    pub category: Option<NewsCategory>,
    /// Explicit status filter (admin listing only).
    pub status: Option<ContentStatus>,
    /// Include drafts and archived articles (admin listing only).
    #[serde(default)]
    pub include_all: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Paginated news listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct NewsArticleListResponse {
    pub articles: Vec<NewsArticle>,
    pub pagination: Pagination,
}

pub fn validate_excerpt(excerpt: &str) -> crate::error::AppResult<()> {
    if excerpt.chars().count() > MAX_EXCERPT_LEN {
        return Err(crate::error::AppError::InvalidInput(format!(
            "Excerpt must be at most {} characters",
            MAX_EXCERPT_LEN
        )));
    }
    Ok(())
}

pub fn validate_author(author: &str) -> crate::error::AppResult<()> {
    if author.trim().is_empty() {
        return Err(crate::error::AppError::InvalidInput(
            "Author must not be empty".into(),
        ));
    }
    if author.chars().count() > MAX_AUTHOR_LEN {
        return Err(crate::error::AppError::InvalidInput(format!(
            "Author must be at most {} characters",
            MAX_AUTHOR_LEN
        )));
    }
    Ok(())
}
