//! Wiki page and revision DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::Pagination;
use super::content::{ContentStatus, tags_from_json};
use crate::entity::{wiki_page, wiki_revision};

/// Top-level wiki sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WikiCategory {
    Characters,
    Items,
    Locations,
    Quests,
    Mechanics,
    Lore,
    Guides,
}

impl WikiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Characters => "characters",
            Self::Items => "items",
            Self::Locations => "locations",
            Self::Quests => "quests",
            Self::Mechanics => "mechanics",
            Self::Lore => "lore",
            Self::Guides => "guides",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "characters" => Some(Self::Characters),
            "items" => Some(Self::Items),
            "locations" => Some(Self::Locations),
            "quests" => Some(Self::Quests),
            "mechanics" => Some(Self::Mechanics),
            "lore" => Some(Self::Lore),
            "guides" => Some(Self::Guides),
            _ => None,
        }
    }
}

impl std::fmt::Display for WikiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wiki page as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WikiPage {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub status: String,
    pub revision: i32,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<wiki_page::Model> for WikiPage {
    fn from(m: wiki_page::Model) -> Self {
        Self {
            id: m.id,
            tags: tags_from_json(&m.tags),
            slug: m.slug,
            title: m.title,
            description: m.description,
            content: m.content,
            category: m.category,
            subcategory: m.subcategory,
            image_url: m.image_url,
            status: m.status,
            revision: m.revision,
            created_by: m.created_by,
            updated_by: m.updated_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Snapshot of a page before one of its edits.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WikiRevision {
    pub id: Uuid,
    pub page_id: Uuid,
    pub revision_number: i32,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub status: String,
    pub edited_by: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<wiki_revision::Model> for WikiRevision {
    fn from(m: wiki_revision::Model) -> Self {
        Self {
            id: m.id,
            tags: tags_from_json(&m.tags),
            page_id: m.page_id,
            revision_number: m.revision_number,
            title: m.title,
            description: m.description,
            content: m.content,
            category: m.category,
            subcategory: m.subcategory,
            image_url: m.image_url,
            status: m.status,
            edited_by: m.edited_by,
            summary: m.summary,
            created_at: m.created_at,
        }
    }
}

/// Request to create a wiki page.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWikiPageRequest {
    pub title: String,
    /// Derived from the title when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    pub category: WikiCategory,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Defaults to `published`.
    #[serde(default)]
    pub status: Option<ContentStatus>,
}

/// Partial update of a wiki page. Omitted fields are left unchanged;
/// an empty `subcategory` or `imageUrl` clears the field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWikiPageRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub category: Option<WikiCategory>,
    pub subcategory: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub status: Option<ContentStatus>,
    /// Edit summary stored on the revision.
    pub summary: Option<String>,
}

/// Filters for wiki listings.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListWikiQuery {
    pub category: Option<WikiCategory>,
    pub subcategory: Option<String>,
    pub tag: Option<String>,
    /// Explicit status filter (admin listing only).
    pub status: Option<ContentStatus>,
    /// Include archived pages (admin listing only).
    #[serde(default)]
    pub include_archived: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Paginated wiki listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct WikiPageListResponse {
    pub pages: Vec<WikiPage>,
    pub pagination: Pagination,
}
