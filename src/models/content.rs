//! Status lifecycle, slug generation and field validation shared by wiki and news content.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_SLUG_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LEN: usize = 50;
pub const MAX_URL_LEN: usize = 1000;

/// Publication status of a wiki page or news article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generate a URL-safe slug from a title.
///
/// Lowercases, maps everything outside `[a-z0-9]` to hyphens, collapses
/// runs of hyphens and trims them from both ends.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_hyphen = true;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    let mut slug = slug.trim_end_matches('-').to_string();
    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }
    slug
}

/// Resolve the slug for new content: validate the given one or derive it from the title.
pub fn resolve_slug(slug: Option<&str>, title: &str) -> AppResult<String> {
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => generate_slug(title),
    };
    validate_slug(&slug)?;
    Ok(slug)
}

pub fn validate_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::InvalidInput(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

/// Slugs are non-empty, lowercase alphanumeric plus single inner hyphens.
pub fn validate_slug(slug: &str) -> AppResult<()> {
    if slug.is_empty() {
        return Err(AppError::InvalidInput("Slug must not be empty".into()));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(AppError::InvalidInput(format!(
            "Slug must be at most {} characters",
            MAX_SLUG_LEN
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        || slug.starts_with('-')
        || slug.ends_with('-')
        || slug.contains("--")
    {
        return Err(AppError::InvalidInput(
            "Slug must contain only lowercase alphanumeric characters separated by single hyphens"
                .into(),
        ));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> AppResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::InvalidInput(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}

/// Only absolute http(s) URLs or site-relative paths are stored.
pub fn validate_image_url(url: &str) -> AppResult<()> {
    if url.len() > MAX_URL_LEN {
        return Err(AppError::InvalidInput(format!(
            "Image URL must be at most {} characters",
            MAX_URL_LEN
        )));
    }
    let allowed = url.starts_with("https://")
        || url.starts_with("http://")
        || (url.starts_with('/') && !url.starts_with("//"));
    if !allowed {
        return Err(AppError::InvalidInput(
            "Image URL must be an http(s) URL or a site-relative path".into(),
        ));
    }
    Ok(())
}

/// Normalize tags into a set: trimmed, lowercased, de-duplicated, order kept.
pub fn normalize_tags(tags: &[String]) -> AppResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(AppError::InvalidInput(format!(
                "Tag '{}' exceeds {} characters",
                tag, MAX_TAG_LEN
            )));
        }
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    if out.len() > MAX_TAGS {
        return Err(AppError::InvalidInput(format!(
            "A maximum of {} tags is allowed",
            MAX_TAGS
        )));
    }
    Ok(out)
}

/// Tags are stored as a JSONB array of strings.
pub fn tags_to_json(tags: &[String]) -> JsonValue {
    JsonValue::Array(tags.iter().cloned().map(JsonValue::String).collect())
}

pub fn tags_from_json(value: &JsonValue) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Turn an optional text field into a stored value: blank clears it.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
