//! Database operations for news articles.

use chrono::Utc;
use sea_orm::sea_query::NullOrdering;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use tracing::info;
use uuid::Uuid;

use super::wiki_pages::slug_conflict;
use crate::entity::news_article::{self as article, ActiveModel, Entity as NewsArticle};
use crate::error::{AppError, AppResult};
use crate::models::PaginationParams;
use crate::models::content::{
    ContentStatus, non_blank, resolve_slug, validate_image_url, validate_slug, validate_title,
};
use crate::models::news::{
    CreateNewsArticleRequest, ListNewsQuery, UpdateNewsArticleRequest, validate_author,
    validate_excerpt,
};

pub async fn get(db: &DatabaseConnection, id: Uuid) -> AppResult<Option<article::Model>> {
    Ok(NewsArticle::find_by_id(id).one(db).await?)
}

pub async fn get_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> AppResult<Option<article::Model>> {
    let result = NewsArticle::find()
        .filter(article::Column::Slug.eq(slug))
        .one(db)
        .await?;
    Ok(result)
}

async fn slug_taken(db: &DatabaseConnection, slug: &str) -> AppResult<bool> {
    let count = NewsArticle::find()
        .filter(article::Column::Slug.eq(slug))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Public listings only see published articles; admin listings see drafts
/// too, and archived ones with `include_all`.
pub(crate) fn listing_query(query: &ListNewsQuery, public: bool) -> Select<NewsArticle> {
    let mut select = NewsArticle::find();

    if public {
        select = select.filter(article::Column::Status.eq(ContentStatus::Published.as_str()));
    } else if let Some(status) = query.status {
        select = select.filter(article::Column::Status.eq(status.as_str()));
    } else if !query.include_all {
        select = select.filter(article::Column::Status.ne(ContentStatus::Archived.as_str()));
    }

    if let Some(category) = query.category {
        select = select.filter(article::Column::Category.eq(category.as_str()));
    }

    select
}

/// List articles, newest publication first; unpublished ones by creation time.
pub async fn list(
    db: &DatabaseConnection,
    query: &ListNewsQuery,
    public: bool,
) -> AppResult<(Vec<article::Model>, u64)> {
    let params = PaginationParams::new(query.page, query.limit);
    let select = listing_query(query, public);

    let total = select.clone().count(db).await?;
    let articles = select
        .order_by_with_nulls(article::Column::PublishedAt, Order::Desc, NullOrdering::Last)
        .order_by_desc(article::Column::CreatedAt)
        .offset(params.offset())
        .limit(params.clamped_limit() as u64)
        .all(db)
        .await?;

    Ok((articles, total))
}

/// Create an article. Drafts by default; created-as-published articles get
/// their publication time stamped immediately.
pub async fn create(
    db: &DatabaseConnection,
    req: &CreateNewsArticleRequest,
    default_author: &str,
) -> AppResult<article::Model> {
    validate_title(&req.title)?;
    validate_excerpt(&req.excerpt)?;
    let slug = resolve_slug(req.slug.as_deref(), &req.title)?;
    let author = non_blank(req.author.as_deref()).unwrap_or_else(|| default_author.to_string());
    validate_author(&author)?;
    let image_url = non_blank(req.image_url.as_deref());
    if let Some(ref url) = image_url {
        validate_image_url(url)?;
    }

    if slug_taken(db, &slug).await? {
        return Err(AppError::Conflict(format!(
            "Slug '{}' is already in use",
            slug
        )));
    }

    let now = Utc::now();
    let status = req.status.unwrap_or(ContentStatus::Draft);
    let model = ActiveModel {
        id: Set(Uuid::now_v7()),
        slug: Set(slug.clone()),
        title: Set(req.title.trim().to_string()),
        category: Set(req.category.as_str().to_string()),
        excerpt: Set(req.excerpt.trim().to_string()),
        content: Set(req.content.clone()),
        author: Set(author),
        image_url: Set(image_url),
        status: Set(status.as_str().to_string()),
        published_at: Set((status == ContentStatus::Published).then_some(now)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = model
        .insert(db)
        .await
        .map_err(|e| slug_conflict(e, &slug))?;

    info!("Created news article '{}' ({})", created.slug, created.id);
    Ok(created)
}

/// Apply a partial update. Last write wins.
pub async fn update(
    db: &DatabaseConnection,
    id: Uuid,
    changes: &UpdateNewsArticleRequest,
) -> AppResult<article::Model> {
    if let Some(ref title) = changes.title {
        validate_title(title)?;
    }
    if let Some(ref slug) = changes.slug {
        validate_slug(slug.trim())?;
    }
    if let Some(ref excerpt) = changes.excerpt {
        validate_excerpt(excerpt)?;
    }
    if let Some(ref author) = changes.author {
        validate_author(author)?;
    }
    if let Some(url) = non_blank(changes.image_url.as_deref()) {
        validate_image_url(&url)?;
    }

    let current = get(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("News article".to_string()))?;

    let new_slug = changes
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|s| *s != current.slug)
        .map(str::to_string);
    if let Some(ref slug) = new_slug
        && slug_taken(db, slug).await?
    {
        return Err(AppError::Conflict(format!(
            "Slug '{}' is already in use",
            slug
        )));
    }

    let now = Utc::now();
    let first_publish = current.published_at.is_none();
    let mut active: ActiveModel = current.into();
    if let Some(ref slug) = new_slug {
        active.slug = Set(slug.clone());
    }
    if let Some(ref title) = changes.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(category) = changes.category {
        active.category = Set(category.as_str().to_string());
    }
    if let Some(ref excerpt) = changes.excerpt {
        active.excerpt = Set(excerpt.trim().to_string());
    }
    if let Some(ref content) = changes.content {
        active.content = Set(content.clone());
    }
    if let Some(ref author) = changes.author {
        active.author = Set(author.trim().to_string());
    }
    if changes.image_url.is_some() {
        active.image_url = Set(non_blank(changes.image_url.as_deref()));
    }
    if let Some(status) = changes.status {
        active.status = Set(status.as_str().to_string());
        if status == ContentStatus::Published && first_publish {
            active.published_at = Set(Some(now));
        }
    }
    active.updated_at = Set(now);

    let updated = active
        .update(db)
        .await
        .map_err(|e| slug_conflict(e, new_slug.as_deref().unwrap_or_default()))?;
    Ok(updated)
}

/// Publish an article, stamping `published_at` on first publication.
pub async fn publish(db: &DatabaseConnection, id: Uuid) -> AppResult<article::Model> {
    let current = get(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("News article".to_string()))?;

    let now = Utc::now();
    let first_publish = current.published_at.is_none();
    let mut active: ActiveModel = current.into();
    active.status = Set(ContentStatus::Published.as_str().to_string());
    if first_publish {
        active.published_at = Set(Some(now));
    }
    active.updated_at = Set(now);

    let updated = active.update(db).await?;
    info!("Published news article '{}'", updated.slug);
    Ok(updated)
}

pub async fn archive(db: &DatabaseConnection, id: Uuid) -> AppResult<article::Model> {
    let current = get(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("News article".to_string()))?;

    let mut active: ActiveModel = current.into();
    active.status = Set(ContentStatus::Archived.as_str().to_string());
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    info!("Archived news article '{}'", updated.slug);
    Ok(updated)
}
