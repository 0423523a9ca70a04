//! Database operations for wiki pages.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use super::wiki_revisions;
use crate::entity::wiki_page::{self as page, ActiveModel, Entity as WikiPage};
use crate::error::{AppError, AppResult};
use crate::models::content::{
    ContentStatus, non_blank, normalize_tags, resolve_slug, tags_from_json, tags_to_json,
    validate_description, validate_image_url, validate_slug, validate_title,
};
use crate::models::wiki::{CreateWikiPageRequest, ListWikiQuery, UpdateWikiPageRequest};
use crate::models::{PaginationParams, WikiCategory};

/// Map a unique-index violation on `slug` to 409.
pub(crate) fn slug_conflict(err: DbErr, slug: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(format!("Slug '{}' is already in use", slug))
        }
        _ => err.into(),
    }
}

pub async fn get_page(db: &DatabaseConnection, id: Uuid) -> AppResult<Option<page::Model>> {
    Ok(WikiPage::find_by_id(id).one(db).await?)
}

pub async fn get_page_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> AppResult<Option<page::Model>> {
    let result = WikiPage::find()
        .filter(page::Column::Slug.eq(slug))
        .one(db)
        .await?;
    Ok(result)
}

async fn slug_taken(db: &impl sea_orm::ConnectionTrait, slug: &str) -> AppResult<bool> {
    let count = WikiPage::find()
        .filter(page::Column::Slug.eq(slug))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Build the filtered listing query.
///
/// Public listings only ever see published pages. Admin listings see
/// everything except archived pages unless asked for them or for an
/// explicit status.
pub(crate) fn listing_query(query: &ListWikiQuery, public: bool) -> Select<WikiPage> {
    let mut select = WikiPage::find();

    if public {
        select = select.filter(page::Column::Status.eq(ContentStatus::Published.as_str()));
    } else if let Some(status) = query.status {
        select = select.filter(page::Column::Status.eq(status.as_str()));
    } else if !query.include_archived {
        select = select.filter(page::Column::Status.ne(ContentStatus::Archived.as_str()));
    }

    if let Some(category) = query.category {
        select = select.filter(page::Column::Category.eq(category.as_str()));
    }

    if let Some(subcategory) = non_blank(query.subcategory.as_deref()) {
        select = select.filter(page::Column::Subcategory.eq(subcategory));
    }

    if let Some(tag) = non_blank(query.tag.as_deref()) {
        let needle = serde_json::json!([tag.to_lowercase()]).to_string();
        select = select.filter(Expr::cust_with_values("tags @> $1::jsonb", [needle]));
    }

    select
}

/// List pages, most recently updated first.
pub async fn list_pages(
    db: &DatabaseConnection,
    query: &ListWikiQuery,
    public: bool,
) -> AppResult<(Vec<page::Model>, u64)> {
    let params = PaginationParams::new(query.page, query.limit);
    let select = listing_query(query, public);

    let total = select.clone().count(db).await?;
    let pages = select
        .order_by_desc(page::Column::UpdatedAt)
        .order_by_asc(page::Column::Id)
        .offset(params.offset())
        .limit(params.clamped_limit() as u64)
        .all(db)
        .await?;

    Ok((pages, total))
}

/// Create a page at revision 1.
pub async fn create_page(
    db: &DatabaseConnection,
    req: &CreateWikiPageRequest,
    author: Option<&str>,
) -> AppResult<page::Model> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;
    let slug = resolve_slug(req.slug.as_deref(), &req.title)?;
    let tags = normalize_tags(&req.tags)?;
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
    let model = ActiveModel {
        id: Set(Uuid::now_v7()),
        slug: Set(slug.clone()),
        title: Set(req.title.trim().to_string()),
        description: Set(req.description.trim().to_string()),
        content: Set(req.content.clone()),
        category: Set(req.category.as_str().to_string()),
        subcategory: Set(non_blank(req.subcategory.as_deref())),
        tags: Set(tags_to_json(&tags)),
        image_url: Set(image_url),
        status: Set(req
            .status
            .unwrap_or(ContentStatus::Published)
            .as_str()
            .to_string()),
        revision: Set(1),
        created_by: Set(author.map(str::to_string)),
        updated_by: Set(author.map(str::to_string)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = model
        .insert(db)
        .await
        .map_err(|e| slug_conflict(e, &slug))?;

    info!("Created wiki page '{}' ({})", created.slug, created.id);
    Ok(created)
}

/// Validate field-level constraints of an edit before touching the database.
fn validate_update(changes: &UpdateWikiPageRequest) -> AppResult<Option<Vec<String>>> {
    if let Some(ref title) = changes.title {
        validate_title(title)?;
    }
    if let Some(ref slug) = changes.slug {
        validate_slug(slug.trim())?;
    }
    if let Some(ref description) = changes.description {
        validate_description(description)?;
    }
    if let Some(url) = non_blank(changes.image_url.as_deref()) {
        validate_image_url(&url)?;
    }
    changes.tags.as_deref().map(normalize_tags).transpose()
}

/// Edit a page.
///
/// Runs in one transaction: snapshots the current state as exactly one
/// revision, applies the changes and bumps the revision counter. Concurrent
/// edits are last-write-wins.
pub async fn update_page(
    db: &DatabaseConnection,
    id: Uuid,
    changes: &UpdateWikiPageRequest,
    editor: Option<&str>,
) -> AppResult<page::Model> {
    let tags = validate_update(changes)?;

    let txn = db.begin().await?;

    let current = WikiPage::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Wiki page".to_string()))?;

    let new_slug = changes
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|s| *s != current.slug);
    if let Some(slug) = new_slug
        && slug_taken(&txn, slug).await?
    {
        return Err(AppError::Conflict(format!(
            "Slug '{}' is already in use",
            slug
        )));
    }

    wiki_revisions::insert_snapshot(&txn, &current, editor, changes.summary.as_deref()).await?;

    let next_revision = current.revision + 1;
    let mut active: ActiveModel = current.into();
    if let Some(slug) = new_slug {
        active.slug = Set(slug.to_string());
    }
    if let Some(ref title) = changes.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(ref description) = changes.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(ref content) = changes.content {
        active.content = Set(content.clone());
    }
    if let Some(category) = changes.category {
        active.category = Set(category.as_str().to_string());
    }
    if changes.subcategory.is_some() {
        active.subcategory = Set(non_blank(changes.subcategory.as_deref()));
    }
    if let Some(tags) = tags {
        active.tags = Set(tags_to_json(&tags));
    }
    if changes.image_url.is_some() {
        active.image_url = Set(non_blank(changes.image_url.as_deref()));
    }
    if let Some(status) = changes.status {
        active.status = Set(status.as_str().to_string());
    }
    active.revision = Set(next_revision);
    active.updated_by = Set(editor.map(str::to_string));
    active.updated_at = Set(Utc::now());

    let slug_for_error = new_slug.unwrap_or_default().to_string();
    let updated = active
        .update(&txn)
        .await
        .map_err(|e| slug_conflict(e, &slug_for_error))?;

    txn.commit().await?;

    info!(
        "Updated wiki page '{}' to revision {}",
        updated.slug, updated.revision
    );
    Ok(updated)
}

/// Set a page's status without recording a revision.
async fn set_status(
    db: &DatabaseConnection,
    id: Uuid,
    status: ContentStatus,
) -> AppResult<page::Model> {
    let current = get_page(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Wiki page".to_string()))?;

    let mut active: ActiveModel = current.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    info!("Wiki page '{}' is now {}", updated.slug, status);
    Ok(updated)
}

pub async fn archive_page(db: &DatabaseConnection, id: Uuid) -> AppResult<page::Model> {
    set_status(db, id, ContentStatus::Archived).await
}

pub async fn unarchive_page(db: &DatabaseConnection, id: Uuid) -> AppResult<page::Model> {
    set_status(db, id, ContentStatus::Published).await
}

/// Bring a page's content back to a stored revision. Applied as a normal
/// edit, so the state being replaced is itself kept as a revision.
pub async fn restore_revision(
    db: &DatabaseConnection,
    page_id: Uuid,
    revision_id: Uuid,
    editor: Option<&str>,
) -> AppResult<page::Model> {
    let rev = wiki_revisions::get(db, page_id, revision_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Revision".to_string()))?;

    let category = WikiCategory::parse(&rev.category).ok_or_else(|| {
        AppError::Internal(format!(
            "Revision {} has unknown category '{}'",
            rev.id, rev.category
        ))
    })?;

    let changes = UpdateWikiPageRequest {
        title: Some(rev.title),
        slug: None,
        description: Some(rev.description),
        content: Some(rev.content),
        category: Some(category),
        subcategory: Some(rev.subcategory.unwrap_or_default()),
        tags: Some(tags_from_json(&rev.tags)),
        image_url: Some(rev.image_url.unwrap_or_default()),
        status: None,
        summary: Some(format!("Restored revision {}", rev.revision_number)),
    };

    update_page(db, page_id, &changes, editor).await
}
