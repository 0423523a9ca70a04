//! Database operations for wiki revisions.
//!
//! Revisions are append-only: there is no update or delete here.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::wiki_page;
use crate::entity::wiki_revision::{self as revision, ActiveModel, Entity as Revision};
use crate::error::AppResult;

/// Store a snapshot of `page` as it was before an edit.
///
/// `edited_by` and `summary` describe the edit that superseded this state.
/// Takes any connection so it can run inside the edit's transaction.
pub async fn insert_snapshot<C: ConnectionTrait>(
    conn: &C,
    page: &wiki_page::Model,
    edited_by: Option<&str>,
    summary: Option<&str>,
) -> AppResult<revision::Model> {
    let model = ActiveModel {
        id: Set(Uuid::now_v7()),
        page_id: Set(page.id),
        revision_number: Set(page.revision),
        title: Set(page.title.clone()),
        description: Set(page.description.clone()),
        content: Set(page.content.clone()),
        category: Set(page.category.clone()),
        subcategory: Set(page.subcategory.clone()),
        tags: Set(page.tags.clone()),
        image_url: Set(page.image_url.clone()),
        status: Set(page.status.clone()),
        edited_by: Set(edited_by.map(str::to_string)),
        summary: Set(summary.map(str::to_string)),
        created_at: Set(Utc::now()),
    };

    Ok(model.insert(conn).await?)
}

/// All revisions of a page, oldest first.
pub async fn list_for_page(
    db: &DatabaseConnection,
    page_id: Uuid,
) -> AppResult<Vec<revision::Model>> {
    let result = Revision::find()
        .filter(revision::Column::PageId.eq(page_id))
        .order_by_asc(revision::Column::CreatedAt)
        .order_by_asc(revision::Column::RevisionNumber)
        .all(db)
        .await?;

    Ok(result)
}

/// Get one revision, scoped to its page.
pub async fn get(
    db: &DatabaseConnection,
    page_id: Uuid,
    revision_id: Uuid,
) -> AppResult<Option<revision::Model>> {
    let result = Revision::find_by_id(revision_id)
        .filter(revision::Column::PageId.eq(page_id))
        .one(db)
        .await?;

    Ok(result)
}
