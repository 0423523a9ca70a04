//! Immutable snapshot of a wiki page taken before an edit.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wiki_revisions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub page_id: Uuid,
    pub revision_number: i32,
    pub title: String,
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub category: String,
    pub subcategory: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: JsonValue,
    pub image_url: Option<String>,
    pub status: String,
    pub edited_by: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wiki_page::Entity",
        from = "Column::PageId",
        to = "super::wiki_page::Column::Id"
    )]
    Page,
}

impl Related<super::wiki_page::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Page.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
