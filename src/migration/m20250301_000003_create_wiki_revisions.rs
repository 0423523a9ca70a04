//! Migration: Create wiki_revisions table.
//!
//! Revisions are append-only. The page reference is kept without a cascading
//! foreign key so history survives if a page row is ever removed by hand.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE wiki_revisions (
                    id UUID PRIMARY KEY,
                    page_id UUID NOT NULL,
                    revision_number INTEGER NOT NULL,
                    title VARCHAR(200) NOT NULL,
                    description VARCHAR(500) NOT NULL DEFAULT '',
                    content TEXT NOT NULL DEFAULT '',
                    category VARCHAR(40) NOT NULL,
                    subcategory VARCHAR(100),
                    tags JSONB NOT NULL DEFAULT '[]'::jsonb,
                    image_url VARCHAR(1000),
                    status VARCHAR(20) NOT NULL,
                    edited_by VARCHAR(128),
                    summary VARCHAR(500),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_wiki_revisions_page_created
                    ON wiki_revisions(page_id, created_at, revision_number);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS wiki_revisions CASCADE;")
            .await?;

        Ok(())
    }
}
