//! Migration: Create wiki_pages table.

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
                CREATE TABLE wiki_pages (
                    id UUID PRIMARY KEY,
                    slug VARCHAR(200) NOT NULL,
                    title VARCHAR(200) NOT NULL,
                    description VARCHAR(500) NOT NULL DEFAULT '',
                    content TEXT NOT NULL DEFAULT '',
                    category VARCHAR(40) NOT NULL,
                    subcategory VARCHAR(100),
                    tags JSONB NOT NULL DEFAULT '[]'::jsonb,
                    image_url VARCHAR(1000),
                    status VARCHAR(20) NOT NULL DEFAULT 'published'
                        CHECK (status IN ('draft', 'published', 'archived')),
                    revision INTEGER NOT NULL DEFAULT 1,
                    created_by VARCHAR(128),
                    updated_by VARCHAR(128),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE UNIQUE INDEX idx_wiki_pages_slug
                    ON wiki_pages(slug);

                -- Default listing: published pages by category, newest first
                CREATE INDEX idx_wiki_pages_status_category
                    ON wiki_pages(status, category, updated_at DESC);

                CREATE INDEX idx_wiki_pages_tags
                    ON wiki_pages USING GIN (tags);

                CREATE TRIGGER update_wiki_pages_updated_at
                    BEFORE UPDATE ON wiki_pages
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_wiki_pages_updated_at ON wiki_pages;
                DROP TABLE IF EXISTS wiki_pages CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
