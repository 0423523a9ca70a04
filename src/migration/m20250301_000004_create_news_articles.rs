//! Migration: Create news_articles table.

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
                CREATE TABLE news_articles (
                    id UUID PRIMARY KEY,
                    slug VARCHAR(200) NOT NULL,
                    title VARCHAR(200) NOT NULL,
                    category VARCHAR(40) NOT NULL,
                    excerpt VARCHAR(500) NOT NULL DEFAULT '',
                    content TEXT NOT NULL DEFAULT '',
                    author VARCHAR(255) NOT NULL,
                    image_url VARCHAR(1000),
                    status VARCHAR(20) NOT NULL DEFAULT 'draft'
                        CHECK (status IN ('draft', 'published', 'archived')),
                    published_at TIMESTAMPTZ,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE UNIQUE INDEX idx_news_articles_slug
                    ON news_articles(slug);

                CREATE INDEX idx_news_articles_status_published
                    ON news_articles(status, published_at DESC);

                CREATE TRIGGER update_news_articles_updated_at
                    BEFORE UPDATE ON news_articles
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
                DROP TRIGGER IF EXISTS update_news_articles_updated_at ON news_articles;
                DROP TABLE IF EXISTS news_articles CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
