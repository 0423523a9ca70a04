//! SeaORM entity definitions for PostgreSQL database.

pub mod news_article;
pub mod user;
pub mod wiki_page;
pub mod wiki_revision;
