//! Article persistence.
//!
//! The pipeline only talks to [`ArticleStore`]. The binary uses
//! [`json::JsonFileStore`], a single JSON document on disk rewritten
//! atomically after each mutation. Tests swap in the process-local
//! `memory::MemoryStore`; both keep their rows in a [`memory::ArticleTable`].
//!
//! `url` is the unique key. [`ArticleStore::save_article`] checks and inserts
//! under one lock, so two overlapping writers can never store the same URL twice.

pub mod json;
pub mod memory;

use crate::error::StoreError;
use crate::models::{Article, ArticleId, ArticlePage, ArticleUpdate, NewArticle};

pub use json::JsonFileStore;
#[cfg(test)]
pub use memory::MemoryStore;

/// Persistence for scraped articles, keyed by source URL.
///
/// Implementors must make [`save_article`](ArticleStore::save_article) check
/// and insert atomically; the pipeline relies on it when two runs overlap.
pub trait ArticleStore {
    /// Whether an article with this exact source URL is stored, in any state.
    async fn article_exists(&self, url: &str) -> Result<bool, StoreError>;

    /// Insert a new article in the pending state.
    ///
    /// # Arguments
    ///
    /// * `article` - Source URL, original title, sanitized content and source label
    ///
    /// # Returns
    ///
    /// The id assigned to the article, or [`StoreError::Duplicate`] if the
    /// URL is already stored.
    async fn save_article(&self, article: NewArticle) -> Result<ArticleId, StoreError>;

    /// Attach rewrite results (and optionally a post reference).
    ///
    /// # Returns
    ///
    /// The article after the update. Fails with [`StoreError::NotFound`] for an
    /// unknown id and [`StoreError::InvalidTransition`] when the update would
    /// move the article backwards (for example unpublish it).
    async fn update_article(
        &self,
        id: ArticleId,
        update: ArticleUpdate,
    ) -> Result<Article, StoreError>;

    /// The article with this id, if any.
    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>, StoreError>;

    /// One page of articles, newest first. Pages start at 1.
    async fn list_articles(&self, page: usize, per_page: usize)
    -> Result<ArticlePage, StoreError>;

    /// Pending articles, oldest first.
    async fn pending_articles(&self, limit: usize) -> Result<Vec<Article>, StoreError>;
}
