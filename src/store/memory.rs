//! In-memory article table shared by the store backends.
//!
//! [`JsonFileStore`](super::JsonFileStore) persists an [`ArticleTable`];
//! tests run the pipeline against `MemoryStore`, which keeps one in a mutex.

#[cfg(test)]
use super::ArticleStore;
use crate::error::StoreError;
use crate::models::{Article, ArticleId, ArticlePage, ArticleStatus, ArticleUpdate, NewArticle};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
#[cfg(test)]
use tokio::sync::Mutex;
#[cfg(test)]
use tracing::{debug, info};

/// The rows of an article store plus its id counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleTable {
    next_id: ArticleId,
    articles: Vec<Article>,
}

impl ArticleTable {
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.articles.iter().any(|a| a.url == url)
    }

    pub fn insert(&mut self, new: NewArticle) -> Result<ArticleId, StoreError> {
        if self.contains_url(&new.url) {
            return Err(StoreError::Duplicate(new.url));
        }
        self.next_id = self.next_id.max(self.max_id()) + 1;
        let id = self.next_id;
        self.articles.push(Article {
            id,
            url: new.url,
            title: new.title,
            raw_content: new.content,
            source: new.source,
            created_at: Utc::now(),
            status: ArticleStatus::Pending,
        });
        Ok(id)
    }

    pub fn update(&mut self, id: ArticleId, update: ArticleUpdate) -> Result<Article, StoreError> {
        let article = self
            .articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound(id))?;
        article
            .apply(update)
            .map_err(|reason| StoreError::InvalidTransition { id, reason })?;
        Ok(article.clone())
    }

    pub fn get(&self, id: ArticleId) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    pub fn page(&self, page: usize, per_page: usize) -> ArticlePage {
        let mut items: Vec<&Article> = self.articles.iter().collect();
        items.sort_by_key(|a| Reverse((a.created_at, a.id)));
        let per_page = per_page.max(1);
        let skip = page.saturating_sub(1).saturating_mul(per_page);
        ArticlePage {
            items: items.into_iter().skip(skip).take(per_page).cloned().collect(),
            total: self.articles.len(),
        }
    }

    pub fn pending(&self, limit: usize) -> Vec<Article> {
        let mut pending: Vec<&Article> = self
            .articles
            .iter()
            .filter(|a| matches!(a.status, ArticleStatus::Pending))
            .collect();
        pending.sort_by_key(|a| (a.created_at, a.id));
        pending.into_iter().take(limit).cloned().collect()
    }

    fn max_id(&self) -> ArticleId {
        self.articles.iter().map(|a| a.id).max().unwrap_or(0)
    }
}

/// Store that lives and dies with the process.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<ArticleTable>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }
}

#[cfg(test)]
impl ArticleStore for MemoryStore {
    async fn article_exists(&self, url: &str) -> Result<bool, StoreError> {
        Ok(self.table.lock().await.contains_url(url))
    }

    async fn save_article(&self, article: NewArticle) -> Result<ArticleId, StoreError> {
        let url = article.url.clone();
        let id = self.table.lock().await.insert(article)?;
        info!(id, %url, "Saved pending article");
        Ok(id)
    }

    async fn update_article(
        &self,
        id: ArticleId,
        update: ArticleUpdate,
    ) -> Result<Article, StoreError> {
        let article = self.table.lock().await.update(id, update)?;
        debug!(id, status = article.status.label(), "Updated article");
        Ok(article)
    }

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>, StoreError> {
        Ok(self.table.lock().await.get(id).cloned())
    }

    async fn list_articles(
        &self,
        page: usize,
        per_page: usize,
    ) -> Result<ArticlePage, StoreError> {
        Ok(self.table.lock().await.page(page, per_page))
    }

    async fn pending_articles(&self, limit: usize) -> Result<Vec<Article>, StoreError> {
        Ok(self.table.lock().await.pending(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostRef;
    use std::sync::Arc;

    fn new_article(n: u32) -> NewArticle {
        NewArticle {
            url: format!("https://cafef.vn/bai-{n}-1882505060{n}.chn"),
            title: format!("Bài số {n}"),
            content: "<p>nội dung</p>".to_string(),
            source: "cafef.vn".to_string(),
        }
    }

    fn rewrite(content: &str) -> ArticleUpdate {
        ArticleUpdate {
            rewritten_content: content.to_string(),
            seo_title: None,
            published_ref: None,
        }
    }

    #[tokio::test]
    async fn test_save_and_dedup() {
        let store = MemoryStore::new();
        let id = store.save_article(new_article(1)).await.unwrap();
        assert_eq!(id, 1);
        assert!(store.article_exists(&new_article(1).url).await.unwrap());
        assert!(!store.article_exists(&new_article(2).url).await.unwrap());

        let err = store.save_article(new_article(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.len().await, 1);

        let saved = store.get_article(id).await.unwrap().unwrap();
        assert_eq!(saved.status, ArticleStatus::Pending);
        assert_eq!(saved.raw_content, "<p>nội dung</p>");
    }

    #[tokio::test]
    async fn test_concurrent_saves_of_same_url_insert_once() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.save_article(new_article(7)).await.is_ok() })
            })
            .collect();
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_lifecycle() {
        let store = MemoryStore::new();
        let id = store.save_article(new_article(1)).await.unwrap();

        let a = store.update_article(id, rewrite("<p>mới</p>")).await.unwrap();
        assert!(a.is_completed());
        assert!(a.processed_at().is_some());

        let a = store
            .update_article(
                id,
                ArticleUpdate {
                    published_ref: Some(PostRef("post-1".to_string())),
                    ..rewrite("<p>mới</p>")
                },
            )
            .await
            .unwrap();
        assert_eq!(a.status.label(), "published");

        assert!(matches!(
            store.update_article(id, rewrite("")).await,
            Err(StoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            store.update_article(99, rewrite("<p>x</p>")).await,
            Err(StoreError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_pending_oldest_first() {
        let store = MemoryStore::new();
        for n in 1..=5 {
            store.save_article(new_article(n)).await.unwrap();
        }
        store.update_article(2, rewrite("<p>x</p>")).await.unwrap();

        let page = store.list_articles(1, 2).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.iter().map(|a| a.id).collect::<Vec<_>>(), vec![5, 4]);
        let last = store.list_articles(3, 2).await.unwrap();
        assert_eq!(last.items.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);
        assert!(store.list_articles(4, 2).await.unwrap().items.is_empty());

        let pending = store.pending_articles(3).await.unwrap();
        assert_eq!(pending.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 3, 4]);
    }
}
