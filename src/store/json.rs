//! JSON-file article store.
//!
//! The whole table is kept in memory and written back after every mutation.
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous version intact.
//!
//! ```text
//! data/
//! └── articles.json   {"next_id": 3, "articles": [{"id": 1, "status": "pending", ..}, ..]}
//! ```

use super::ArticleStore;
use super::memory::ArticleTable;
use crate::error::StoreError;
use crate::models::{Article, ArticleId, ArticlePage, ArticleUpdate, NewArticle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    table: Mutex<ArticleTable>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty when the file does not exist yet.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let table = match fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => ArticleTable::default(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                error!(error = %e, "Article store is not valid JSON");
                StoreError::Corrupt(e)
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No article store yet; starting empty");
                ArticleTable::default()
            }
            Err(e) => return Err(e.into()),
        };
        info!(articles = table.len(), "Opened article store");
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, table: &ArticleTable) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec_pretty(table)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(bytes = json.len(), path = %self.path.display(), "Persisted article store");
        Ok(())
    }
}

impl ArticleStore for JsonFileStore {
    async fn article_exists(&self, url: &str) -> Result<bool, StoreError> {
        Ok(self.table.lock().await.contains_url(url))
    }

    async fn save_article(&self, article: NewArticle) -> Result<ArticleId, StoreError> {
        let url = article.url.clone();
        let mut table = self.table.lock().await;
        let mut next = table.clone();
        let id = next.insert(article)?;
        self.persist(&next).await?;
        *table = next;
        info!(id, %url, "Saved pending article");
        Ok(id)
    }

    async fn update_article(
        &self,
        id: ArticleId,
        update: ArticleUpdate,
    ) -> Result<Article, StoreError> {
        let mut table = self.table.lock().await;
        let mut next = table.clone();
        let article = next.update(id, update)?;
        self.persist(&next).await?;
        *table = next;
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
