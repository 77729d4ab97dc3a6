//! Data models for scraped candidates, persisted articles and run results.
//!
//! - [`ArticleCandidate`]: a link found on a listing page, not yet vetted
//! - [`ExtractedArticle`]: title and body pulled out of an article page
//! - [`Article`]: the persisted entity, with its lifecycle in [`ArticleStatus`]
//! - [`RunSummary`]: counters reported at the end of a scrape run
//!
//! The lifecycle is an enum so that a published article without rewritten
//! content cannot be represented: [`Rewrite`] can only be built from
//! non-blank content and both non-pending states carry one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the article store.
pub type ArticleId = u64;

/// A link discovered on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleCandidate {
    /// Absolute URL of the article page.
    pub url: String,
    /// Anchor text (or `title` attribute) of the link.
    pub title: String,
}

/// Title and HTML body extracted from an article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    pub content: String,
}

/// Identifier of a post created by the publish sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostRef(pub String);

impl fmt::Display for PostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of a successful rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RewriteRecord")]
pub struct Rewrite {
    content: String,
    seo_title: Option<String>,
    processed_at: DateTime<Utc>,
}

impl Rewrite {
    /// Build a rewrite stamped with the current time. Returns `None` for blank content.
    pub fn new(content: impl Into<String>, seo_title: Option<String>) -> Option<Self> {
        Self::at(content, seo_title, Utc::now())
    }

    fn at(
        content: impl Into<String>,
        seo_title: Option<String>,
        processed_at: DateTime<Utc>,
    ) -> Option<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return None;
        }
        let seo_title = seo_title.filter(|t| !t.trim().is_empty());
        Some(Self {
            content,
            seo_title,
            processed_at,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn seo_title(&self) -> Option<&str> {
        self.seo_title.as_deref()
    }

    pub fn processed_at(&self) -> DateTime<Utc> {
        self.processed_at
    }
}

/// Wire shape of [`Rewrite`]; deserialization goes through the same blank check.
#[derive(Deserialize)]
struct RewriteRecord {
    content: String,
    #[serde(default)]
    seo_title: Option<String>,
    processed_at: DateTime<Utc>,
}

impl TryFrom<RewriteRecord> for Rewrite {
    type Error = &'static str;

    fn try_from(r: RewriteRecord) -> Result<Self, Self::Error> {
        Rewrite::at(r.content, r.seo_title, r.processed_at).ok_or("rewritten content is empty")
    }
}

/// Where an article is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArticleStatus {
    /// Saved after validation, waiting for a rewrite.
    Pending,
    /// Rewritten, not (yet) pushed to the publish sink.
    Completed { rewrite: Rewrite },
    /// Rewritten and turned into a post.
    Published { rewrite: Rewrite, post_ref: PostRef },
}

impl ArticleStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Completed { .. } => "completed",
            ArticleStatus::Published { .. } => "published",
        }
    }

    pub fn rewrite(&self) -> Option<&Rewrite> {
        match self {
            ArticleStatus::Pending => None,
            ArticleStatus::Completed { rewrite } | ArticleStatus::Published { rewrite, .. } => {
                Some(rewrite)
            }
        }
    }
}

/// A persisted article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    /// Unique key; a URL is only ever stored once.
    pub url: String,
    pub title: String,
    /// Cleaned HTML as scraped.
    pub raw_content: String,
    /// Site label, e.g. `cafef.vn`.
    pub source: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub status: ArticleStatus,
}

impl Article {
    pub fn is_completed(&self) -> bool {
        !matches!(self.status, ArticleStatus::Pending)
    }

    pub fn rewritten_content(&self) -> Option<&str> {
        self.status.rewrite().map(Rewrite::content)
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.status.rewrite().map(Rewrite::processed_at)
    }

    pub fn seo_title(&self) -> Option<&str> {
        self.status.rewrite().and_then(Rewrite::seo_title)
    }

    pub fn published_ref(&self) -> Option<&PostRef> {
        match &self.status {
            ArticleStatus::Published { post_ref, .. } => Some(post_ref),
            _ => None,
        }
    }

    /// Title to publish under: the SEO title when one was generated.
    pub fn display_title(&self) -> &str {
        self.seo_title().unwrap_or(&self.title)
    }

    /// Apply an [`ArticleUpdate`], moving the article to completed or published.
    ///
    /// Re-submitting unchanged content keeps the original `processed_at`; an
    /// update without a post reference leaves an existing one attached.
    pub fn apply(&mut self, update: ArticleUpdate) -> Result<(), &'static str> {
        let processed_at = match self.status.rewrite() {
            Some(prev) if prev.content() == update.rewritten_content => prev.processed_at(),
            _ => Utc::now(),
        };
        let rewrite = Rewrite::at(update.rewritten_content, update.seo_title, processed_at)
            .ok_or("rewritten content is empty")?;

        let post_ref = update.published_ref.or_else(|| self.published_ref().cloned());
        self.status = match post_ref {
            Some(post_ref) => ArticleStatus::Published { rewrite, post_ref },
            None => ArticleStatus::Completed { rewrite },
        };
        Ok(())
    }
}

/// Input to `save_article`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub url: String,
    pub title: String,
    pub content: String,
    pub source: String,
}

/// Input to `update_article`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleUpdate {
    pub rewritten_content: String,
    pub seo_title: Option<String>,
    pub published_ref: Option<PostRef>,
}

/// One page of `list_articles`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticlePage {
    pub items: Vec<Article>,
    pub total: usize,
}

/// Counters reported at the end of a scrape run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Candidates examined.
    pub processed: usize,
    /// Articles saved and rewritten in this run.
    pub succeeded: usize,
    /// Candidates whose URL was already stored.
    pub duplicates: usize,
    /// Candidates dropped by classification, fetch, extraction or validation.
    pub skipped: usize,
    /// Articles saved but left pending because the rewrite failed.
    pub rewrite_failures: usize,
    /// Articles turned into posts.
    pub published: usize,
    /// The run was interrupted between candidates.
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_article() -> Article {
        Article {
            id: 1,
            url: "https://cafef.vn/a-188240101.chn".to_string(),
            title: "Original title".to_string(),
            raw_content: "<p>body</p>".to_string(),
            source: "cafef.vn".to_string(),
            created_at: Utc::now(),
            status: ArticleStatus::Pending,
        }
    }

    fn update(content: &str, post: Option<&str>) -> ArticleUpdate {
        ArticleUpdate {
            rewritten_content: content.to_string(),
            seo_title: None,
            published_ref: post.map(|p| PostRef(p.to_string())),
        }
    }

    #[test]
    fn test_rewrite_rejects_blank_content() {
        assert!(Rewrite::new("   ", None).is_none());
        assert!(Rewrite::new("<p>x</p>", Some(" ".to_string())).is_some());
        assert_eq!(Rewrite::new("<p>x</p>", Some(" ".to_string())).unwrap().seo_title(), None);
    }

    #[test]
    fn test_pending_has_no_rewrite_fields() {
        let a = pending_article();
        assert!(!a.is_completed());
        assert_eq!(a.rewritten_content(), None);
        assert_eq!(a.processed_at(), None);
        assert_eq!(a.published_ref(), None);
    }

    #[test]
    fn test_apply_completes_article() {
        let mut a = pending_article();
        a.apply(update("<p>new</p>", None)).unwrap();
        assert!(a.is_completed());
        assert_eq!(a.status.label(), "completed");
        assert_eq!(a.rewritten_content(), Some("<p>new</p>"));
        assert!(a.processed_at().is_some());
    }

    #[test]
    fn test_apply_empty_content_keeps_state() {
        let mut a = pending_article();
        assert!(a.apply(update("", None)).is_err());
        assert_eq!(a.status, ArticleStatus::Pending);
    }

    #[test]
    fn test_publish_keeps_processed_at_for_same_content() {
        let mut a = pending_article();
        a.apply(update("<p>new</p>", None)).unwrap();
        let first = a.processed_at();
        a.apply(update("<p>new</p>", Some("42"))).unwrap();
        assert_eq!(a.processed_at(), first);
        assert_eq!(a.published_ref(), Some(&PostRef("42".to_string())));
        assert_eq!(a.status.label(), "published");
    }

    #[test]
    fn test_update_without_ref_keeps_existing_ref() {
        let mut a = pending_article();
        a.apply(update("<p>new</p>", Some("7"))).unwrap();
        a.apply(update("<p>newer</p>", None)).unwrap();
        assert_eq!(a.published_ref(), Some(&PostRef("7".to_string())));
        assert_eq!(a.rewritten_content(), Some("<p>newer</p>"));
    }

    #[test]
    fn test_display_title_prefers_seo_title() {
        let mut a = pending_article();
        assert_eq!(a.display_title(), "Original title");
        a.apply(ArticleUpdate {
            rewritten_content: "<p>x</p>".to_string(),
            seo_title: Some("Better title".to_string()),
            published_ref: None,
        })
        .unwrap();
        assert_eq!(a.display_title(), "Better title");
    }

    #[test]
    fn test_article_serialization_round_trip() {
        let mut a = pending_article();
        a.apply(update("<p>new</p>", Some("post-1"))).unwrap();

        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains(r#""status":"published""#));
        assert!(json.contains(r#""post_ref":"post-1""#));

        let back: Article = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_deserialize_rejects_completed_without_content() {
        let json = r#"{
            "id": 3,
            "url": "https://cafef.vn/x.chn",
            "title": "t",
            "raw_content": "<p>c</p>",
            "source": "cafef.vn",
            "created_at": "2025-05-06T08:00:00Z",
            "status": "completed",
            "rewrite": {"content": "", "processed_at": "2025-05-06T09:00:00Z"}
        }"#;
        assert!(serde_json::from_str::<Article>(json).is_err());
    }
}
