//! Pipeline orchestrator.
//!
//! One scrape run walks the listing page's candidates in order, one at a time:
//!
//! ```text
//! candidate → dedup → classify → fetch → extract → sanitize → validate
//!           → save (pending) → rewrite (completed) → publish (published)
//! ```
//!
//! Per-candidate failures become a [`CandidateOutcome`] and the run moves on.
//! Only configuration problems, an unreachable listing page and store failures
//! end a run early. A run stops once `scraping.limit` articles were rewritten.

use crate::api::RewriteClient;
use crate::config::Config;
use crate::error::{FetchError, PipelineError, PublishError, Rejection, RewriteError, StoreError};
use crate::fetch::HtmlFetcher;
use crate::models::{
    Article, ArticleCandidate, ArticleId, ArticlePage, ArticleStatus, ArticleUpdate, NewArticle,
    PostRef, RunSummary,
};
use crate::publish::{NewPost, PublishSink};
use crate::sanitize;
use crate::scrapers::cafef::CAFEF;
use crate::scrapers::classify::{Probe, is_article_page};
use crate::scrapers::content::extract_article;
use crate::scrapers::listing::{TitleBounds, extract_candidates};
use crate::scrapers::Site;
use crate::store::ArticleStore;
use crate::utils::truncate_for_log;
use crate::validate::ValidationRules;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// On-demand; runs even when scheduled scraping is disabled.
    Manual,
    /// Fired by the schedule; a no-op while `scraping.enabled` is false.
    Scheduled,
}

/// How far a single candidate got.
#[derive(Debug)]
pub enum CandidateOutcome {
    Duplicate,
    NotArticle,
    FetchFailed(FetchError),
    ExtractionEmpty,
    Rejected(Rejection),
    RewriteFailed { id: ArticleId, error: RewriteError },
    Completed { id: ArticleId },
    Published { id: ArticleId, post_ref: PostRef },
    PublishFailed { id: ArticleId, error: PublishError },
}

impl CandidateOutcome {
    fn record(&self, summary: &mut RunSummary) {
        match self {
            CandidateOutcome::Duplicate => summary.duplicates += 1,
            CandidateOutcome::NotArticle
            | CandidateOutcome::FetchFailed(_)
            | CandidateOutcome::ExtractionEmpty
            | CandidateOutcome::Rejected(_) => summary.skipped += 1,
            CandidateOutcome::RewriteFailed { .. } => summary.rewrite_failures += 1,
            CandidateOutcome::Completed { .. } | CandidateOutcome::PublishFailed { .. } => {
                summary.succeeded += 1
            }
            CandidateOutcome::Published { .. } => {
                summary.succeeded += 1;
                summary.published += 1;
            }
        }
    }
}

/// Fixed pause between requests to the target site, interruptible through a
/// [`CancellationToken`].
#[derive(Debug)]
struct Pacer {
    delay: Duration,
    cancel: CancellationToken,
    primed: bool,
}

impl Pacer {
    fn new(delay: Duration, cancel: CancellationToken) -> Self {
        Self {
            delay,
            cancel,
            primed: false,
        }
    }

    /// Wait out the delay before the next request. `false` means cancelled.
    async fn wait(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if !self.primed || self.delay.is_zero() {
            self.primed = true;
            return true;
        }
        debug!(delay_ms = self.delay.as_millis() as u64, "Pausing before next request");
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        }
    }
}

/// Scrape, vet, rewrite and publish articles from one target site.
///
/// Generic over the article store `S` and the publish sink `P`. All
/// operations take `&self`; a scrape run holds `run_lock` for its whole
/// duration, so runs on one pipeline never overlap.
pub struct Pipeline<S, P> {
    config: Config,
    site: Site,
    fetcher: HtmlFetcher,
    rewriter: RewriteClient,
    rules: ValidationRules,
    bounds: TitleBounds,
    store: S,
    sink: P,
    run_lock: Mutex<()>,
    cancel: CancellationToken,
}

impl<S: ArticleStore, P: PublishSink> Pipeline<S, P> {
    /// Build the site tables and HTTP clients for `config`.
    ///
    /// # Errors
    ///
    /// Fails when an HTTP client cannot be constructed.
    pub fn new(config: Config, store: S, sink: P) -> Result<Self, PipelineError> {
        let site = Site::new(&CAFEF, &config.target_url);
        let fetcher = HtmlFetcher::new(&config.scraping.user_agent).map_err(PipelineError::Client)?;
        let rewriter = RewriteClient::from_config(&config.api)?;
        Ok(Self {
            config,
            site,
            fetcher,
            rewriter,
            rules: ValidationRules::default(),
            bounds: TitleBounds::default(),
            store,
            sink,
            run_lock: Mutex::new(()),
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Token that interrupts the pacer and stops a run between candidates.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Scrape the listing page and process candidates until the limit is hit.
    #[instrument(level = "info", skip(self), fields(target = %self.config.target_url))]
    pub async fn run_scrape(&self, trigger: Trigger) -> Result<RunSummary, PipelineError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| PipelineError::RunInProgress)?;

        if trigger == Trigger::Scheduled && !self.config.scraping.enabled {
            info!("Scheduled scraping is disabled; skipping run");
            return Ok(RunSummary::default());
        }
        self.config.require_api_key()?;

        let t0 = Instant::now();
        let limit = self.config.scraping.limit as usize;
        info!(limit, "Scrape run starting");

        let listing = self
            .fetcher
            .fetch(self.config.target_url.as_str(), self.config.scraping.page_timeout)
            .await
            .map_err(|e| {
                error!(error = %e, "Could not fetch listing page");
                PipelineError::Listing(e)
            })?;
        let candidates = extract_candidates(&listing.html, &self.site, self.bounds);
        info!(candidates = candidates.len(), "Listing page parsed");

        let mut summary = RunSummary::default();
        let mut pacer = Pacer::new(self.config.scraping.delay, self.cancel.clone());

        for (index, candidate) in candidates.iter().enumerate() {
            if summary.succeeded >= limit {
                info!(
                    limit,
                    remaining = candidates.len() - index,
                    "Run limit reached"
                );
                break;
            }
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            if self.store.article_exists(&candidate.url).await? {
                debug!(url = %candidate.url, "Already stored");
                summary.processed += 1;
                CandidateOutcome::Duplicate.record(&mut summary);
                continue;
            }
            if !pacer.wait().await {
                summary.cancelled = true;
                break;
            }
            summary.processed += 1;

            let outcome = self.process_candidate(candidate).await?;
            log_outcome(candidate, &outcome);
            outcome.record(&mut summary);
        }

        if summary.cancelled {
            warn!("Scrape run cancelled");
        }
        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            duplicates = summary.duplicates,
            skipped = summary.skipped,
            rewrite_failures = summary.rewrite_failures,
            published = summary.published,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Scrape run finished"
        );
        Ok(summary)
    }

    /// Run one new candidate through the pipeline.
    ///
    /// Only store failures and configuration errors are returned as `Err`.
    #[instrument(level = "info", skip_all, fields(url = %candidate.url))]
    pub async fn process_candidate(
        &self,
        candidate: &ArticleCandidate,
    ) -> Result<CandidateOutcome, PipelineError> {
        let probe = self.config.scraping.probe_unclassified.then_some(Probe {
            fetcher: &self.fetcher,
            timeout: self.config.scraping.probe_timeout,
        });
        if !is_article_page(&candidate.url, &self.site, probe).await {
            return Ok(CandidateOutcome::NotArticle);
        }

        let page = match self
            .fetcher
            .fetch(&candidate.url, self.config.scraping.page_timeout)
            .await
        {
            Ok(page) => page,
            Err(e) => return Ok(CandidateOutcome::FetchFailed(e)),
        };

        let Some(extracted) = extract_article(&page.html, &self.site) else {
            return Ok(CandidateOutcome::ExtractionEmpty);
        };
        let content = sanitize::clean(&extracted.content);
        if let Err(rejection) = self.rules.check(&extracted.title, &content) {
            return Ok(CandidateOutcome::Rejected(rejection));
        }

        let saved = self
            .store
            .save_article(NewArticle {
                url: candidate.url.clone(),
                title: extracted.title.clone(),
                content: content.clone(),
                source: self.config.source.clone(),
            })
            .await;
        let id = match saved {
            Ok(id) => id,
            Err(StoreError::Duplicate(_)) => return Ok(CandidateOutcome::Duplicate),
            Err(e) => return Err(e.into()),
        };

        let article = match self.rewrite_and_store(id, &extracted.title, &content).await {
            Ok(article) => article,
            Err(PipelineError::Rewrite(error)) if !error.is_config() => {
                return Ok(CandidateOutcome::RewriteFailed { id, error });
            }
            Err(e) => return Err(e),
        };

        if !self.config.post.auto_publish {
            return Ok(CandidateOutcome::Completed { id });
        }
        match self.publish(&article).await {
            Ok((_, post_ref)) => Ok(CandidateOutcome::Published { id, post_ref }),
            Err(PipelineError::Publish(error)) => Ok(CandidateOutcome::PublishFailed { id, error }),
            Err(e) => Err(e),
        }
    }

    /// Re-run the rewrite for a stored article. Published articles are refused.
    #[instrument(level = "info", skip(self))]
    pub async fn rewrite_article(&self, id: ArticleId) -> Result<Article, PipelineError> {
        self.config.require_api_key()?;
        let article = self.load(id).await?;
        if let ArticleStatus::Published { .. } = article.status {
            return Err(PipelineError::WrongState {
                id,
                action: "rewritten",
                state: article.status.label(),
            });
        }
        self.rewrite_and_store(id, &article.title, &article.raw_content)
            .await
    }

    /// Push a completed article to the publish sink.
    #[instrument(level = "info", skip(self))]
    pub async fn publish_article(&self, id: ArticleId) -> Result<Article, PipelineError> {
        let article = self.load(id).await?;
        match article.status {
            ArticleStatus::Completed { .. } => Ok(self.publish(&article).await?.0),
            _ => Err(PipelineError::WrongState {
                id,
                action: "published",
                state: article.status.label(),
            }),
        }
    }

    /// One page of stored articles, newest first.
    ///
    /// # Arguments
    ///
    /// * `page` - 1-based page number; pages past the end are empty
    /// * `per_page` - Page size; 0 is treated as 1
    ///
    /// # Returns
    ///
    /// The page's articles and the total number stored.
    pub async fn list_articles(
        &self,
        page: usize,
        per_page: usize,
    ) -> Result<ArticlePage, PipelineError> {
        Ok(self.store.list_articles(page, per_page).await?)
    }

    /// Up to `limit` articles still waiting for a rewrite, oldest first.
    pub async fn pending_articles(&self, limit: usize) -> Result<Vec<Article>, PipelineError> {
        Ok(self.store.pending_articles(limit).await?)
    }

    async fn load(&self, id: ArticleId) -> Result<Article, PipelineError> {
        self.store
            .get_article(id)
            .await?
            .ok_or(PipelineError::ArticleNotFound(id))
    }

    async fn rewrite_and_store(
        &self,
        id: ArticleId,
        title: &str,
        content: &str,
    ) -> Result<Article, PipelineError> {
        let rewritten = self.rewriter.rewrite(title, content).await?;

        let seo_title = if self.config.post.rewrite_title {
            match self.rewriter.rewrite_title(title, content).await {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!(id, error = %e, "SEO title rewrite failed; keeping original title");
                    None
                }
            }
        } else {
            None
        };

        let article = self
            .store
            .update_article(
                id,
                ArticleUpdate {
                    rewritten_content: rewritten,
                    seo_title,
                    published_ref: None,
                },
            )
            .await?;
        info!(id, "Article rewritten");
        Ok(article)
    }

    async fn publish(&self, article: &Article) -> Result<(Article, PostRef), PipelineError> {
        let Some(html) = article.rewritten_content() else {
            return Err(PipelineError::WrongState {
                id: article.id,
                action: "published",
                state: article.status.label(),
            });
        };
        let post = NewPost {
            title: article.display_title().to_string(),
            html: html.to_string(),
            status: self.config.post.status,
            author: self.config.post.author,
            category: self.config.post.category,
        };
        let post_ref = self.sink.create_post(&post).await.map_err(|e| {
            error!(id = article.id, error = %e, "Publishing failed; rewrite kept");
            e
        })?;

        let updated = self
            .store
            .update_article(
                article.id,
                ArticleUpdate {
                    rewritten_content: html.to_string(),
                    seo_title: article.seo_title().map(str::to_string),
                    published_ref: Some(post_ref.clone()),
                },
            )
            .await?;
        info!(id = article.id, %post_ref, "Article published");
        Ok((updated, post_ref))
    }
}

fn log_outcome(candidate: &ArticleCandidate, outcome: &CandidateOutcome) {
    let url = candidate.url.as_str();
    match outcome {
        CandidateOutcome::Duplicate => info!(url, "Skipped: already stored"),
        CandidateOutcome::NotArticle => info!(url, "Skipped: not an article page"),
        CandidateOutcome::FetchFailed(e) => warn!(url, error = %e, "Skipped: fetch failed"),
        CandidateOutcome::ExtractionEmpty => info!(url, "Skipped: no title or content found"),
        CandidateOutcome::Rejected(rule) => info!(url, rule = %rule, "Skipped: failed validation"),
        CandidateOutcome::RewriteFailed { id, error } => error!(
            url,
            id,
            error = %truncate_for_log(&error.to_string(), 300),
            "Rewrite failed; article left pending"
        ),
        CandidateOutcome::Completed { id } => info!(url, id, "Article completed"),
        CandidateOutcome::Published { id, post_ref } => {
            info!(url, id, %post_ref, "Article completed and published")
        }
        CandidateOutcome::PublishFailed { id, error } => {
            warn!(url, id, error = %error, "Article completed; publishing failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, Overrides};
    use crate::publish::FilePostSink;
    use crate::store::MemoryStore;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = "/thi-truong-chung-khoan.chn";
    const CHAT: &str = "/v1/chat/completions";

    fn article_path(n: usize) -> String {
        format!("/co-phieu-dang-chu-y-so-{n}-18825050600{n}.chn")
    }

    fn listing_html(count: usize) -> String {
        let links: String = (1..=count)
            .map(|n| {
                format!(
                    r#"<a title="t{n}" href="{}">Cổ phiếu đáng chú ý số {n}</a>"#,
                    article_path(n)
                )
            })
            .collect();
        format!(r#"<html><body><div class="list-news">{links}</div></body></html>"#)
    }

    fn article_html(n: usize) -> String {
        let para = |seed: &str| format!("{seed} ").repeat(20);
        format!(
            r#"<html><head><title>Trang {n}</title></head><body>
            <h1 class="title">Cổ phiếu đáng chú ý số {n} trong phiên hôm nay</h1>
            <div class="detail-content">
              <p>{}</p>
              <p>{}</p>
              <div class="box-share">Chia sẻ</div>
            </div></body></html>"#,
            para("Thị trường chứng khoán"),
            para("Dòng tiền lan tỏa"),
        )
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    async fn mount_listing(server: &MockServer, count: usize) {
        Mock::given(method("GET"))
            .and(path(LISTING))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(count)))
            .mount(server)
            .await;
    }

    async fn mount_article(server: &MockServer, n: usize, expected_hits: u64) {
        Mock::given(method("GET"))
            .and(path(article_path(n)))
            .respond_with(ResponseTemplate::new(200).set_body_string(article_html(n)))
            .expect(expected_hits)
            .mount(server)
            .await;
    }

    async fn mount_chat(server: &MockServer, status: u16) {
        let response = if status == 200 {
            ResponseTemplate::new(200).set_body_json(completion("<h2>Bài viết lại</h2><p>Nội dung mới.</p>"))
        } else {
            ResponseTemplate::new(status).set_body_string("internal error")
        };
        Mock::given(method("POST"))
            .and(path(CHAT))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn config(server: &MockServer, limit: u32) -> Config {
        let mut config = FileConfig::default()
            .resolve(Overrides {
                target_url: Some(format!("{}{LISTING}", server.uri())),
                api_key: Some("sk-test".to_string()),
                limit: Some(limit),
            })
            .unwrap();
        config.api.endpoint = format!("{}{CHAT}", server.uri());
        config.scraping.delay = Duration::ZERO;
        config.scraping.probe_unclassified = false;
        config
    }

    fn pipeline(config: Config) -> (Pipeline<MemoryStore, FilePostSink>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let sink = FilePostSink::new(dir.path());
        (Pipeline::new(config, MemoryStore::new(), sink).unwrap(), dir)
    }

    #[tokio::test]
    async fn test_second_run_persists_nothing_new() {
        let server = MockServer::start().await;
        mount_listing(&server, 3).await;
        for n in 1..=3 {
            mount_article(&server, n, 1).await;
        }
        mount_chat(&server, 200).await;

        let (p, _dir) = pipeline(config(&server, 5));
        let first = p.run_scrape(Trigger::Manual).await.unwrap();
        assert_eq!(first.processed, 3);
        assert_eq!(first.succeeded, 3);
        assert_eq!(p.store().len().await, 3);

        let second = p.run_scrape(Trigger::Manual).await.unwrap();
        assert_eq!(second.succeeded, 0);
        assert_eq!(second.duplicates, 3);
        assert_eq!(p.store().len().await, 3);

        let stored = p.list_articles(1, 10).await.unwrap();
        for a in &stored.items {
            assert!(a.is_completed());
            assert!(!a.raw_content.contains("Chia sẻ"));
            assert!(!a.raw_content.contains("class="));
            assert_eq!(a.source, "127.0.0.1");
        }
    }

    #[tokio::test]
    async fn test_rewrite_failure_leaves_pending_and_continues() {
        let server = MockServer::start().await;
        mount_listing(&server, 2).await;
        for n in 1..=2 {
            mount_article(&server, n, 1).await;
        }
        mount_chat(&server, 500).await;

        let (p, _dir) = pipeline(config(&server, 5));
        let summary = p.run_scrape(Trigger::Manual).await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.rewrite_failures, 2);

        let pending = p.pending_articles(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|a| a.rewritten_content().is_none()));
    }

    #[tokio::test]
    async fn test_run_limit_stops_early() {
        let server = MockServer::start().await;
        mount_listing(&server, 5).await;
        for n in 1..=5 {
            mount_article(&server, n, if n <= 2 { 1 } else { 0 }).await;
        }
        mount_chat(&server, 200).await;

        let (p, _dir) = pipeline(config(&server, 2));
        let summary = p.run_scrape(Trigger::Manual).await.unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.processed, 2);
        assert_eq!(p.store().len().await, 2);
    }

    #[tokio::test]
    async fn test_auto_publish_attaches_post_ref() {
        let server = MockServer::start().await;
        mount_listing(&server, 1).await;
        mount_article(&server, 1, 1).await;
        mount_chat(&server, 200).await;

        let mut config = config(&server, 5);
        config.post.auto_publish = true;
        let (p, dir) = pipeline(config);
        let summary = p.run_scrape(Trigger::Manual).await.unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.published, 1);

        let article = p.store().get_article(1).await.unwrap().unwrap();
        let post_ref = article.published_ref().unwrap();
        let post = std::fs::read_to_string(dir.path().join(&post_ref.0)).unwrap();
        assert!(post.contains("<h2>Bài viết lại</h2>"));
    }

    #[tokio::test]
    async fn test_invalid_article_is_skipped() {
        let server = MockServer::start().await;
        mount_listing(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(article_path(1)))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><h1 class="title">Tiêu đề đủ dài để qua</h1>
                   <div class="detail-content"><p>Quá ngắn.</p></div></body></html>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("x")))
            .expect(0)
            .mount(&server)
            .await;

        let (p, _dir) = pipeline(config(&server, 5));
        let summary = p.run_scrape(Trigger::Manual).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(p.store().len().await, 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_skipped() {
        let server = MockServer::start().await;
        mount_listing(&server, 2).await;
        Mock::given(method("GET"))
            .and(path(article_path(1)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_article(&server, 2, 1).await;
        mount_chat(&server, 200).await;

        let (p, _dir) = pipeline(config(&server, 5));
        let summary = p.run_scrape(Trigger::Manual).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.succeeded, 1);
    }

    #[tokio::test]
    async fn test_missing_api_key_aborts_before_fetching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(1)))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = config(&server, 5);
        config.api.api_key = None;
        let (p, _dir) = pipeline(config);
        assert!(matches!(
            p.run_scrape(Trigger::Manual).await,
            Err(PipelineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_failure_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LISTING))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let (p, _dir) = pipeline(config(&server, 5));
        assert!(matches!(
            p.run_scrape(Trigger::Manual).await,
            Err(PipelineError::Listing(FetchError::Status { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn test_scheduled_trigger_respects_enabled_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let (p, _dir) = pipeline(config(&server, 5));
        let summary = p.run_scrape(Trigger::Scheduled).await.unwrap();
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    async fn test_concurrent_run_is_refused() {
        let server = MockServer::start().await;
        let (p, _dir) = pipeline(config(&server, 5));
        let _held = p.run_lock.try_lock().unwrap();
        assert!(matches!(
            p.run_scrape(Trigger::Manual).await,
            Err(PipelineError::RunInProgress)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_run_stops_between_candidates() {
        let server = MockServer::start().await;
        mount_listing(&server, 3).await;
        for n in 1..=3 {
            mount_article(&server, n, 0).await;
        }
        let (p, _dir) = pipeline(config(&server, 5));
        p.cancellation().cancel();
        let summary = p.run_scrape(Trigger::Manual).await.unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.processed, 0);
    }

    #[tokio::test]
    async fn test_pacer_delay_is_interruptible() {
        let cancel = CancellationToken::new();
        let mut pacer = Pacer::new(Duration::from_secs(3600), cancel.clone());
        assert!(pacer.wait().await);
        let waiter = tokio::spawn(async move { pacer.wait().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        assert!(!waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_manual_rewrite_and_publish() {
        let server = MockServer::start().await;
        mount_listing(&server, 1).await;
        mount_article(&server, 1, 1).await;
        Mock::given(method("POST"))
            .and(path(CHAT))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_chat(&server, 200).await;

        let (p, _dir) = pipeline(config(&server, 5));
        let summary = p.run_scrape(Trigger::Manual).await.unwrap();
        assert_eq!(summary.rewrite_failures, 1);

        assert!(matches!(
            p.publish_article(1).await,
            Err(PipelineError::WrongState { state: "pending", .. })
        ));

        let rewritten = p.rewrite_article(1).await.unwrap();
        assert_eq!(rewritten.status.label(), "completed");

        let published = p.publish_article(1).await.unwrap();
        assert!(published.published_ref().is_some());
        assert_eq!(published.processed_at(), rewritten.processed_at());

        assert!(matches!(
            p.rewrite_article(1).await,
            Err(PipelineError::WrongState { state: "published", .. })
        ));
        assert!(matches!(
            p.publish_article(1).await,
            Err(PipelineError::WrongState { .. })
        ));
        assert!(matches!(
            p.rewrite_article(42).await,
            Err(PipelineError::ArticleNotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_seo_title_used_for_publishing() {
        let server = MockServer::start().await;
        mount_listing(&server, 1).await;
        mount_article(&server, 1, 1).await;
        Mock::given(method("POST"))
            .and(path(CHAT))
            .and(wiremock::matchers::body_partial_json(json!({"max_tokens": 100})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion("\"Tiêu đề SEO mới\"")),
            )
            .mount(&server)
            .await;
        mount_chat(&server, 200).await;

        let mut config = config(&server, 5);
        config.post.rewrite_title = true;
        config.post.auto_publish = true;
        let (p, dir) = pipeline(config);
        p.run_scrape(Trigger::Manual).await.unwrap();

        let article = p.store().get_article(1).await.unwrap().unwrap();
        assert_eq!(article.seo_title(), Some("Tiêu đề SEO mới"));
        let index = std::fs::read_to_string(dir.path().join("index.md")).unwrap();
        assert!(index.starts_with("- [Tiêu đề SEO mới]("));
    }

    /// Sink that refuses every post.
    struct RejectingSink;

    impl PublishSink for RejectingSink {
        async fn create_post(&self, _post: &NewPost) -> Result<PostRef, PublishError> {
            Err(PublishError::Rejected("remote site is read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_completed_rewrite() {
        let server = MockServer::start().await;
        mount_listing(&server, 1).await;
        mount_article(&server, 1, 1).await;
        mount_chat(&server, 200).await;

        let mut config = config(&server, 5);
        config.post.auto_publish = true;
        let p = Pipeline::new(config, MemoryStore::new(), RejectingSink).unwrap();
        let summary = p.run_scrape(Trigger::Manual).await.unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.published, 0);
        assert_eq!(summary.rewrite_failures, 0);

        let article = p.store().get_article(1).await.unwrap().unwrap();
        assert_eq!(article.status.label(), "completed");
        assert!(article.published_ref().is_none());
        assert!(article.rewritten_content().unwrap().contains("Bài viết lại"));

        assert!(matches!(
            p.publish_article(1).await,
            Err(PipelineError::Publish(PublishError::Rejected(_)))
        ));
        let still = p.store().get_article(1).await.unwrap().unwrap();
        assert_eq!(still, article);
    }

    #[tokio::test]
    async fn test_seo_title_failure_keeps_original_title() {
        let server = MockServer::start().await;
        mount_listing(&server, 1).await;
        mount_article(&server, 1, 1).await;
        Mock::given(method("POST"))
            .and(path(CHAT))
            .and(wiremock::matchers::body_partial_json(json!({"max_tokens": 100})))
            .respond_with(ResponseTemplate::new(500).set_body_string("title model down"))
            .expect(1)
            .mount(&server)
            .await;
        mount_chat(&server, 200).await;

        let mut config = config(&server, 5);
        config.post.rewrite_title = true;
        config.post.auto_publish = true;
        let (p, dir) = pipeline(config);
        let summary = p.run_scrape(Trigger::Manual).await.unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.published, 1);

        let article = p.store().get_article(1).await.unwrap().unwrap();
        assert_eq!(article.seo_title(), None);
        assert!(article.rewritten_content().is_some());
        assert_eq!(
            article.display_title(),
            "Cổ phiếu đáng chú ý số 1 trong phiên hôm nay"
        );
        let index = std::fs::read_to_string(dir.path().join("index.md")).unwrap();
        assert!(index.starts_with("- [Cổ phiếu đáng chú ý số 1 trong phiên hôm nay]("));
    }
}
