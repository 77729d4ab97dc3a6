//! Error taxonomy for the scrape → rewrite pipeline.
//!
//! Errors fall into two groups:
//!
//! - **Per-candidate** ([`FetchError`], [`Rejection`], [`RewriteError`],
//!   [`PublishError`]): the orchestrator logs them and moves on to the next
//!   candidate URL.
//! - **Run-level** ([`ConfigError`], [`StoreError`], [`PipelineError`]): the
//!   run stops immediately and the error bubbles up to `main`.

use crate::models::ArticleId;
use thiserror::Error;

/// Failure to retrieve a page from the target site.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Wrap a reqwest error, keeping timeouts distinguishable in logs.
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// The validator rule an article failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("title is empty")]
    EmptyTitle,

    #[error("content is empty")]
    EmptyContent,

    #[error("title length {len} outside {min}..={max}")]
    TitleLength { len: usize, min: usize, max: usize },

    #[error("plain-text content too short ({len} < {min})")]
    ContentTooShort { len: usize, min: usize },

    #[error("content carries no HTML markup")]
    NotHtml,

    #[error("too little structure ({paragraphs} paragraphs, {line_breaks} line breaks)")]
    Unstructured { paragraphs: usize, line_breaks: usize },

    #[error("looks like advertising ({hits} spam keywords)")]
    Spam { hits: usize },

    #[error("link density too high ({links} links for {text_len} characters)")]
    LinkDensity { links: usize, text_len: usize },
}

/// Failure of a chat-completion round trip.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("rewrite request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rewrite API answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed rewrite response: {0}")]
    MalformedResponse(String),
}

impl RewriteError {
    /// Configuration problems are not worth re-attempting.
    pub fn is_config(&self) -> bool {
        matches!(self, RewriteError::MissingCredential)
    }
}

/// The publish sink refused or failed to create a post.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("post output failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("post front matter could not be encoded: {0}")]
    Encode(#[from] serde_yaml::Error),

    #[error("post rejected: {0}")]
    Rejected(String),
}

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an article with URL {0} already exists")]
    Duplicate(String),

    #[error("article {0} not found")]
    NotFound(ArticleId),

    #[error("article {id}: {reason}")]
    InvalidTransition { id: ArticleId, reason: &'static str },

    #[error("article store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("article store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Configuration that cannot be used to run the pipeline.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("target URL is not configured")]
    MissingTargetUrl,

    #[error("target URL {url} is invalid: {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    #[error("API key is not configured")]
    MissingApiKey,

    #[error("API model is not configured")]
    MissingModel,

    #[error("scraping limit {0} outside 1..=50")]
    LimitOutOfRange(u32),
}

/// Errors that end a pipeline operation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HTTP client could not be built: {0}")]
    Client(#[source] reqwest::Error),

    #[error("listing page unavailable: {0}")]
    Listing(#[source] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("a scrape run is already in progress")]
    RunInProgress,

    #[error("article {0} not found")]
    ArticleNotFound(ArticleId),

    #[error("article {id} cannot be {action}: it is {state}")]
    WrongState {
        id: ArticleId,
        action: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
