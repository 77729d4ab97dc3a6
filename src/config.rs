//! Pipeline configuration.
//!
//! Settings are read from a YAML file where every field is optional, then
//! overlaid with CLI/environment values and resolved into an immutable
//! [`Config`] that is handed to the pipeline at run start.
//!
//! ```yaml
//! target_url: https://cafef.vn/thi-truong-chung-khoan.chn
//! api:
//!   api_key: sk-...
//!   model: gpt-4o
//! scraping:
//!   enabled: true
//!   limit: 5
//!   frequency: hourly
//! post:
//!   auto_publish: true
//!   status: draft
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TARGET_URL: &str = "https://cafef.vn/thi-truong-chung-khoan.chn";
pub const DEFAULT_ENDPOINT: &str = "https://api.yescale.io/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36";

/// Status given to posts created by the publish sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
    #[default]
    Draft,
    Pending,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
        }
    }
}

/// How often the scheduled trigger fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Hourly,
    TwiceDaily,
    Daily,
}

impl Frequency {
    pub fn interval(&self) -> Duration {
        match self {
            Frequency::Hourly => Duration::from_secs(60 * 60),
            Frequency::TwiceDaily => Duration::from_secs(12 * 60 * 60),
            Frequency::Daily => Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Chat-completion endpoint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Full chat-completions URL.
    pub endpoint: String,
    /// Checked at run start; a missing key aborts the run.
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    /// Completion budget for the article rewrite.
    pub max_tokens: u32,
    /// Completion budget for the SEO title.
    pub title_max_tokens: u32,
    /// Per-request timeout for chat calls.
    pub timeout: Duration,
}

/// Scraping behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapingConfig {
    /// Gates the scheduled trigger only; manual runs ignore it.
    pub enabled: bool,
    /// Successful rewrites after which a run stops.
    pub limit: u32,
    pub frequency: Frequency,
    /// Pause between candidates that hit the target site.
    pub delay: Duration,
    /// Fetch inconclusive URLs to look for article markers.
    pub probe_unclassified: bool,
    pub page_timeout: Duration,
    pub probe_timeout: Duration,
    pub user_agent: String,
}

/// Post creation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PostConfig {
    /// Publish right after a successful rewrite.
    pub auto_publish: bool,
    /// Ask the chat API for an SEO title as well.
    pub rewrite_title: bool,
    pub status: PostStatus,
    pub author: u64,
    pub category: Option<u64>,
    /// Root directory of the file post sink.
    pub output_dir: String,
}

/// Resolved, immutable configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub target_url: Url,
    /// Label stored on every article.
    pub source: String,
    pub api: ApiConfig,
    pub scraping: ScrapingConfig,
    pub post: PostConfig,
    /// JSON file backing the article store.
    pub store_path: String,
}

impl Config {
    /// Host of the target URL; article links must live on it.
    pub fn target_domain(&self) -> &str {
        self.target_url.host_str().unwrap_or_default()
    }

    /// The API key, or the configuration error that aborts a run.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

/// On-disk shape; everything optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub target_url: Option<String>,
    pub source: Option<String>,
    pub api: FileApi,
    pub scraping: FileScraping,
    pub post: FilePost,
    pub store: FileStore,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileApi {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub title_max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileScraping {
    pub enabled: Option<bool>,
    pub limit: Option<u32>,
    pub frequency: Option<Frequency>,
    pub delay_secs: Option<u64>,
    pub probe_unclassified: Option<bool>,
    pub page_timeout_secs: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilePost {
    pub auto_publish: Option<bool>,
    pub rewrite_title: Option<bool>,
    pub status: Option<PostStatus>,
    pub author: Option<u64>,
    pub category: Option<u64>,
    pub output_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileStore {
    pub path: Option<String>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub target_url: Option<String>,
    pub api_key: Option<String>,
    pub limit: Option<u32>,
}

impl FileConfig {
    /// Read a YAML config file. A missing file yields all defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_yaml(&raw, &display),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: display,
                source,
            }),
        }
    }

    pub fn from_yaml(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Apply overrides and defaults, then validate.
    pub fn resolve(self, overrides: Overrides) -> Result<Config, ConfigError> {
        let raw_target = overrides
            .target_url
            .or(self.target_url)
            .unwrap_or_else(|| DEFAULT_TARGET_URL.to_string());
        if raw_target.trim().is_empty() {
            return Err(ConfigError::MissingTargetUrl);
        }
        let target_url =
            Url::parse(raw_target.trim()).map_err(|e| ConfigError::InvalidTargetUrl {
                url: raw_target.clone(),
                reason: e.to_string(),
            })?;
        let host = match target_url.host_str() {
            Some(h) => h.to_string(),
            None => {
                return Err(ConfigError::InvalidTargetUrl {
                    url: raw_target,
                    reason: "no host".to_string(),
                });
            }
        };

        let model = self.api.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }

        let limit = overrides.limit.or(self.scraping.limit).unwrap_or(5);
        if !(1..=50).contains(&limit) {
            return Err(ConfigError::LimitOutOfRange(limit));
        }

        let source = self
            .source
            .unwrap_or_else(|| host.trim_start_matches("www.").to_string());

        Ok(Config {
            target_url,
            source,
            api: ApiConfig {
                endpoint: self
                    .api
                    .endpoint
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                api_key: overrides.api_key.or(self.api.api_key),
                model,
                temperature: self.api.temperature.unwrap_or(0.7),
                max_tokens: self.api.max_tokens.unwrap_or(4000),
                title_max_tokens: self.api.title_max_tokens.unwrap_or(100),
                timeout: Duration::from_secs(self.api.timeout_secs.unwrap_or(60)),
            },
            scraping: ScrapingConfig {
                enabled: self.scraping.enabled.unwrap_or(false),
                limit,
                frequency: self.scraping.frequency.unwrap_or_default(),
                delay: Duration::from_secs(self.scraping.delay_secs.unwrap_or(3)),
                probe_unclassified: self.scraping.probe_unclassified.unwrap_or(true),
                page_timeout: Duration::from_secs(self.scraping.page_timeout_secs.unwrap_or(30)),
                probe_timeout: Duration::from_secs(
                    self.scraping.probe_timeout_secs.unwrap_or(10),
                ),
                user_agent: self
                    .scraping
                    .user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
            post: PostConfig {
                auto_publish: self.post.auto_publish.unwrap_or(false),
                rewrite_title: self.post.rewrite_title.unwrap_or(false),
                status: self.post.status.unwrap_or_default(),
                author: self.post.author.unwrap_or(1),
                category: self.post.category,
                output_dir: self
                    .post
                    .output_dir
                    .unwrap_or_else(|| "./posts".to_string()),
            },
            store_path: self
                .store
                .path
                .unwrap_or_else(|| "./data/articles.json".to_string()),
        })
    }
}
