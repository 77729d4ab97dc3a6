//! Is this URL an article page?
//!
//! Two tiers: a pure check over the URL itself, and, only when that is
//! inconclusive, a short fetch that looks for article-body markers in the HTML.

use super::Site;
use crate::fetch::HtmlFetcher;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Outcome of the URL-only check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlVerdict {
    Article { reason: String },
    NotArticle { reason: String },
    Inconclusive,
}

/// Classify `url` from its shape alone.
///
/// Domain and exclusion checks run first, so an excluded URL is never an
/// article no matter which article patterns it also matches.
pub fn classify_url(url: &str, site: &Site) -> UrlVerdict {
    let not = |reason: String| UrlVerdict::NotArticle { reason };

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return not(format!("unparsable: {e}")),
    };
    if !site.is_on_domain(&parsed) {
        return not(format!("not on {}", site.domain()));
    }
    if let Some(fragment) = site.excluded_by(url) {
        return not(format!("excluded by '{fragment}'"));
    }
    if let Some(pattern) = site.matching_pattern(url) {
        return UrlVerdict::Article {
            reason: format!("pattern '{pattern}'"),
        };
    }
    if let Some(keyword) = site.matching_keyword(url) {
        return UrlVerdict::Article {
            reason: format!("keyword '{keyword}'"),
        };
    }
    let depth = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).count())
        .unwrap_or(0);
    if depth <= 1 {
        return not("shallow path, likely a section page".to_string());
    }
    UrlVerdict::Inconclusive
}

/// Whether any detail-container marker appears in `html`.
pub fn has_detail_markers(html: &str, site: &Site) -> Option<&'static str> {
    site.profile
        .detail_markers
        .iter()
        .copied()
        .find(|marker| html.contains(marker))
}

/// Optional live probe for inconclusive URLs.
#[derive(Debug, Clone, Copy)]
pub struct Probe<'a> {
    pub fetcher: &'a HtmlFetcher,
    pub timeout: Duration,
}

/// Full article-page decision, probing the page when the URL alone is inconclusive.
#[instrument(level = "debug", skip(site, probe))]
pub async fn is_article_page(url: &str, site: &Site, probe: Option<Probe<'_>>) -> bool {
    match classify_url(url, site) {
        UrlVerdict::Article { reason } => {
            debug!(%reason, "Article URL");
            true
        }
        UrlVerdict::NotArticle { reason } => {
            debug!(%reason, "Not an article URL");
            false
        }
        UrlVerdict::Inconclusive => {
            let Some(probe) = probe else {
                debug!("Inconclusive URL and probing disabled");
                return false;
            };
            match probe.fetcher.fetch(url, probe.timeout).await {
                Ok(page) => match has_detail_markers(&page.html, site) {
                    Some(marker) => {
                        debug!(marker, "Probe found article marker");
                        true
                    }
                    None => {
                        debug!("Probe found no article marker");
                        false
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Classification probe failed");
                    false
                }
            }
        }
    }
}
