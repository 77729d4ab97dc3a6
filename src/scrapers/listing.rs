//! Listing page → article candidates.
//!
//! All listing selectors are applied in order and their matches concatenated,
//! so a link found by a specific selector keeps its early position even when
//! the generic `a[title]` selector finds it again later. Each raw link then
//! goes through the filters below; the first occurrence of a URL wins.
//!
//! 1. empty or `#` hrefs are dropped
//! 2. hrefs are resolved against the site origin
//! 3. links off the target domain are dropped
//! 4. links containing an exclusion substring are dropped
//! 5. links must look like an article (keyword or URL pattern)
//! 6. anchor text must be a plausible headline length
//! 7. duplicate URLs are dropped

use super::Site;
use crate::models::ArticleCandidate;
use crate::utils::{char_len, collapse_whitespace};
use itertools::Itertools;
use scraper::Html;
use tracing::{debug, info, instrument};

/// Bounds on anchor text length; shorter or longer anchors are menu noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleBounds {
    pub min: usize,
    pub max: usize,
}

impl Default for TitleBounds {
    fn default() -> Self {
        Self { min: 5, max: 300 }
    }
}

/// A link as found in the DOM, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub href: String,
    pub title: String,
}

/// Apply the listing selector cascade, returning every usable link in match order.
pub fn collect_links(html: &str, site: &Site) -> Vec<RawLink> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for (selector, rule) in &site.listing {
        let mut matched = 0usize;
        for element in document.select(selector) {
            matched += 1;
            let Some(href) = element.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() || href == "#" {
                continue;
            }
            let mut title = collapse_whitespace(&element.text().collect::<String>());
            if title.is_empty() {
                title = element
                    .value()
                    .attr("title")
                    .map(collapse_whitespace)
                    .unwrap_or_default();
            }
            links.push(RawLink {
                href: href.to_string(),
                title,
            });
        }
        debug!(
            selector = rule.selector,
            purpose = rule.purpose,
            matched,
            "Listing selector"
        );
    }
    links
}

/// Turn a raw link into a candidate, or explain why not.
pub fn filter_link(link: &RawLink, site: &Site, bounds: TitleBounds) -> Result<ArticleCandidate, &'static str> {
    let url = site.absolutize(&link.href).ok_or("unresolvable href")?;
    if !site.is_on_domain(&url) {
        return Err("off-site");
    }
    let url = url.to_string();
    if site.excluded_by(&url).is_some() {
        return Err("excluded");
    }
    if !site.looks_like_article(&url) {
        return Err("not article-like");
    }
    let len = char_len(&link.title);
    if len < bounds.min || len > bounds.max {
        return Err("implausible title");
    }
    Ok(ArticleCandidate {
        url,
        title: link.title.clone(),
    })
}

/// Extract deduplicated article candidates from a listing page.
#[instrument(level = "info", skip_all, fields(domain = %site.domain()))]
pub fn extract_candidates(html: &str, site: &Site, bounds: TitleBounds) -> Vec<ArticleCandidate> {
    let links = collect_links(html, site);
    let raw_count = links.len();

    let candidates: Vec<ArticleCandidate> = links
        .iter()
        .filter_map(|link| match filter_link(link, site, bounds) {
            Ok(candidate) => Some(candidate),
            Err(reason) => {
                debug!(href = %link.href, reason, "Dropped listing link");
                None
            }
        })
        .unique_by(|c| c.url.clone())
        .collect();

    info!(raw = raw_count, candidates = candidates.len(), "Filtered listing links");
    for (i, c) in candidates.iter().take(5).enumerate() {
        debug!(index = i, url = %c.url, title = %c.title, "Candidate");
    }
    candidates
}
