//! Declarative site profile and its compiled form.

use regex::Regex;
use scraper::Selector;
use tracing::warn;
use url::Url;

/// A selector paired with what it is meant to find; the purpose shows up in logs.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub selector: &'static str,
    pub purpose: &'static str,
}

/// Where a title selector reads its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleValue {
    Text,
    Attr(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct TitleRule {
    pub selector: &'static str,
    pub value: TitleValue,
}

/// Everything site-specific, as ordered tables. Order matters: earlier
/// entries are more specific and win.
#[derive(Debug)]
pub struct SiteProfile {
    /// Link selectors for listing pages, most specific first.
    pub listing: &'static [Rule],
    /// Substrings that disqualify a URL outright.
    pub excluded: &'static [&'static str],
    /// Substrings that suggest an article URL.
    pub article_keywords: &'static [&'static str],
    /// Regexes that suggest an article URL (date paths, numeric ids).
    pub article_patterns: &'static [&'static str],
    /// Strings whose presence in a page's HTML marks it as an article.
    pub detail_markers: &'static [&'static str],
    /// Title selectors, most specific first.
    pub titles: &'static [TitleRule],
    /// Article body containers, most specific first.
    pub containers: &'static [Rule],
    /// Descendants removed from a matched container.
    pub unwanted: &'static [&'static str],
    /// Page furniture removed before the paragraph fallback.
    pub chrome: &'static [&'static str],
}

/// A [`SiteProfile`] compiled and bound to a concrete origin.
#[derive(Debug)]
pub struct Site {
    pub profile: &'static SiteProfile,
    domain: String,
    origin: Url,
    pub(crate) listing: Vec<(Selector, Rule)>,
    pub(crate) titles: Vec<(Selector, TitleRule)>,
    pub(crate) containers: Vec<(Selector, Rule)>,
    pub(crate) unwanted: Vec<Selector>,
    pub(crate) chrome: Vec<Selector>,
    article_patterns: Vec<Regex>,
}

impl Site {
    /// Compile `profile` for the site hosting `target`.
    pub fn new(profile: &'static SiteProfile, target: &Url) -> Self {
        let mut origin = target.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        Self {
            profile,
            domain: bare_host(target.host_str().unwrap_or_default()).to_string(),
            origin,
            listing: compile_rules(profile.listing),
            titles: profile
                .titles
                .iter()
                .filter_map(|r| parse_selector(r.selector).map(|s| (s, *r)))
                .collect(),
            containers: compile_rules(profile.containers),
            unwanted: profile.unwanted.iter().filter_map(|s| parse_selector(s)).collect(),
            chrome: profile.chrome.iter().filter_map(|s| parse_selector(s)).collect(),
            article_patterns: profile
                .article_patterns
                .iter()
                .filter_map(|p| match Regex::new(p) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(pattern = %p, error = %e, "Skipping invalid article pattern");
                        None
                    }
                })
                .collect(),
        }
    }

    /// Registrable host the site lives on, without a leading `www.`.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Resolve an href against the site origin.
    pub fn absolutize(&self, href: &str) -> Option<Url> {
        self.origin.join(href.trim()).ok()
    }

    /// Whether `url` is served by the site or one of its subdomains.
    pub fn is_on_domain(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => {
                let host = bare_host(host);
                host == self.domain
                    || host
                        .strip_suffix(self.domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            None => false,
        }
    }

    /// First exclusion substring found in `url`, if any.
    pub fn excluded_by(&self, url: &str) -> Option<&'static str> {
        let lower = url.to_lowercase();
        self.profile
            .excluded
            .iter()
            .copied()
            .find(|fragment| lower.contains(fragment))
    }

    /// First URL regex matching `url`.
    pub fn matching_pattern(&self, url: &str) -> Option<&str> {
        self.article_patterns
            .iter()
            .find(|re| re.is_match(url))
            .map(Regex::as_str)
    }

    /// First article keyword contained in `url`.
    pub fn matching_keyword(&self, url: &str) -> Option<&'static str> {
        let lower = url.to_lowercase();
        self.profile
            .article_keywords
            .iter()
            .copied()
            .find(|k| lower.contains(k))
    }

    /// Cheap "looks like an article" check shared by listing and classification.
    pub fn looks_like_article(&self, url: &str) -> bool {
        self.matching_pattern(url).is_some() || self.matching_keyword(url).is_some()
    }
}

fn bare_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn parse_selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(selector = %raw, error = %e, "Skipping invalid selector");
            None
        }
    }
}

fn compile_rules(rules: &'static [Rule]) -> Vec<(Selector, Rule)> {
    rules
        .iter()
        .filter_map(|r| parse_selector(r.selector).map(|s| (s, *r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::cafef::CAFEF;

    fn site() -> Site {
        Site::new(&CAFEF, &Url::parse("https://cafef.vn/thi-truong-chung-khoan.chn").unwrap())
    }

    #[test]
    fn test_every_table_entry_compiles() {
        let site = site();
        assert_eq!(site.listing.len(), CAFEF.listing.len());
        assert_eq!(site.titles.len(), CAFEF.titles.len());
        assert_eq!(site.containers.len(), CAFEF.containers.len());
        assert_eq!(site.unwanted.len(), CAFEF.unwanted.len());
        assert_eq!(site.chrome.len(), CAFEF.chrome.len());
        assert_eq!(site.article_patterns.len(), CAFEF.article_patterns.len());
    }

    #[test]
    fn test_absolutize_uses_origin() {
        let site = site();
        assert_eq!(
            site.absolutize("/abc-188250506.chn").unwrap().as_str(),
            "https://cafef.vn/abc-188250506.chn"
        );
        assert_eq!(
            site.absolutize("abc.chn").unwrap().as_str(),
            "https://cafef.vn/abc.chn"
        );
        assert_eq!(
            site.absolutize("https://other.vn/x").unwrap().as_str(),
            "https://other.vn/x"
        );
    }

    #[test]
    fn test_domain_matching() {
        let site = site();
        let on = |u: &str| site.is_on_domain(&Url::parse(u).unwrap());
        assert!(on("https://cafef.vn/a.chn"));
        assert!(on("https://www.cafef.vn/a.chn"));
        assert!(on("https://s.cafef.vn/a.chn"));
        assert!(!on("https://notcafef.vn/a.chn"));
        assert!(!on("https://facebook.com/cafef.vn"));
    }

    #[test]
    fn test_www_target_matches_bare_links() {
        let site = Site::new(&CAFEF, &Url::parse("https://www.cafef.vn/").unwrap());
        assert_eq!(site.domain(), "cafef.vn");
        assert!(site.is_on_domain(&Url::parse("https://cafef.vn/a.chn").unwrap()));
    }
}
