//! Article page → title and body HTML.
//!
//! The title comes from the first selector in the title cascade that yields
//! non-empty text. The body comes from the first container in the container
//! cascade that still has text once ads, widgets and scripts are cut out of
//! it. When no container matches, long paragraphs are gathered from the page
//! body instead.

use super::Site;
use super::site::TitleValue;
use crate::models::ExtractedArticle;
use crate::utils::{char_len, collapse_whitespace, escape_html, plain_text};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};

/// Paragraphs at or below this many characters are ignored by the fallback.
pub const MIN_FALLBACK_PARAGRAPH: usize = 100;

/// Extract title and body. `None` means nothing usable was found.
#[instrument(level = "info", skip_all)]
pub fn extract_article(html: &str, site: &Site) -> Option<ExtractedArticle> {
    let document = Html::parse_document(html);

    let Some(title) = resolve_title(&document, site) else {
        info!("No title found");
        return None;
    };

    let content = resolve_content(&document, site).or_else(|| {
        debug!("No content container matched; trying paragraph fallback");
        paragraph_fallback(html, site)
    });
    let Some(content) = content else {
        info!(%title, "No content found");
        return None;
    };

    info!(%title, bytes = content.len(), "Extracted article");
    Some(ExtractedArticle { title, content })
}

/// First non-empty title from the title cascade.
pub fn resolve_title(document: &Html, site: &Site) -> Option<String> {
    for (selector, rule) in &site.titles {
        let Some(element) = document.select(selector).next() else {
            continue;
        };
        let title = match rule.value {
            TitleValue::Text => collapse_whitespace(&element.text().collect::<String>()),
            TitleValue::Attr(name) => element
                .value()
                .attr(name)
                .map(collapse_whitespace)
                .unwrap_or_default(),
        };
        if !title.is_empty() {
            debug!(selector = rule.selector, %title, "Title found");
            return Some(title);
        }
    }
    None
}

/// Body HTML from the first container that keeps some text after cleanup.
pub fn resolve_content(document: &Html, site: &Site) -> Option<String> {
    for (selector, rule) in &site.containers {
        let Some(container) = document.select(selector).next() else {
            continue;
        };
        let body = strip_unwanted(container, &site.unwanted);
        if plain_text(&body).is_empty() {
            debug!(selector = rule.selector, "Container empty after cleanup");
            continue;
        }
        debug!(selector = rule.selector, purpose = rule.purpose, "Content container found");
        return Some(body.trim().to_string());
    }
    None
}

/// Serialize `container` without any descendant matching `unwanted`.
fn strip_unwanted(container: ElementRef<'_>, unwanted: &[Selector]) -> String {
    let mut fragment = Html::parse_fragment(&container.html());
    let top = fragment
        .root_element()
        .children()
        .find_map(ElementRef::wrap)
        .map(|e| e.id());

    let doomed: Vec<_> = unwanted
        .iter()
        .flat_map(|selector| fragment.select(selector).map(|e| e.id()).collect::<Vec<_>>())
        .filter(|id| Some(*id) != top)
        .collect();
    let removed = doomed.len();
    for id in doomed {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }
    if removed > 0 {
        debug!(removed, "Removed unwanted blocks");
    }
    fragment.root_element().inner_html()
}

/// Concatenate long paragraphs from the page body, skipping page chrome.
pub fn paragraph_fallback(html: &str, site: &Site) -> Option<String> {
    let mut document = Html::parse_document(html);
    let chrome: Vec<_> = site
        .chrome
        .iter()
        .flat_map(|selector| document.select(selector).map(|e| e.id()).collect::<Vec<_>>())
        .collect();
    for id in chrome {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    let paragraph = Selector::parse("body p").ok()?;
    let content: String = document
        .select(&paragraph)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|text| char_len(text) > MIN_FALLBACK_PARAGRAPH)
        .map(|text| format!("<p>{}</p>", escape_html(&text)))
        .collect();

    if content.is_empty() {
        None
    } else {
        debug!(bytes = content.len(), "Content assembled from long paragraphs");
        Some(content)
    }
}
