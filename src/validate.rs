//! Article validator.
//!
//! Rules run cheapest first and the first failing rule rejects:
//!
//! 1. empty title or content
//! 2. title length outside bounds
//! 3. plain-text content too short
//! 4. no HTML markup at all
//! 5. too few paragraphs *and* too few line breaks
//! 6. too many distinct advertising keywords
//! 7. more links than the text can carry
//!
//! Lengths are counted in characters, never bytes.

use crate::error::Rejection;
use crate::utils::{char_len, plain_text};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Phrases typical of advertorials and gated pages, matched on lowercased text.
pub const SPAM_KEYWORDS: &[&str] = &[
    "quảng cáo",
    "liên hệ mua hàng",
    "hotline:",
    "mua ngay",
    "đặt hàng",
    "giảm giá",
    "khuyến mãi",
    "sale off",
    "đăng nhập",
    "đăng ký ngay",
    "login",
    "sign up",
];

static ANY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*\b[^<>]*>").expect("tag regex"));
static PARAGRAPH_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</p\s*>").expect("paragraph regex"));
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\b").expect("line break regex"));
static ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<a\b[^>]*>").expect("anchor regex"));

/// Tunable thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    pub min_title_chars: usize,
    pub max_title_chars: usize,
    pub min_content_chars: usize,
    pub min_paragraphs: usize,
    pub min_line_breaks: usize,
    /// Distinct spam keywords at which content is rejected.
    pub spam_threshold: usize,
    /// At most one link per this many characters of text.
    pub chars_per_link: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_title_chars: 10,
            max_title_chars: 200,
            min_content_chars: 200,
            min_paragraphs: 2,
            min_line_breaks: 3,
            spam_threshold: 3,
            chars_per_link: 100,
        }
    }
}

impl ValidationRules {
    /// Check an article, naming the first rule it fails.
    pub fn check(&self, title: &str, content: &str) -> Result<(), Rejection> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Rejection::EmptyTitle);
        }
        if content.trim().is_empty() {
            return Err(Rejection::EmptyContent);
        }

        let title_len = char_len(title);
        if title_len < self.min_title_chars || title_len > self.max_title_chars {
            return Err(Rejection::TitleLength {
                len: title_len,
                min: self.min_title_chars,
                max: self.max_title_chars,
            });
        }

        let text = plain_text(content);
        let text_len = char_len(&text);
        if text_len < self.min_content_chars {
            return Err(Rejection::ContentTooShort {
                len: text_len,
                min: self.min_content_chars,
            });
        }

        if !ANY_TAG.is_match(content) {
            return Err(Rejection::NotHtml);
        }

        let paragraphs = PARAGRAPH_END.find_iter(content).count();
        if paragraphs < self.min_paragraphs {
            let line_breaks =
                content.matches('\n').count() + LINE_BREAK.find_iter(content).count();
            debug!(paragraphs, line_breaks, "Few paragraphs; checking line breaks");
            if line_breaks < self.min_line_breaks {
                return Err(Rejection::Unstructured {
                    paragraphs,
                    line_breaks,
                });
            }
        }

        let lower = text.to_lowercase();
        let hits = SPAM_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
        if hits >= self.spam_threshold {
            return Err(Rejection::Spam { hits });
        }

        let links = ANCHOR.find_iter(content).count();
        if links * self.chars_per_link > text_len {
            return Err(Rejection::LinkDensity { links, text_len });
        }

        // Markup-heavy bodies are only worth a warning.
        let ratio = text.len() as f64 / content.len() as f64;
        if ratio < 0.2 {
            warn!(ratio, "Low text to HTML ratio");
        }
        Ok(())
    }
}
