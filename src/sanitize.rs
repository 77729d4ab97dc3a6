//! Content sanitizer.
//!
//! Strips executable and embedded blocks, presentation and tracking
//! attributes, and redundant whitespace from extracted article HTML. The
//! passes are repeated until the output stops changing, so
//! `clean(clean(x)) == clean(x)` holds even for inputs where one removal
//! exposes another (e.g. `<scr<script></script>ipt>`).

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Elements removed together with everything inside them.
const BLOCK_TAGS: &[&str] = &["script", "style", "iframe", "object", "embed", "noscript"];

static BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    BLOCK_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("block regex")
        })
        .collect()
});

/// Unpaired opening, closing or self-closing embed tags left after block removal.
static STRAY_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:script|style|iframe|object|embed|noscript)\b[^>]*>")
        .expect("stray tag regex")
});

static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Za-z][A-Za-z0-9]*\b[^<>]*>").expect("open tag regex"));

static DROPPED_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\s+(?:id|class|style|on[a-z]+|data-[a-z0-9_\-]*)\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+)"#,
    )
    .expect("attribute regex")
});

static LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:<br\s*/?>\s*)+").expect("line break regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Sanitize article HTML.
///
/// Removal passes run until nothing more matches; every pass that changes
/// its input makes it shorter, so the loop ends. Whitespace and line breaks
/// are normalized once afterwards, which cannot expose anything new to remove.
pub fn clean(html: &str) -> String {
    let mut current = html.to_string();
    let mut passes = 1usize;
    loop {
        let next = strip_once(&current);
        if next.len() == current.len() {
            break;
        }
        current = next;
        passes += 1;
    }
    let out = normalize(&current);
    debug!(passes, before = html.len(), after = out.len(), "Sanitized content");
    out
}

/// One round of removals. Only ever deletes text.
fn strip_once(html: &str) -> String {
    let mut out = html.to_string();
    for block in BLOCKS.iter() {
        out = block.replace_all(&out, "").into_owned();
    }
    out = STRAY_TAGS.replace_all(&out, "").into_owned();
    OPEN_TAG
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            DROPPED_ATTR.replace_all(&caps[0], "").into_owned()
        })
        .into_owned()
}

fn normalize(html: &str) -> String {
    let out = WHITESPACE.replace_all(html, " ");
    let out = LINE_BREAKS.replace_all(&out, "<br />");
    out.trim().to_string()
}
