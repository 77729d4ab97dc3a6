//! Selector and pattern tables for [CafeF](https://cafef.vn), a Vietnamese
//! market news site.
//!
//! # URL Pattern
//!
//! Articles live at the site root with a slug and a numeric id, e.g.
//! `https://cafef.vn/vn-index-tang-manh-188250506083015.chn`. Category pages
//! use the same `.chn` extension without the id, which is why the listing
//! filter also relies on anchor text length and the validator downstream.

use super::site::{Rule, SiteProfile, TitleRule, TitleValue};

pub static CAFEF: SiteProfile = SiteProfile {
    listing: &[
        Rule { selector: r#"div[class*="box-content"] a[class*="title"]"#, purpose: "box headline" },
        Rule { selector: r#"h3[class*="title"] > a"#, purpose: "h3 headline" },
        Rule { selector: r#"h2[class*="title"] > a"#, purpose: "h2 headline" },
        Rule { selector: r#"h1[class*="title"] > a"#, purpose: "h1 headline" },
        Rule { selector: r#"div[class*="list-news"] a[title]"#, purpose: "news list" },
        Rule { selector: r#"div[class*="left-content"] a[title]"#, purpose: "main column" },
        Rule { selector: r#"h2[class*="news-item-title"] > a"#, purpose: "news item h2" },
        Rule { selector: r#"h3[class*="news-item-title"] > a"#, purpose: "news item h3" },
        Rule { selector: r#"div[class*="tlitem"] a[class*="title"]"#, purpose: "timeline item" },
        Rule { selector: r#"div[class*="knswli-right"] a"#, purpose: "stream item" },
        Rule { selector: r#"ul[class*="list-news"] a"#, purpose: "news list (ul)" },
        Rule { selector: r#"div[class*="top-content"] a[title]"#, purpose: "top stories" },
        Rule { selector: r#"div[class*="featured"] a[title]"#, purpose: "featured" },
        Rule { selector: r#"div[class*="main-story"] a"#, purpose: "main story" },
        Rule { selector: r#"div[class*="item"] a[class*="title"]"#, purpose: "generic item" },
        Rule { selector: r#"div[class*="box-category"] a[title]"#, purpose: "category box" },
        Rule { selector: "a[title]", purpose: "any titled link" },
        Rule { selector: r#"a[href*=".chn"]"#, purpose: "any .chn link" },
    ],
    excluded: &[
        "/trang-chu",
        "/lien-he",
        "/quang-cao",
        "/sitemap",
        "/rss",
        "/tim-kiem",
        "/ajax/",
        "/api/",
        "/tag/",
        "/tags/",
        "/search/",
        "/login/",
        "/register/",
        "/dang-nhap",
        "/dang-ky",
        ".jpg",
        ".png",
        ".gif",
        ".mp4",
        ".pdf",
        "facebook.com",
        "google.com",
        "twitter.com",
        "javascript:",
        "mailto:",
        "#",
    ],
    article_keywords: &[
        "tin-tuc",
        "bai-viet",
        "news",
        "article",
        "-nd-",
        "-id",
        ".html",
        ".chn",
    ],
    article_patterns: &[
        r"/\d{4}/\d{1,2}/\d{1,2}/",
        r"-\d+\.chn",
        r"-\d+\.html",
        r"/tin-tuc/",
        r"/bai-viet/",
        r"/news/",
        r"/article/",
        r"[a-z0-9-]{10,}\.chn",
        r"[a-z0-9-]{10,}\.html",
    ],
    detail_markers: &[
        "detail-content",
        "detail-content-news",
        "article-body",
        "article_content",
        "news-content",
        "mainContent",
        r#"property="og:type" content="article""#,
    ],
    titles: &[
        TitleRule { selector: r#"h1[class*="title"]"#, value: TitleValue::Text },
        TitleRule { selector: r#"h1[class*="article-title"]"#, value: TitleValue::Text },
        TitleRule { selector: r#"h1[class*="article_title"]"#, value: TitleValue::Text },
        TitleRule { selector: r#"h1[class*="news-title"]"#, value: TitleValue::Text },
        TitleRule { selector: r#"h1[class*="post-title"]"#, value: TitleValue::Text },
        TitleRule { selector: "h1", value: TitleValue::Text },
        TitleRule { selector: r#"meta[property="og:title"]"#, value: TitleValue::Attr("content") },
        TitleRule { selector: "title", value: TitleValue::Text },
    ],
    containers: &[
        Rule { selector: r#"div[class*="detail-content"]"#, purpose: "detail body" },
        Rule { selector: r#"div[class*="article-body"]"#, purpose: "article body" },
        Rule { selector: r#"div[class*="article_content"]"#, purpose: "article content" },
        Rule { selector: r#"div[class*="news-content"]"#, purpose: "news content" },
        Rule { selector: r#"div[class*="detail-content-news"]"#, purpose: "detail news body" },
        Rule { selector: r#"div[id="mainContent"]"#, purpose: "main content id" },
        Rule { selector: "article", purpose: "article element" },
        Rule { selector: r#"div[class*="content"]"#, purpose: "any content block" },
    ],
    unwanted: &[
        "script",
        "style",
        "iframe",
        "noscript",
        r#"div[class*="banner"]"#,
        r#"div[class*="advertisement"]"#,
        r#"div[class*="related"]"#,
        r#"div[class*="comment"]"#,
        r#"div[class*="social"]"#,
        r#"div[class*="share"]"#,
        r#"div[class*="author"]"#,
        r#"div[class*="tags"]"#,
        r#"div[class*="recommendation"]"#,
    ],
    chrome: &["header", "footer", "nav", "aside", "script", "style", "iframe"],
};
