//! Publish sink: turns a rewritten article into a post.
//!
//! [`FilePostSink`] writes each post as an HTML file with YAML front matter
//! and appends a line to a Markdown index so the output directory can be
//! browsed or picked up by a static site generator.
//!
//! ```text
//! output_dir/
//! ├── index.md                     # one "- [title](2025-05-06/slug.html) (draft)" per post
//! └── 2025-05-06/
//!     ├── vn-index-vượt-1300-điểm.html
//!     └── vn-index-vượt-1300-điểm-2.html
//! ```

use crate::config::PostStatus;
use crate::error::PublishError;
use crate::models::PostRef;
use crate::utils::{byte_prefix, slugify_title};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

/// Slug bytes allowed in a file name. Leaves room for a `-N` suffix and the
/// extension under the common 255-byte file-name limit.
const MAX_SLUG_BYTES: usize = 200;

/// File-name slug for `title`, cut at a word boundary to [`MAX_SLUG_BYTES`].
fn file_slug(title: &str) -> String {
    let slug = slugify_title(title);
    if slug.is_empty() {
        return "post".to_string();
    }
    let head = byte_prefix(&slug, MAX_SLUG_BYTES);
    if head.len() == slug.len() || slug[head.len()..].starts_with('-') {
        return head.trim_end_matches('-').to_string();
    }
    match head.rfind('-') {
        Some(i) if i > 0 => head[..i].to_string(),
        _ => head.to_string(),
    }
}

/// Everything needed to create a post.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    /// SEO title when one was generated, otherwise the original title.
    pub title: String,
    /// Rewritten article body.
    pub html: String,
    pub status: PostStatus,
    /// Author id recorded on the post.
    pub author: u64,
    /// Category id, if posts are filed under one.
    pub category: Option<u64>,
}

/// Destination for finished articles.
pub trait PublishSink {
    /// Create a post from a rewritten article.
    ///
    /// # Arguments
    ///
    /// * `post` - Title, body and post metadata
    ///
    /// # Returns
    ///
    /// A reference to the created post, stored on the article as its
    /// published reference.
    async fn create_post(&self, post: &NewPost) -> Result<PostRef, PublishError>;
}

#[derive(Debug, Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    status: PostStatus,
    author: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<u64>,
    date: DateTime<Utc>,
}

/// Sink writing posts below a directory.
#[derive(Debug, Clone)]
pub struct FilePostSink {
    root: PathBuf,
}

impl FilePostSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First free `{slug}.html`, `{slug}-2.html`, ... in `dir`.
    async fn free_name(dir: &Path, slug: &str) -> Result<String, PublishError> {
        let mut n = 1usize;
        loop {
            let name = if n == 1 {
                format!("{slug}.html")
            } else {
                format!("{slug}-{n}.html")
            };
            if !fs::try_exists(dir.join(&name)).await? {
                return Ok(name);
            }
            n += 1;
        }
    }

    async fn append_index(&self, title: &str, rel: &str, status: PostStatus) -> Result<(), PublishError> {
        let mut index = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join("index.md"))
            .await?;
        index
            .write_all(format!("- [{title}]({rel}) ({})\n", status.as_str()).as_bytes())
            .await?;
        Ok(())
    }
}

impl PublishSink for FilePostSink {
    #[instrument(level = "info", skip_all, fields(title = %post.title, status = post.status.as_str()))]
    async fn create_post(&self, post: &NewPost) -> Result<PostRef, PublishError> {
        if post.title.trim().is_empty() {
            return Err(PublishError::Rejected("post title is empty".to_string()));
        }
        if post.html.trim().is_empty() {
            return Err(PublishError::Rejected("post content is empty".to_string()));
        }

        let now = Utc::now();
        let day = now.format("%Y-%m-%d").to_string();
        let dir = self.root.join(&day);
        fs::create_dir_all(&dir).await?;

        let slug = file_slug(&post.title);
        let name = Self::free_name(&dir, &slug).await?;

        let front = serde_yaml::to_string(&FrontMatter {
            title: &post.title,
            status: post.status,
            author: post.author,
            category: post.category,
            date: now,
        })?;
        let doc = format!("---\n{front}---\n{}\n", post.html.trim());
        fs::write(dir.join(&name), doc).await?;

        let rel = format!("{day}/{name}");
        self.append_index(&post.title, &rel, post.status).await?;
        info!(post = %rel, "Created post");
        Ok(PostRef(rel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn post(title: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            html: "<h2>Tổng quan</h2><p>Thị trường tăng.</p>".to_string(),
            status: PostStatus::Draft,
            author: 1,
            category: Some(4),
        }
    }

    #[tokio::test]
    async fn test_writes_post_with_front_matter() {
        let dir = tempdir().unwrap();
        let sink = FilePostSink::new(dir.path());
        let post_ref = sink.create_post(&post("VN-Index vượt 1.300 điểm")).await.unwrap();

        assert!(post_ref.0.ends_with("/vn-index-vượt-1300-điểm.html"));
        let written = std::fs::read_to_string(sink.root().join(&post_ref.0)).unwrap();
        assert!(written.starts_with("---\ntitle: "));
        assert!(written.contains("\nstatus: draft\nauthor: 1\ncategory: 4\ndate: "));
        assert!(written.contains("---\n<h2>Tổng quan</h2><p>Thị trường tăng.</p>\n"));

        let index = std::fs::read_to_string(dir.path().join("index.md")).unwrap();
        assert_eq!(index, format!("- [VN-Index vượt 1.300 điểm]({}) (draft)\n", post_ref.0));
    }

    #[tokio::test]
    async fn test_same_title_gets_distinct_files() {
        let dir = tempdir().unwrap();
        let sink = FilePostSink::new(dir.path());
        let a = sink.create_post(&post("Cổ phiếu ngân hàng")).await.unwrap();
        let b = sink.create_post(&post("Cổ phiếu ngân hàng")).await.unwrap();
        assert_ne!(a, b);
        assert!(b.0.ends_with("-2.html"));
        let index = std::fs::read_to_string(dir.path().join("index.md")).unwrap();
        assert_eq!(index.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_rejects_empty_content() {
        let dir = tempdir().unwrap();
        let sink = FilePostSink::new(dir.path());
        let mut p = post("Tiêu đề");
        p.html = "  ".to_string();
        assert!(matches!(
            sink.create_post(&p).await,
            Err(PublishError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_long_vietnamese_title_fits_file_name_limit() {
        let dir = tempdir().unwrap();
        let sink = FilePostSink::new(dir.path());
        let long: String = "Nhiều cổ phiếu giảm sâu, khối ngoại bán ròng mạnh "
            .repeat(5)
            .chars()
            .take(200)
            .collect();
        let title = long.trim().to_string();
        assert!(slugify_title(&title).len() > 255);

        let first = sink.create_post(&post(&title)).await.unwrap();
        let second = sink.create_post(&post(&title)).await.unwrap();
        for post_ref in [&first, &second] {
            let name = post_ref.0.rsplit('/').next().unwrap();
            assert!(name.len() <= 255, "{} bytes", name.len());
            assert!(name.starts_with("nhiều-cổ-phiếu-giảm-sâu"));
            assert!(!name.contains("--"));
        }
        assert!(second.0.ends_with("-2.html"));
    }

    #[test]
    fn test_file_slug_cuts_on_word_boundary() {
        assert_eq!(file_slug("Tin nhanh"), "tin-nhanh");
        assert_eq!(file_slug("!!!"), "post");
        let slug = file_slug(&"ngân hàng ".repeat(40));
        assert!(slug.len() <= MAX_SLUG_BYTES);
        let last = slug.rsplit('-').next().unwrap();
        assert!(last == "ngân" || last == "hàng", "{slug}");
    }
}
