//! Chat-completion client used to rewrite articles.
//!
//! # Architecture
//!
//! - [`AskAsync`]: one request/response round trip with a chat model
//! - [`ChatClient`]: the HTTP implementation (bearer auth, JSON body)
//! - [`RewriteClient`]: builds the rewrite and SEO-title prompts on top of any
//!   [`AskAsync`] implementation
//!
//! There is no retry. A failed call leaves the article pending; a later manual
//! rewrite re-attempts it.
//!
//! # Wire format
//!
//! ```text
//! POST {endpoint}
//! Authorization: Bearer {api_key}
//! {"model": .., "messages": [{"role": "system", ..}, {"role": "user", ..}],
//!  "temperature": .., "max_tokens": ..}
//! → {"choices": [{"message": {"content": ".."}}]}
//! ```

use crate::config::ApiConfig;
use crate::error::RewriteError;
use crate::utils::{char_prefix, plain_text, truncate_for_log};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Instruction sent with every body rewrite.
pub const REWRITE_SYSTEM_PROMPT: &str = "Bạn là chuyên gia biên tập nội dung với thế mạnh là viết lại các bài báo sao cho độc đáo, tối ưu SEO, cuốn hút người đọc. Giữ nguyên các thông tin cốt lõi nhưng đảm bảo nội dung hoàn toàn mới lạ. Hãy tuân thủ các hướng dẫn sau:
1. Giữ nguyên ý nghĩa và các thông tin quan trọng của bài gốc.
2. Cải thiện cấu trúc, trình bày logic và mạch lạc hơn.
3. Tăng tính dễ đọc, lôi cuốn, phù hợp với độc giả Việt Nam.
4. Sử dụng định dạng tối ưu SEO: có tiêu đề chính, phụ đề, đoạn văn ngắn, danh sách bullet khi cần thiết.
5. Duy trì định dạng HTML cho tiêu đề (h1, h2, h3...), đoạn văn (<p>), danh sách (<ul>, <li>), v.v.
6. Tuyệt đối không thêm chú thích, nguồn tham khảo, hoặc bất kỳ ghi chú nào không có trong bản gốc.
7. Đặc biệt, cuối bài viết, hãy đưa ra nhận định và khuyến nghị về các mã cổ phiếu đang hoặc sẽ chịu ảnh hưởng lớn từ nội dung bài viết, kèm theo phân tích ngắn gọn về lý do tác động.
";

/// Instruction sent with title-only rewrites.
pub const TITLE_SYSTEM_PROMPT: &str = "Bạn là chuyên gia SEO cho báo tài chính. Hãy viết lại tiêu đề bài báo sao cho hấp dẫn, chính xác và chuẩn SEO, dài từ 50 đến 60 ký tự. Chỉ trả về đúng một dòng tiêu đề, không dùng dấu ngoặc kép, không giải thích.";

/// Characters of article text given as context for a title rewrite.
const TITLE_SAMPLE_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// A chat-completion request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Trait for async chat-model interaction.
///
/// Implementors send a [`ChatRequest`] and return the assistant text.
pub trait AskAsync {
    async fn ask(&self, request: &ChatRequest) -> Result<String, RewriteError>;
}

/// HTTP chat-completion client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RewriteError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

impl AskAsync for ChatClient {
    #[instrument(level = "info", skip_all, fields(model = %request.model, max_tokens = request.max_tokens))]
    async fn ask(&self, request: &ChatRequest) -> Result<String, RewriteError> {
        let Some(api_key) = self.api_key.as_deref() else {
            error!("API key is not set");
            return Err(RewriteError::MissingCredential);
        };

        let t0 = Instant::now();
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "API request failed");
                RewriteError::Transport(e)
            })?;

        let status = resp.status();
        let body = resp.text().await?;
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                elapsed_ms,
                body = %truncate_for_log(&body, 500),
                "API answered with an error status"
            );
            return Err(RewriteError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 500),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, body = %truncate_for_log(&body, 500), "Invalid API response");
            RewriteError::MalformedResponse(e.to_string())
        })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                warn!(body = %truncate_for_log(&body, 500), "API response has no message content");
                RewriteError::MalformedResponse("missing choices[0].message.content".to_string())
            })?;

        info!(elapsed_ms, bytes = content.len(), "API call succeeded");
        Ok(content)
    }
}

/// Prompt builder for article and title rewrites.
#[derive(Debug, Clone)]
pub struct RewriteClient<A = ChatClient> {
    inner: A,
    model: String,
    temperature: f32,
    max_tokens: u32,
    title_max_tokens: u32,
}

impl RewriteClient<ChatClient> {
    /// HTTP-backed client from resolved settings.
    pub fn from_config(api: &ApiConfig) -> Result<Self, RewriteError> {
        let inner = ChatClient::new(api.endpoint.clone(), api.api_key.clone(), api.timeout)?;
        Ok(Self::new(inner, api))
    }
}

impl<A: AskAsync> RewriteClient<A> {
    pub fn new(inner: A, api: &ApiConfig) -> Self {
        Self {
            inner,
            model: api.model.clone(),
            temperature: api.temperature,
            max_tokens: api.max_tokens,
            title_max_tokens: api.title_max_tokens,
        }
    }

    /// Request body for a full article rewrite.
    pub fn rewrite_request(&self, title: &str, content: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(REWRITE_SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "Rewrite the following article about stock market. Title: {title}\n\nContent: {content}"
                )),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Request body for an SEO title rewrite.
    pub fn title_request(&self, title: &str, content_sample: &str) -> ChatRequest {
        let sample = plain_text(content_sample);
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(TITLE_SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "Tiêu đề gốc: {title}\n\nNội dung: {}",
                    char_prefix(&sample, TITLE_SAMPLE_CHARS)
                )),
            ],
            temperature: self.temperature,
            max_tokens: self.title_max_tokens,
        }
    }

    /// Rewrite an article body; the result is HTML.
    #[instrument(level = "info", skip_all, fields(title = %title))]
    pub async fn rewrite(&self, title: &str, content: &str) -> Result<String, RewriteError> {
        let raw = self.inner.ask(&self.rewrite_request(title, content)).await?;
        let html = strip_code_fence(&raw).to_string();
        if html.is_empty() {
            return Err(RewriteError::MalformedResponse("rewrite is empty".to_string()));
        }
        info!(bytes = html.len(), "Received rewritten content");
        Ok(html)
    }

    /// Produce a single-line SEO title.
    #[instrument(level = "info", skip_all, fields(title = %title))]
    pub async fn rewrite_title(
        &self,
        title: &str,
        content_sample: &str,
    ) -> Result<String, RewriteError> {
        let raw = self
            .inner
            .ask(&self.title_request(title, content_sample))
            .await?;
        let line = clean_title(&raw);
        if line.is_empty() {
            return Err(RewriteError::MalformedResponse("title is empty".to_string()));
        }
        info!(seo_title = %line, "Received SEO title");
        Ok(line)
    }
}

/// Drop a surrounding Markdown code fence such as ```` ```html ````.
fn strip_code_fence(s: &str) -> &str {
    let trimmed = s.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.split_once('\n') {
        Some((lang, inner)) if !lang.contains('<') => inner.trim(),
        _ => body.trim(),
    }
}

/// First non-empty line with surrounding quote characters removed.
fn clean_title(raw: &str) -> String {
    const QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’', '«', '»', '`'];
    raw.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.trim_matches(QUOTES).trim().to_string())
        .unwrap_or_default()
}
