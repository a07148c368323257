use crate::retry::with_retry;
use crate::types::{DigestError, Result, RetryOptions, ScrapedArticle};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

const REELS_MARKER: &str = "릴스 대본";
const CARD_NEWS_MARKER: &str = "카드 뉴스";
const BLOG_MARKER: &str = "블로그 포스팅";

/// Anything that turns a prompt into generated text.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    fn adapter_name(&self) -> String;

    async fn generate_content(&self, prompt: &str) -> Result<String>;
}

/// The supported providers, chosen once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    Claude { api_key: String, model: String },
    OpenAi { api_key: String, model: String },
    Gemini { api_key: String, model: String },
}

/// Provider name as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Claude,
    OpenAi,
    Gemini,
}

impl FromStr for ProviderKind {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(Self::Claude),
            "openai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(DigestError::Config(format!("Unknown LLM provider: {}", other))),
        }
    }
}

impl LlmProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Claude { .. } => ProviderKind::Claude,
            Self::OpenAi { .. } => ProviderKind::OpenAi,
            Self::Gemini { .. } => ProviderKind::Gemini,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Claude { model, .. } | Self::OpenAi { model, .. } | Self::Gemini { model, .. } => model,
        }
    }
}

/// Calls the configured provider's HTTP API.
pub struct HttpLlmAdapter {
    client: Client,
    provider: LlmProvider,
}

impl HttpLlmAdapter {
    pub fn new(provider: LlmProvider) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self { client, provider })
    }
    
    async fn post_json(&self, request: reqwest::RequestBuilder, body: &Value) -> Result<Value> {
        let response = request.json(body).send().await?;
        let status = response.status();
        
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DigestError::Llm(format!(
                "{:?} API error (HTTP {}): {}",
                self.provider.kind(),
                status.as_u16(),
                error_text
            )));
        }
        
        Ok(response.json().await?)
    }
}

#[async_trait]
impl LlmAdapter for HttpLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("{:?} ({})", self.provider.kind(), self.provider.model())
    }

    async fn generate_content(&self, prompt: &str) -> Result<String> {
        debug!("Sending {} char prompt to {}", prompt.chars().count(), self.adapter_name());
        
        match &self.provider {
            LlmProvider::Claude { api_key, model } => {
                let request = self
                    .client
                    .post(CLAUDE_API_URL)
                    .header("x-api-key", api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION);
                let body = json!({
                    "model": model,
                    "max_tokens": MAX_TOKENS,
                    "messages": [{"role": "user", "content": prompt}],
                });
                parse_claude_response(&self.post_json(request, &body).await?)
            }
            LlmProvider::OpenAi { api_key, model } => {
                let request = self.client.post(OPENAI_API_URL).bearer_auth(api_key);
                let body = json!({
                    "model": model,
                    "max_tokens": MAX_TOKENS,
                    "messages": [{"role": "user", "content": prompt}],
                });
                parse_openai_response(&self.post_json(request, &body).await?)
            }
            LlmProvider::Gemini { api_key, model } => {
                let request = self
                    .client
                    .post(format!("{}/{}:generateContent", GEMINI_API_URL, model))
                    .query(&[("key", api_key.as_str())]);
                let body = json!({
                    "contents": [{"parts": [{"text": prompt}]}],
                });
                parse_gemini_response(&self.post_json(request, &body).await?)
            }
        }
    }
}

fn non_empty(text: String, provider: &str) -> Result<String> {
    if text.trim().is_empty() {
        Err(DigestError::Llm(format!("Empty response from {}", provider)))
    } else {
        Ok(text)
    }
}

pub fn parse_claude_response(body: &Value) -> Result<String> {
    let block = body
        .pointer("/content/0")
        .ok_or_else(|| DigestError::Llm("Claude response has no content".to_string()))?;
    
    if block.get("type").and_then(Value::as_str) != Some("text") {
        return Err(DigestError::Llm("Unexpected response type from Claude".to_string()));
    }
    
    let text = block.get("text").and_then(Value::as_str).unwrap_or_default();
    non_empty(text.to_string(), "Claude")
}

pub fn parse_openai_response(body: &Value) -> Result<String> {
    let text = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default();
    non_empty(text.to_string(), "OpenAI")
}

pub fn parse_gemini_response(body: &Value) -> Result<String> {
    let text: String = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    non_empty(text, "Gemini")
}

/// Social media material generated for one article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub reels_script: String,
    pub card_news: String,
    pub blog_post: String,
}

/// Produces reels scripts, card news and blog posts from articles.
pub struct ContentGenerator {
    adapter: Arc<dyn LlmAdapter>,
    retry: RetryOptions,
}

impl ContentGenerator {
    pub fn new(adapter: Arc<dyn LlmAdapter>, retry: RetryOptions) -> Self {
        Self { adapter, retry }
    }

    pub async fn generate_for_article(&self, article: &ScrapedArticle) -> Result<GeneratedContent> {
        let prompt = build_prompt(article);
        info!(title = %article.title, provider = %self.adapter.adapter_name(), "Generating content with LLM");
        
        let label = format!("LLM:{}", article.title);
        let raw = with_retry(|| self.adapter.generate_content(&prompt), &label, self.retry).await?;
        
        Ok(parse_generated_content(&raw))
    }
}

pub fn build_prompt(article: &ScrapedArticle) -> String {
    let mut source = format!("제목: {}\nURL: {}\n", article.title, article.url);
    if let Some(site) = &article.site_name {
        source.push_str(&format!("출처: {}\n", site));
    }
    if let Some(author) = &article.author {
        source.push_str(&format!("저자: {}\n", author));
    }
    
    format!(
        "당신은 뇌 건강과 인지 과학을 쉽게 전달하는 한국어 콘텐츠 작가입니다.\n\
         아래 기사를 바탕으로 세 가지 콘텐츠를 한국어로 작성하세요.\n\n\
         ## {reels}\n60초 분량의 인스타그램 릴스 대본 (후킹 문장으로 시작)\n\n\
         ## {card}\n5~7장 분량의 카드 뉴스 문구 (장마다 한두 문장)\n\n\
         ## {blog}\n소제목이 있는 블로그 글 (1500자 내외, 출처 명시)\n\n\
         각 섹션은 반드시 위의 '## 섹션명' 머리글로 시작하세요.\n\n\
         --- 기사 ---\n{source}\n본문:\n{content}\n",
        reels = REELS_MARKER,
        card = CARD_NEWS_MARKER,
        blog = BLOG_MARKER,
        source = source,
        content = article.content,
    )
}

fn marker_patterns(marker: &str) -> Vec<Regex> {
    let m = regex::escape(marker);
    [
        format!(r"(?i)##\s*{}", m),
        format!(r"(?i)={{2,}}\s*{}\s*=*", m),
        format!(r"(?i)【{}】", m),
        format!(r"(?i)\[{}\]", m),
        format!(r"(?i)---\s*{}\s*---", m),
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
}

/// Text between the header for `start` and the header for `end` (or the
/// end of the text). Empty when the `start` header is missing.
fn extract_section(text: &str, start: &str, end: Option<&str>) -> String {
    let Some(body_start) = marker_patterns(start)
        .iter()
        .find_map(|pattern| pattern.find(text))
        .map(|m| m.end())
    else {
        return String::new();
    };
    
    let rest = &text[body_start..];
    let body_end = end
        .and_then(|end| marker_patterns(end).iter().find_map(|pattern| pattern.find(rest)))
        .map(|m| m.start())
        .unwrap_or(rest.len());
    
    rest[..body_end].trim().to_string()
}

/// Split a model response into its three sections. A response without
/// any recognizable section is treated as a blog post.
pub fn parse_generated_content(raw: &str) -> GeneratedContent {
    let sections = GeneratedContent {
        reels_script: extract_section(raw, REELS_MARKER, Some(CARD_NEWS_MARKER)),
        card_news: extract_section(raw, CARD_NEWS_MARKER, Some(BLOG_MARKER)),
        blog_post: extract_section(raw, BLOG_MARKER, None),
    };
    
    if sections.reels_script.is_empty() && sections.card_news.is_empty() && sections.blog_post.is_empty() {
        return GeneratedContent {
            blog_post: raw.to_string(),
            ..Default::default()
        };
    }
    
    sections
}
