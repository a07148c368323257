use crate::types::{DigestError, Result, ScrapedArticle, TranslatedArticle, TranslatorConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const GOOGLE_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// A machine translation service.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    fn backend_name(&self) -> String;

    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;
}

/// Free Google Translate web endpoint.
pub struct GoogleTranslateBackend {
    client: Client,
    endpoint: String,
}

impl GoogleTranslateBackend {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            endpoint: GOOGLE_TRANSLATE_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TranslationBackend for GoogleTranslateBackend {
    fn backend_name(&self) -> String {
        "google-translate".to_string()
    }

    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_lang),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;
        
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Translation(format!("HTTP {}", status.as_u16())));
        }
        
        let body: Value = response.json().await?;
        parse_google_response(&body)
    }
}

/// The response is `[[["translated", "source", ...], ...], ...]`; the
/// translation is the concatenation of every segment's first element.
pub fn parse_google_response(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| DigestError::Translation("unexpected response shape".to_string()))?;
    
    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    
    if translated.trim().is_empty() {
        return Err(DigestError::Translation("empty translation".to_string()));
    }
    Ok(translated)
}

/// Translates long English text to Korean chunk by chunk, pacing calls so
/// the backend's rate limits are respected.
pub struct Translator {
    backend: Arc<dyn TranslationBackend>,
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(backend: Arc<dyn TranslationBackend>, config: TranslatorConfig) -> Self {
        Self { backend, config }
    }

    /// Never fails: if any chunk cannot be translated the original text is
    /// returned as a whole.
    pub async fn translate_to_korean(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        
        let chunks = split_into_chunks(text, &self.config);
        debug!("Translating {} chars in {} chunks", text.chars().count(), chunks.len());
        
        let mut translated = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            match self.translate_chunk(chunk).await {
                Ok(result) => translated.push(result),
                Err(e) => {
                    warn!(
                        backend = %self.backend.backend_name(),
                        chunk = index + 1,
                        chunks = chunks.len(),
                        "Translation failed, keeping original text: {}",
                        e
                    );
                    return text.to_string();
                }
            }
            tokio::time::sleep(self.config.chunk_delay()).await;
        }
        
        translated.join("\n\n")
    }
    
    async fn translate_chunk(&self, chunk: &str) -> Result<String> {
        let mut attempt: u32 = 0;
        
        loop {
            match self.backend.translate(chunk, "en", "ko").await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(self.config.retry_delay_ms * u64::from(attempt + 1));
                    warn!(
                        backend = %self.backend.backend_name(),
                        "Chunk translation attempt {} failed: {}. Retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fixed pause between translation calls of different texts.
    pub async fn cooldown(&self) {
        tokio::time::sleep(self.config.article_delay()).await;
    }

    /// Title, cooldown, content, cooldown.
    pub async fn translate_article(&self, article: ScrapedArticle) -> TranslatedArticle {
        let title = self.translate_to_korean(&article.title).await;
        self.cooldown().await;
        let content = self.translate_to_korean(&article.content).await;
        self.cooldown().await;
        
        let translated = TranslatedArticle::new(article, title, content);
        if translated.translated {
            info!(url = %translated.url, "Translated article");
        }
        translated
    }
}

/// Split `text` into chunks of at most `chunk_size` characters.
///
/// Each cut prefers the last paragraph break, then the last sentence end, in
/// the window, provided it lies far enough into the window; otherwise the
/// window is cut hard. Leading whitespace of the remainder is dropped.
pub fn split_into_chunks(text: &str, config: &TranslatorConfig) -> Vec<String> {
    let size = config.chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    
    if chars.len() <= size {
        return vec![text.to_string()];
    }
    
    let mut chunks = Vec::new();
    let mut rest: &[char] = &chars;
    
    while !rest.is_empty() {
        if rest.len() <= size {
            chunks.push(rest.iter().collect());
            break;
        }
        
        let window = &rest[..size];
        let cut = find_cut(window, config);
        chunks.push(window[..cut].iter().collect());
        
        rest = &rest[cut..];
        let leading_ws = rest.iter().take_while(|c| c.is_whitespace()).count();
        rest = &rest[leading_ws..];
    }
    
    chunks
}

fn find_cut(window: &[char], config: &TranslatorConfig) -> usize {
    let len = window.len();
    let paragraph_floor = (len as f64 * config.paragraph_break_ratio) as usize;
    let sentence_floor = (len as f64 * config.sentence_break_ratio) as usize;
    
    if let Some(p) = rfind_pair(window, '\n', '\n') {
        if p > 0 && p >= paragraph_floor {
            return p;
        }
    }
    
    if let Some(s) = rfind_pair(window, '.', ' ') {
        if s >= sentence_floor {
            return s + 1;
        }
    }
    
    len
}

fn rfind_pair(window: &[char], first: char, second: char) -> Option<usize> {
    window.windows(2).rposition(|pair| pair[0] == first && pair[1] == second)
}
