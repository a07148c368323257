use serde::{Deserialize, Serialize};
use std::time::Duration;

// Use the interfaces crate for the shared data model
pub use interfaces::defs::{
    CandidateLink, NewsletterSource, RawNewsletter, ResolvedLink, ScrapedArticle,
    TranslatedArticle,
};

/// Appended to text that was cut short.
pub const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Matched case-insensitively against anchor text.
    pub keywords: Vec<String>,
    /// A link whose URL contains any of these is never a candidate.
    pub skip_domains: Vec<String>,
    pub skip_phrases: Vec<String>,
    pub min_title_length: usize,
    pub snippet_length: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            keywords: to_strings(&[
                "brain health",
                "dementia",
                "alzheimer",
                "memory",
                "attention",
                "exercise",
                "cognitive decline",
                "cognitive function",
                "neurodegeneration",
                "neuroprotect",
                "brain aging",
                "brain fitness",
                "뇌 건강",
                "치매",
                "알츠하이머",
                "기억력",
                "주의력",
                "운동",
                "인지 저하",
                "인지기능",
                "신경퇴행",
                "신경보호",
                "뇌 노화",
            ]),
            skip_domains: to_strings(&[
                "list-manage.com",
                "mailchimp.com",
                "email.mg",
                "sendgrid.net",
                "facebook.com",
                "twitter.com",
                "instagram.com",
                "linkedin.com",
            ]),
            skip_phrases: to_strings(&[
                "unsubscribe",
                "manage preferences",
                "view in browser",
                "read more",
                "update your preferences",
                "forward to a friend",
            ]),
            min_title_length: 10,
            snippet_length: 300,
        }
    }
}

/// Body-level keywords; tighter than the anchor-text set.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub keywords: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            keywords: to_strings(&[
                "brain health",
                "dementia",
                "alzheimer",
                "memory",
                "attention",
                "exercise",
                "cognitive decline",
                "cognitive function",
                "neurodegeneration",
                "neuroprotect",
                "brain aging",
                "brain fitness",
                "뇌 건강",
                "치매",
                "기억력",
                "주의력",
                "운동",
                "인지기능",
            ]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub timeout_ms: u64,
    pub concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            concurrency: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Batch size; every item in a batch settles before the next starts.
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub max_content_length: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            timeout_ms: 10_000,
            max_content_length: 8000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
    pub article_delay_ms: u64,
    pub max_retries: u32,
    /// Retry `n` (0-based) waits `retry_delay_ms * (n + 1)`.
    pub retry_delay_ms: u64,
    /// A paragraph break is only used as a cut point if it lies at or beyond
    /// this fraction of the chunk window.
    pub paragraph_break_ratio: f64,
    pub sentence_break_ratio: f64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_delay_ms: 500,
            article_delay_ms: 1000,
            max_retries: 2,
            retry_delay_ms: 1000,
            paragraph_break_ratio: 0.3,
            sentence_break_ratio: 0.3,
        }
    }
}

impl TranslatorConfig {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn article_delay(&self) -> Duration {
        Duration::from_millis(self.article_delay_ms)
    }
}

#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub preview_length: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self { preview_length: 500 }
    }
}

/// Bounds for [`crate::retry::with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryOptions {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// Everything one pipeline run needs besides its collaborators.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    pub filter: FilterConfig,
    pub resolver: ResolverConfig,
    pub scraper: ScraperConfig,
    pub translator: TranslatorConfig,
    pub digest: DigestConfig,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub newsletters: usize,
    pub links: usize,
    pub resolved: usize,
    pub scraped: usize,
    pub relevant: usize,
    pub translated: usize,
    pub dispatched: usize,
    pub dispatch_failures: usize,
}

pub(crate) fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },
    
    #[error("Timed out after {timeout_ms}ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },
    
    #[error("No readable content at {url}")]
    Extraction { url: String },
    
    #[error("Translation error: {0}")]
    Translation(String),
    
    #[error("Dispatch error: {0}")]
    Dispatch(String),
    
    #[error("LLM error: {0}")]
    Llm(String),
    
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    
    #[error("Configuration error: {0}")]
    Config(String),
    
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DigestError>;
