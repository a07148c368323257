pub mod types;
pub mod retry;
pub mod fetcher;
pub mod parser;
pub mod resolver;
pub mod readability;
pub mod article_scraper;
pub mod processing;
pub mod translator;
pub mod slack;
pub mod digest;
pub mod llm_adapter;
pub mod pipeline;
pub mod config;

pub use types::*;
pub use retry::with_retry;
pub use fetcher::{Fetcher, PageFetcher};
pub use parser::LinkExtractor;
pub use resolver::RedirectResolver;
pub use article_scraper::ArticleScraper;
pub use processing::ContentFilter;
pub use translator::{GoogleTranslateBackend, TranslationBackend, Translator};
pub use slack::{LogMessenger, Messenger, SlackMessenger};
pub use digest::{DigestDispatcher, DispatchReport};
pub use llm_adapter::{ContentGenerator, GeneratedContent, HttpLlmAdapter, LlmAdapter, LlmProvider};
pub use pipeline::{DigestPipeline, PipelineBuilder};
pub use config::Config;
