use crate::llm_adapter::{LlmProvider, ProviderKind};
use crate::slack::DEFAULT_SLACK_API_URL;
use crate::types::{DigestError, PipelineConfig, Result, RetryOptions};
use std::collections::HashMap;
use std::str::FromStr;

const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone)]
pub struct MailboxConfig {
    /// `email://user@host:port/MAILBOX?tls=true`
    pub uri: String,
    pub password: String,
    pub senders: Vec<String>,
    pub lookback_days: u32,
    pub max_messages: usize,
}

impl std::fmt::Debug for MailboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxConfig")
            .field("uri", &self.uri)
            .field("password", &"***")
            .field("senders", &self.senders)
            .field("lookback_days", &self.lookback_days)
            .field("max_messages", &self.max_messages)
            .finish()
    }
}

#[derive(Clone)]
pub struct SlackConfig {
    pub token: String,
    pub channel: String,
    pub api_url: String,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("token", &"***")
            .field("channel", &self.channel)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Runtime configuration. API keys are kept out of `Debug` output.
#[derive(Clone)]
pub struct Config {
    pub mailbox: Option<MailboxConfig>,
    pub slack: Option<SlackConfig>,
    pub pipeline: PipelineConfig,
    pub retry: RetryOptions,
    pub llm_kind: ProviderKind,
    api_keys: HashMap<ProviderKind, String>,
    models: HashMap<ProviderKind, String>,
}

impl Config {
    /// Load `.env` from the working directory, then read the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env { lookup: &lookup };
        
        let mailbox = match env.get("NEWSLETTER_MAILBOX_URI") {
            Some(uri) => Some(MailboxConfig {
                uri,
                password: env.require("NEWSLETTER_MAILBOX_PASSWORD")?,
                senders: env
                    .require("NEWSLETTER_SENDERS")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                lookback_days: env.parse_or("NEWSLETTER_LOOKBACK_DAYS", 1)?,
                max_messages: env.parse_or("NEWSLETTER_MAX_MESSAGES", 20)?,
            }),
            None => None,
        };
        
        let slack = match env.get("SLACK_BOT_TOKEN") {
            Some(token) => Some(SlackConfig {
                token,
                channel: env.require("SLACK_CHANNEL_ID")?,
                api_url: env.get("SLACK_API_URL").unwrap_or_else(|| DEFAULT_SLACK_API_URL.to_string()),
            }),
            None => None,
        };
        
        let mut pipeline = PipelineConfig::default();
        pipeline.scraper.concurrency = env.parse_or("SCRAPER_CONCURRENCY", pipeline.scraper.concurrency)?;
        pipeline.scraper.timeout_ms = env.parse_or("SCRAPER_TIMEOUT_MS", pipeline.scraper.timeout_ms)?;
        pipeline.scraper.max_content_length =
            env.parse_or("SCRAPER_MAX_CONTENT_LENGTH", pipeline.scraper.max_content_length)?;
        pipeline.resolver.timeout_ms = env.parse_or("REDIRECT_TIMEOUT_MS", pipeline.resolver.timeout_ms)?;
        pipeline.translator.chunk_size = env.parse_or("TRANSLATE_CHUNK_SIZE", pipeline.translator.chunk_size)?;
        pipeline.translator.chunk_delay_ms =
            env.parse_or("TRANSLATE_CHUNK_DELAY_MS", pipeline.translator.chunk_delay_ms)?;
        pipeline.translator.article_delay_ms =
            env.parse_or("TRANSLATE_ARTICLE_DELAY_MS", pipeline.translator.article_delay_ms)?;
        pipeline.translator.max_retries = env.parse_or("TRANSLATE_MAX_RETRIES", pipeline.translator.max_retries)?;
        pipeline.digest.preview_length = env.parse_or("DIGEST_PREVIEW_LENGTH", pipeline.digest.preview_length)?;
        
        if pipeline.scraper.concurrency == 0 || pipeline.translator.chunk_size == 0 {
            return Err(DigestError::Config(
                "SCRAPER_CONCURRENCY and TRANSLATE_CHUNK_SIZE must be positive".to_string(),
            ));
        }
        
        let retry = RetryOptions {
            max_retries: env.parse_or("RETRY_MAX_RETRIES", 2)?,
            base_delay_ms: env.parse_or("RETRY_BASE_DELAY_MS", 1000)?,
            max_delay_ms: env.parse_or("RETRY_MAX_DELAY_MS", 30_000)?,
        };
        
        let llm_kind = match env.get("LLM_PROVIDER") {
            Some(name) => ProviderKind::from_str(&name)?,
            None => ProviderKind::Claude,
        };
        
        let mut api_keys = HashMap::new();
        let mut models = HashMap::new();
        for (kind, key_var, model_var, default_model) in [
            (ProviderKind::Claude, "ANTHROPIC_API_KEY", "CLAUDE_MODEL", DEFAULT_CLAUDE_MODEL),
            (ProviderKind::OpenAi, "OPENAI_API_KEY", "OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            (ProviderKind::Gemini, "GEMINI_API_KEY", "GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        ] {
            if let Some(key) = env.get(key_var) {
                api_keys.insert(kind, key);
            }
            models.insert(kind, env.get(model_var).unwrap_or_else(|| default_model.to_string()));
        }
        
        Ok(Self {
            mailbox,
            slack,
            pipeline,
            retry,
            llm_kind,
            api_keys,
            models,
        })
    }

    pub fn require_mailbox(&self) -> Result<&MailboxConfig> {
        self.mailbox
            .as_ref()
            .ok_or_else(|| DigestError::MissingEnvVar("NEWSLETTER_MAILBOX_URI".to_string()))
    }

    pub fn require_slack(&self) -> Result<&SlackConfig> {
        self.slack
            .as_ref()
            .ok_or_else(|| DigestError::MissingEnvVar("SLACK_BOT_TOKEN".to_string()))
    }

    /// The configured LLM provider with its credentials.
    pub fn llm_provider(&self) -> Result<LlmProvider> {
        let key_var = match self.llm_kind {
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        };
        let api_key = self
            .api_keys
            .get(&self.llm_kind)
            .cloned()
            .ok_or_else(|| DigestError::MissingEnvVar(key_var.to_string()))?;
        let model = self.models.get(&self.llm_kind).cloned().unwrap_or_default();
        
        Ok(match self.llm_kind {
            ProviderKind::Claude => LlmProvider::Claude { api_key, model },
            ProviderKind::OpenAi => LlmProvider::OpenAi { api_key, model },
            ProviderKind::Gemini => LlmProvider::Gemini { api_key, model },
        })
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key).ok_or_else(|| DigestError::MissingEnvVar(key.to_string()))
    }

    fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| DigestError::Config(format!("{} has an invalid value: {}", key, raw))),
            None => Ok(default),
        }
    }
}
