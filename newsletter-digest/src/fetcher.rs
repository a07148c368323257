use crate::types::{DigestError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; NewsletterDigest/1.0; +https://github.com/newsletter-digest)";

/// Network access used by the resolver and scraper stages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Follow redirects from `url` and return where they end.
    async fn resolve_final_url(&self, url: &str, timeout: Duration) -> Result<String>;

    /// GET `url` (following redirects) and return the body of a 2xx response.
    async fn fetch_html(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// `PageFetcher` over a shared reqwest client.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        
        Ok(Self { client })
    }

    async fn send(&self, method: Method, url: &str, timeout: Duration) -> Result<Response> {
        let request = self.client.request(method, url).timeout(timeout).send();
        
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) if e.is_timeout() => Err(DigestError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
            Ok(Err(e)) => Err(DigestError::Http(e)),
            Err(_) => Err(DigestError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl PageFetcher for Fetcher {
    async fn resolve_final_url(&self, url: &str, timeout: Duration) -> Result<String> {
        // Any completed response counts; only its final location matters
        let response = self.send(Method::HEAD, url, timeout).await?;
        let final_url = response.url().to_string();
        
        if final_url != url {
            debug!("Resolved {} -> {}", url, final_url);
        }
        Ok(final_url)
    }

    async fn fetch_html(&self, url: &str, timeout: Duration) -> Result<String> {
        debug!("Fetching article: {}", url);
        
        let response = self.send(Method::GET, url, timeout).await?;
        let status = response.status();
        
        if !status.is_success() {
            return Err(DigestError::Fetch {
                url: url.to_string(),
                reason: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }
        
        let body = tokio::time::timeout(timeout, response.text())
            .await
            .map_err(|_| DigestError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })??;
        
        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}
