use crate::fetcher::PageFetcher;
use crate::readability::extract_readable;
use crate::types::{DigestError, ResolvedLink, Result, ScrapedArticle, ScraperConfig, TRUNCATION_MARKER};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Downloads resolved links and turns them into full-text articles.
pub struct ArticleScraper {
    fetcher: Arc<dyn PageFetcher>,
    config: ScraperConfig,
}

impl ArticleScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: ScraperConfig) -> Self {
        Self { fetcher, config }
    }

    /// Scrape in consecutive batches of `concurrency` links. A batch fully
    /// settles before the next one starts. Failed links are dropped; the
    /// survivors keep their input order.
    pub async fn scrape_articles(&self, links: &[ResolvedLink]) -> Vec<ScrapedArticle> {
        let batch_size = self.config.concurrency.max(1);
        let mut articles = Vec::with_capacity(links.len());
        
        for (batch_index, batch) in links.chunks(batch_size).enumerate() {
            debug!("Scraping batch {} ({} links)", batch_index + 1, batch.len());
            
            let results = join_all(batch.iter().map(|link| self.scrape_one(link))).await;
            
            for (link, result) in batch.iter().zip(results) {
                match result {
                    Ok(article) => articles.push(article),
                    Err(e) => warn!(url = %link.url, "Dropping article: {}", e),
                }
            }
        }
        
        info!("Scraped {} of {} articles", articles.len(), links.len());
        articles
    }

    /// Fetch and extract a single link. The fetch is canceled once
    /// `timeout_ms` elapses, whatever the fetcher does with its deadline.
    pub async fn scrape_one(&self, link: &ResolvedLink) -> Result<ScrapedArticle> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let html = tokio::time::timeout(timeout, self.fetcher.fetch_html(&link.url, timeout))
            .await
            .map_err(|_| DigestError::Timeout {
                url: link.url.clone(),
                timeout_ms: self.config.timeout_ms,
            })??;
        
        let readable = extract_readable(&html).ok_or_else(|| DigestError::Extraction {
            url: link.url.clone(),
        })?;
        
        Ok(ScrapedArticle {
            title: readable.title.unwrap_or_else(|| link.title.clone()),
            url: link.url.clone(),
            snippet: link.snippet.clone(),
            content: truncate_chars(&readable.text, self.config.max_content_length),
            author: readable.byline,
            site_name: readable.site_name,
        })
    }
}

/// Cut `text` to at most `max_chars` characters, appending the truncation
/// marker only when something was removed.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
