use crate::fetcher::PageFetcher;
use crate::parser::{deduplicate_by_url, normalize_url};
use crate::types::{CandidateLink, DigestError, ResolvedLink, ResolverConfig};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Replaces tracking/shortener URLs with their final destinations.
pub struct RedirectResolver {
    fetcher: Arc<dyn PageFetcher>,
    config: ResolverConfig,
}

impl RedirectResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: ResolverConfig) -> Self {
        Self { fetcher, config }
    }

    /// Resolve every link, keeping the original URL when resolution fails,
    /// then drop links that now point at the same place.
    pub async fn resolve_links(&self, links: Vec<CandidateLink>) -> Vec<ResolvedLink> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let total = links.len();
        
        let resolved: Vec<ResolvedLink> = stream::iter(links)
            .map(|link| self.resolve_one(link, timeout))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;
        
        let unique = deduplicate_by_url(resolved, |link| link.url.as_str());
        info!("Resolved {} links to {} unique destinations", total, unique.len());
        unique
    }
    
    async fn resolve_one(&self, link: CandidateLink, timeout: Duration) -> ResolvedLink {
        let attempt = tokio::time::timeout(timeout, self.fetcher.resolve_final_url(&link.url, timeout))
            .await
            .unwrap_or_else(|_| {
                Err(DigestError::Timeout {
                    url: link.url.clone(),
                    timeout_ms: self.config.timeout_ms,
                })
            });
        
        match attempt {
            Ok(final_url) => match normalize_url(&final_url) {
                Ok(url) => ResolvedLink::from_candidate(link, url),
                Err(e) => {
                    warn!(url = %link.url, "Redirect ended at unusable URL {}: {}", final_url, e);
                    let url = link.url.clone();
                    ResolvedLink::from_candidate(link, url)
                }
            },
            Err(e) => {
                warn!(url = %link.url, "Could not resolve redirect, keeping original: {}", e);
                let url = link.url.clone();
                ResolvedLink::from_candidate(link, url)
            }
        }
    }
}
