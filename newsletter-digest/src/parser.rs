use crate::types::{CandidateLink, DigestError, ExtractorConfig, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

const TRACKING_PARAMS: [&str; 2] = ["mc_cid", "mc_eid"];

/// Pulls keyword-relevant article links out of newsletter HTML.
pub struct LinkExtractor {
    config: ExtractorConfig,
    keywords: Vec<String>,
    skip_phrases: Vec<String>,
}

impl LinkExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let keywords = config.keywords.iter().map(|k| k.to_lowercase()).collect();
        let skip_phrases = config.skip_phrases.iter().map(|p| p.to_lowercase()).collect();
        
        Self {
            config,
            keywords,
            skip_phrases,
        }
    }

    /// Candidate links in order of first occurrence, unique by normalized URL.
    ///
    /// Malformed or empty HTML yields an empty list.
    pub fn extract_links(&self, html: &str) -> Vec<CandidateLink> {
        if html.trim().is_empty() {
            return Vec::new();
        }
        
        let document = Html::parse_document(html);
        let anchor_selector = match Selector::parse("a[href]") {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        
        let mut links = Vec::new();
        let mut seen_urls = HashSet::new();
        
        for anchor in document.select(&anchor_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            
            let Some(link) = self.evaluate_anchor(anchor, href.trim()) else {
                continue;
            };
            
            if seen_urls.insert(link.url.clone()) {
                links.push(link);
            } else {
                debug!("Skipping duplicate link: {}", link.url);
            }
        }
        
        debug!("Extracted {} candidate links", links.len());
        links
    }

    fn evaluate_anchor(&self, anchor: ElementRef<'_>, href: &str) -> Option<CandidateLink> {
        let href_lower = href.to_lowercase();
        if href.is_empty()
            || href.starts_with('#')
            || href_lower.starts_with("javascript:")
            || href_lower.starts_with("mailto:")
        {
            return None;
        }
        
        if self.config.skip_domains.iter().any(|domain| href_lower.contains(domain.as_str())) {
            debug!("Skipping link on excluded domain: {}", href);
            return None;
        }
        
        let title = visible_text(anchor);
        if title.chars().count() < self.config.min_title_length {
            return None;
        }
        
        let title_lower = title.to_lowercase();
        if self.skip_phrases.iter().any(|phrase| title_lower.contains(phrase.as_str())) {
            return None;
        }
        
        if !self.keywords.iter().any(|keyword| title_lower.contains(keyword.as_str())) {
            return None;
        }
        
        let url = match normalize_url(href) {
            Ok(url) => url,
            Err(e) => {
                debug!("Rejecting unparseable link {}: {}", href, e);
                return None;
            }
        };
        
        let snippet = anchor
            .parent()
            .and_then(ElementRef::wrap)
            .map(visible_text)
            .unwrap_or_default()
            .chars()
            .take(self.config.snippet_length)
            .collect();
        
        Some(CandidateLink { title, url, snippet })
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

/// Text content with runs of whitespace collapsed to single spaces.
pub(crate) fn visible_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse `raw` as an absolute http(s) URL and strip tracking parameters
/// (`utm_*`, `mc_cid`, `mc_eid`).
pub fn normalize_url(raw: &str) -> Result<String> {
    let mut url = Url::parse(raw)?;
    
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(DigestError::Fetch {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let kept: Vec<&(String, String)> = pairs
        .iter()
        .filter(|(key, _)| !is_tracking_param(key))
        .collect();
    
    // Leave untouched queries byte-for-byte as they were
    if kept.len() != pairs.len() {
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }
    
    Ok(url.to_string())
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Keep the first item for every distinct URL.
pub fn deduplicate_by_url<T>(items: Vec<T>, url_of: impl Fn(&T) -> &str) -> Vec<T> {
    let before = items.len();
    let mut seen_urls = HashSet::new();
    
    let unique: Vec<T> = items
        .into_iter()
        .filter(|item| seen_urls.insert(url_of(item).to_string()))
        .collect();
    
    let removed_count = before - unique.len();
    if removed_count > 0 {
        info!("Removed {} duplicate links", removed_count);
    }
    
    unique
}
