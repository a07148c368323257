use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One newsletter email as handed over by the email collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNewsletter {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub date: String,
    pub html_body: String,
}

/// A link pulled out of a newsletter body whose anchor text looked relevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLink {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A candidate link after redirect resolution. `url` is the final destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLink {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl ResolvedLink {
    pub fn from_candidate(candidate: CandidateLink, url: String) -> Self {
        Self {
            title: candidate.title,
            url,
            snippet: candidate.snippet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedArticle {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub content: String,
    pub author: Option<String>,
    pub site_name: Option<String>,
}

/// A scraped article whose title and content went through translation.
///
/// When translation fails the original text is kept and `translated` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedArticle {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub content: String,
    pub author: Option<String>,
    pub site_name: Option<String>,
    pub translated: bool,
}

impl TranslatedArticle {
    pub fn new(article: ScrapedArticle, title: String, content: String) -> Self {
        let translated = title != article.title || content != article.content;
        Self {
            title,
            url: article.url,
            snippet: article.snippet,
            content,
            author: article.author,
            site_name: article.site_name,
            translated,
        }
    }
}

// Object style note:
// Sources are constructed once per run from configuration and handed to the
// pipeline as trait objects. Every newsletter is fully materialized before
// the pipeline starts; there is no streaming between the source and the
// content stages.

/// Supplies the newsletters for one pipeline run.
#[async_trait]
pub trait NewsletterSource: Send + Sync {
    /// Human-readable name used in logs.
    fn source_name(&self) -> String;

    async fn fetch_newsletters(&self) -> anyhow::Result<Vec<RawNewsletter>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraped() -> ScrapedArticle {
        ScrapedArticle {
            title: "Walking and memory".to_string(),
            url: "https://example.com/a".to_string(),
            snippet: String::new(),
            content: "Body".to_string(),
            author: None,
            site_name: Some("Brain Daily".to_string()),
        }
    }

    #[test]
    fn test_translated_flag_tracks_changes() {
        let same = TranslatedArticle::new(scraped(), "Walking and memory".to_string(), "Body".to_string());
        assert!(!same.translated);

        let changed = TranslatedArticle::new(scraped(), "걷기와 기억력".to_string(), "Body".to_string());
        assert!(changed.translated);
        assert_eq!(changed.site_name.as_deref(), Some("Brain Daily"));
    }
}
