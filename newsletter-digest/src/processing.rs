use crate::types::{FilterConfig, ScrapedArticle};
use tracing::{debug, info};

/// Second relevance pass over full article bodies.
pub struct ContentFilter {
    keywords: Vec<String>,
}

impl ContentFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Keep articles whose title or content mentions at least one keyword.
    pub fn filter_articles(&self, articles: Vec<ScrapedArticle>) -> Vec<ScrapedArticle> {
        let before = articles.len();
        
        let relevant: Vec<ScrapedArticle> = articles
            .into_iter()
            .filter(|article| {
                let keep = self.is_relevant(article);
                if !keep {
                    debug!(url = %article.url, "Filtered out article without content keywords");
                }
                keep
            })
            .collect();
        
        info!("Content filter kept {} of {} articles", relevant.len(), before);
        relevant
    }

    pub fn is_relevant(&self, article: &ScrapedArticle) -> bool {
        let haystack = format!("{} {}", article.title, article.content).to_lowercase();
        self.keywords.iter().any(|keyword| haystack.contains(keyword.as_str()))
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}
