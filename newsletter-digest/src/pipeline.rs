use crate::article_scraper::ArticleScraper;
use crate::digest::DigestDispatcher;
use crate::fetcher::PageFetcher;
use crate::parser::{deduplicate_by_url, LinkExtractor};
use crate::processing::ContentFilter;
use crate::resolver::RedirectResolver;
use crate::slack::Messenger;
use crate::translator::{TranslationBackend, Translator};
use crate::types::{DigestError, NewsletterSource, PipelineConfig, Result, RunSummary};
use std::sync::Arc;
use tracing::{info, warn};

/// One end-to-end digest run: newsletters in, threaded digest out.
pub struct DigestPipeline {
    source: Arc<dyn NewsletterSource>,
    extractor: LinkExtractor,
    resolver: RedirectResolver,
    scraper: ArticleScraper,
    filter: ContentFilter,
    translator: Translator,
    dispatcher: DigestDispatcher,
}

impl DigestPipeline {
    pub fn new(
        source: Arc<dyn NewsletterSource>,
        fetcher: Arc<dyn PageFetcher>,
        translation: Arc<dyn TranslationBackend>,
        messenger: Arc<dyn Messenger>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            extractor: LinkExtractor::new(config.extractor),
            resolver: RedirectResolver::new(fetcher.clone(), config.resolver),
            scraper: ArticleScraper::new(fetcher, config.scraper),
            filter: ContentFilter::new(config.filter),
            translator: Translator::new(translation, config.translator),
            dispatcher: DigestDispatcher::new(messenger, config.digest),
        }
    }

    /// Run every stage once. Stages that end up with nothing to pass on stop
    /// the run early; that still counts as success.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        info!("Starting newsletter pipeline from {}", self.source.source_name());
        
        let newsletters = self
            .source
            .fetch_newsletters()
            .await
            .map_err(DigestError::Source)?;
        summary.newsletters = newsletters.len();
        info!("Fetched {} newsletters", newsletters.len());
        if newsletters.is_empty() {
            info!("No newsletters found, nothing to do");
            return Ok(summary);
        }
        
        let links: Vec<_> = newsletters
            .iter()
            .flat_map(|newsletter| {
                let links = self.extractor.extract_links(&newsletter.html_body);
                info!("Newsletter '{}' from {}: {} links", newsletter.subject, newsletter.from, links.len());
                links
            })
            .collect();
        // the same article often appears in several newsletters
        let links = deduplicate_by_url(links, |link| link.url.as_str());
        summary.links = links.len();
        if links.is_empty() {
            info!("No relevant links found in newsletters");
            return Ok(summary);
        }
        
        let resolved = self.resolver.resolve_links(links).await;
        summary.resolved = resolved.len();
        
        let scraped = self.scraper.scrape_articles(&resolved).await;
        summary.scraped = scraped.len();
        if scraped.is_empty() {
            warn!("No articles could be scraped");
            return Ok(summary);
        }
        
        let relevant = self.filter.filter_articles(scraped);
        summary.relevant = relevant.len();
        if relevant.is_empty() {
            info!("No articles passed the content filter");
            return Ok(summary);
        }
        
        let mut translated = Vec::with_capacity(relevant.len());
        for article in relevant {
            translated.push(self.translator.translate_article(article).await);
        }
        summary.translated = translated.iter().filter(|a| a.translated).count();
        
        let report = self.dispatcher.dispatch(&translated).await?;
        summary.dispatched = report.sent;
        summary.dispatch_failures = report.failed;
        
        info!(
            newsletters = summary.newsletters,
            links = summary.links,
            scraped = summary.scraped,
            relevant = summary.relevant,
            dispatched = summary.dispatched,
            "Pipeline finished"
        );
        Ok(summary)
    }
}

/// Builder for wiring a pipeline from its collaborators.
#[derive(Default)]
pub struct PipelineBuilder {
    source: Option<Arc<dyn NewsletterSource>>,
    fetcher: Option<Arc<dyn PageFetcher>>,
    translation: Option<Arc<dyn TranslationBackend>>,
    messenger: Option<Arc<dyn Messenger>>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    
    pub fn source(mut self, source: Arc<dyn NewsletterSource>) -> Self {
        self.source = Some(source);
        self
    }
    
    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }
    
    pub fn translation(mut self, translation: Arc<dyn TranslationBackend>) -> Self {
        self.translation = Some(translation);
        self
    }
    
    pub fn messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = Some(messenger);
        self
    }
    
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }
    
    pub fn build(self) -> Result<DigestPipeline> {
        let missing = |name: &str| DigestError::Config(format!("pipeline is missing a {}", name));
        
        Ok(DigestPipeline::new(
            self.source.ok_or_else(|| missing("newsletter source"))?,
            self.fetcher.ok_or_else(|| missing("page fetcher"))?,
            self.translation.ok_or_else(|| missing("translation backend"))?,
            self.messenger.ok_or_else(|| missing("messenger"))?,
            self.config,
        ))
    }
}
