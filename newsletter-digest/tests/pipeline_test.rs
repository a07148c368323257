mod common;

use common::{article_page, newsletter, FailingSource, FakeFetcher, FakeSource, PrefixTranslator, RecordingMessenger, Sent};
use newsletter_digest::digest::NO_ARTICLES_NOTICE;
use newsletter_digest::slack::Block;
use newsletter_digest::{DigestError, DigestPipeline, PipelineBuilder, PipelineConfig};
use std::sync::atomic::Ordering;
use std::sync::Arc;

const NEWSLETTER_HTML: &str = r#"
<html><body>
  <h1>Brain Weekly</h1>
  <p>Top story: <a href="https://lnk.example/r/1?utm_source=newsletter">Walking every day slows memory decline</a></p>
  <p><a href="https://example.com/sleep?utm_medium=email">Deep sleep may protect against dementia</a></p>
  <p><a href="https://example.com/stocks">Quarterly earnings beat expectations</a></p>
  <p><a href="https://example.com/broken">Attention training apps reviewed</a></p>
  <p><a href="https://example.com/offtopic">Exercise gear buying guide for runners</a></p>
  <p><a href="https://brainweekly.list-manage.com/unsubscribe?u=1">Unsubscribe from brain health emails</a></p>
</body></html>
"#;

struct Harness {
    source: Arc<FakeSource>,
    fetcher: Arc<FakeFetcher>,
    translation: Arc<PrefixTranslator>,
    messenger: Arc<RecordingMessenger>,
}

impl Harness {
    fn new(html_bodies: &[&str]) -> Self {
        let newsletters = html_bodies
            .iter()
            .enumerate()
            .map(|(i, html)| newsletter(&i.to_string(), html))
            .collect();
        
        let fetcher = FakeFetcher::default()
            .with_redirect("https://lnk.example/r/1", "https://example.com/walking?utm_campaign=x")
            .with_page(
                "https://example.com/walking",
                article_page("Walking slows memory decline", "Daily walks kept memory sharp in older adults."),
            )
            .with_page(
                "https://example.com/sleep",
                article_page("Sleep and dementia", "Deep sleep clears proteins linked to dementia."),
            )
            .with_page(
                "https://example.com/offtopic",
                article_page("Running shoes 2026", "The best shoes for the marathon season."),
            );
        
        Self {
            source: Arc::new(FakeSource::new(newsletters)),
            fetcher: Arc::new(fetcher),
            translation: Arc::new(PrefixTranslator::default()),
            messenger: Arc::new(RecordingMessenger::default()),
        }
    }

    fn pipeline(&self) -> DigestPipeline {
        PipelineBuilder::new()
            .source(self.source.clone())
            .fetcher(self.fetcher.clone())
            .translation(self.translation.clone())
            .messenger(self.messenger.clone())
            .config(PipelineConfig::default())
            .build()
            .unwrap()
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_run_sends_threaded_digest() {
    let harness = Harness::new(&[NEWSLETTER_HTML]);
    let summary = harness.pipeline().run().await.unwrap();
    
    assert_eq!(summary.newsletters, 1);
    // walking, sleep, broken, offtopic; stocks and unsubscribe are rejected
    assert_eq!(summary.links, 4);
    assert_eq!(summary.scraped, 3);
    assert_eq!(summary.relevant, 2);
    assert_eq!(summary.translated, 2);
    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.dispatch_failures, 0);
    
    let sent = harness.messenger.sent();
    assert_eq!(sent.len(), 3);
    match &sent[0] {
        Sent::Message(header) => assert_eq!(header.text, "🧠 오늘의 뇌과학 뉴스레터 (2건)"),
        other => panic!("expected header first, got {:?}", other),
    }
    
    let replies = harness.messenger.replies();
    assert_eq!(replies[0].text, "[ko] Walking slows memory decline");
    assert_eq!(replies[1].text, "[ko] Sleep and dementia");
    assert_eq!(
        replies[0].blocks[0],
        Block::Section {
            text: newsletter_digest::slack::TextObject::mrkdwn(
                "*<https://example.com/walking|[ko] Walking slows memory decline>*"
            )
        }
    );
    for s in &sent[1..] {
        assert!(matches!(s, Sent::Reply(parent, _) if parent.0 == "ts-1"));
    }
    
    // title + content for each of the two relevant articles
    assert_eq!(harness.translation.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_empty_newsletter_short_circuits_before_scraping() {
    let harness = Harness::new(&[""]);
    let summary = harness.pipeline().run().await.unwrap();
    
    assert_eq!(summary.newsletters, 1);
    assert_eq!(summary.links, 0);
    assert_eq!(harness.fetcher.fetch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.fetcher.resolve_calls.load(Ordering::SeqCst), 0);
    assert!(harness.messenger.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_no_newsletters_short_circuits() {
    let harness = Harness::new(&[]);
    let summary = harness.pipeline().run().await.unwrap();
    
    assert_eq!(summary, Default::default());
    assert_eq!(harness.source.calls.load(Ordering::SeqCst), 1);
    assert!(harness.messenger.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_links_repeated_across_newsletters_are_scraped_once() {
    let harness = Harness::new(&[NEWSLETTER_HTML, NEWSLETTER_HTML]);
    let summary = harness.pipeline().run().await.unwrap();
    
    assert_eq!(summary.newsletters, 2);
    assert_eq!(summary.links, 4);
    assert_eq!(harness.fetcher.fetch_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_translation_outage_keeps_original_text() {
    let harness = Harness::new(&[NEWSLETTER_HTML]);
    let translation = Arc::new(PrefixTranslator {
        always_fail: true,
        ..Default::default()
    });
    let pipeline = PipelineBuilder::new()
        .source(harness.source.clone())
        .fetcher(harness.fetcher.clone())
        .translation(translation)
        .messenger(harness.messenger.clone())
        .build()
        .unwrap();
    
    let summary = pipeline.run().await.unwrap();
    
    assert_eq!(summary.translated, 0);
    assert_eq!(summary.dispatched, 2);
    assert_eq!(harness.messenger.replies()[0].text, "Walking slows memory decline");
}

#[tokio::test]
async fn test_source_failure_propagates() {
    let harness = Harness::new(&[]);
    let pipeline = PipelineBuilder::new()
        .source(Arc::new(FailingSource))
        .fetcher(harness.fetcher.clone())
        .translation(harness.translation.clone())
        .messenger(harness.messenger.clone())
        .build()
        .unwrap();
    
    let result = pipeline.run().await;
    assert!(matches!(result, Err(DigestError::Source(_))));
}

#[tokio::test]
async fn test_builder_requires_collaborators() {
    let result = PipelineBuilder::new().build();
    assert!(matches!(result, Err(DigestError::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn test_nothing_relevant_after_filter_sends_nothing() {
    let html = r#"<a href="https://example.com/offtopic">Exercise gear buying guide for runners</a>"#;
    let harness = Harness::new(&[html]);
    let summary = harness.pipeline().run().await.unwrap();
    
    assert_eq!(summary.scraped, 1);
    assert_eq!(summary.relevant, 0);
    assert!(harness.messenger.sent().is_empty());
    assert!(!harness.messenger.sent().iter().any(|s| matches!(s, Sent::Message(m) if m.text == NO_ARTICLES_NOTICE)));
}
