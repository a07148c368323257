#![allow(dead_code)]

use async_trait::async_trait;
use newsletter_digest::slack::{MessageId, OutgoingMessage};
use newsletter_digest::{
    DigestError, Messenger, NewsletterSource, PageFetcher, RawNewsletter, Result, TranslationBackend,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn newsletter(id: &str, html: &str) -> RawNewsletter {
    RawNewsletter {
        id: id.to_string(),
        from: "news@brainweekly.org".to_string(),
        subject: format!("Issue {}", id),
        date: "2026-10-18T07:00:00+00:00".to_string(),
        html_body: html.to_string(),
    }
}

pub fn article_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><meta property=\"og:title\" content=\"{title}\">\
         <meta property=\"og:site_name\" content=\"Brain Daily\"></head>\
         <body><article><p>{body}</p></article></body></html>"
    )
}

pub struct FakeSource {
    pub newsletters: Vec<RawNewsletter>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(newsletters: Vec<RawNewsletter>) -> Self {
        Self {
            newsletters,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl NewsletterSource for FakeSource {
    fn source_name(&self) -> String {
        "fake-mailbox".to_string()
    }

    async fn fetch_newsletters(&self) -> anyhow::Result<Vec<RawNewsletter>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.newsletters.clone())
    }
}

pub struct FailingSource;

#[async_trait]
impl NewsletterSource for FailingSource {
    fn source_name(&self) -> String {
        "broken-mailbox".to_string()
    }

    async fn fetch_newsletters(&self) -> anyhow::Result<Vec<RawNewsletter>> {
        Err(anyhow::anyhow!("invalid credentials"))
    }
}

/// Serves canned pages and redirects; tracks how many fetches overlap.
/// Deadlines passed in are ignored, so timeouts must come from the caller.
#[derive(Default)]
pub struct FakeFetcher {
    pub pages: HashMap<String, String>,
    pub redirects: HashMap<String, String>,
    pub fetch_delay: Duration,
    pub slow_urls: HashMap<String, Duration>,
    pub resolve_delay: Duration,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub resolve_calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: &str, html: String) -> Self {
        self.pages.insert(url.to_string(), html);
        self
    }

    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn with_slow_page(mut self, url: &str, html: String, delay: Duration) -> Self {
        self.slow_urls.insert(url.to_string(), delay);
        self.with_page(url, html)
    }

    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = delay;
        self
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn resolve_final_url(&self, url: &str, _deadline: Duration) -> Result<String> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.resolve_delay).await;
        if url.contains("unreachable") {
            return Err(DigestError::Fetch {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.redirects.get(url).cloned().unwrap_or_else(|| url.to_string()))
    }

    async fn fetch_html(&self, url: &str, _deadline: Duration) -> Result<String> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);
        
        let delay = self.slow_urls.get(url).copied().unwrap_or(self.fetch_delay);
        tokio::time::sleep(delay).await;
        
        self.pages.get(url).cloned().ok_or_else(|| DigestError::Fetch {
            url: url.to_string(),
            reason: "HTTP 404: Not Found".to_string(),
        })
    }
}

/// Prefixes text instead of translating it.
#[derive(Default)]
pub struct PrefixTranslator {
    pub calls: AtomicUsize,
    pub always_fail: bool,
}

#[async_trait]
impl TranslationBackend for PrefixTranslator {
    fn backend_name(&self) -> String {
        "prefix".to_string()
    }

    async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail {
            return Err(DigestError::Translation("quota exceeded".to_string()));
        }
        Ok(format!("[{}] {}", target, text))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message(OutgoingMessage),
    Reply(MessageId, OutgoingMessage),
}

/// Records everything it is asked to post.
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<Sent>>,
    /// Replies whose fallback text contains this fail.
    pub fail_replies_containing: Option<String>,
    pub fail_messages: bool,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<OutgoingMessage> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reply(_, message) => Some(message),
                Sent::Message(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn post_message(&self, message: &OutgoingMessage) -> Result<MessageId> {
        if self.fail_messages {
            return Err(DigestError::Dispatch("not_authed".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent::Message(message.clone()));
        Ok(MessageId(format!("ts-{}", sent.len())))
    }

    async fn post_reply(&self, parent: &MessageId, message: &OutgoingMessage) -> Result<MessageId> {
        if let Some(needle) = &self.fail_replies_containing {
            if message.text.contains(needle.as_str()) {
                return Err(DigestError::Dispatch("rate_limited".to_string()));
            }
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent::Reply(parent.clone(), message.clone()));
        Ok(MessageId(format!("ts-{}", sent.len())))
    }
}
