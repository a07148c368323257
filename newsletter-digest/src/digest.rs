use crate::article_scraper::truncate_chars;
use crate::slack::{escape_mrkdwn, Block, Messenger, OutgoingMessage, TextObject};
use crate::types::{DigestConfig, DigestError, Result, TranslatedArticle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

pub const NO_ARTICLES_NOTICE: &str = "오늘은 관련 뉴스레터 기사가 없습니다.";

/// Outcome of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Delivers translated articles as one header message with a threaded
/// reply per article.
pub struct DigestDispatcher {
    messenger: Arc<dyn Messenger>,
    config: DigestConfig,
}

impl DigestDispatcher {
    pub fn new(messenger: Arc<dyn Messenger>, config: DigestConfig) -> Self {
        Self { messenger, config }
    }

    /// Send the digest. Failing to post the header (or the empty-day
    /// notice) is an error; a failed article reply is logged and skipped.
    pub async fn dispatch(&self, articles: &[TranslatedArticle]) -> Result<DispatchReport> {
        if articles.is_empty() {
            info!("No articles to send, posting notice");
            self.messenger
                .post_message(&OutgoingMessage::plain(NO_ARTICLES_NOTICE))
                .await
                .map_err(|e| DigestError::Dispatch(format!("notice not sent: {}", e)))?;
            return Ok(DispatchReport::default());
        }
        
        let header = header_message(articles.len());
        let thread = self
            .messenger
            .post_message(&header)
            .await
            .map_err(|e| DigestError::Dispatch(format!("header not sent: {}", e)))?;
        
        let mut report = DispatchReport::default();
        for article in articles {
            let message = article_message(article, self.config.preview_length);
            match self.messenger.post_reply(&thread, &message).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    error!(url = %article.url, "Failed to send article to Slack: {}", e);
                    report.failed += 1;
                }
            }
        }
        
        info!("Digest sent: {} articles, {} failures", report.sent, report.failed);
        Ok(report)
    }
}

pub fn header_text(count: usize) -> String {
    format!("🧠 오늘의 뇌과학 뉴스레터 ({}건)", count)
}

pub fn header_message(count: usize) -> OutgoingMessage {
    let text = header_text(count);
    OutgoingMessage::with_blocks(
        text.clone(),
        vec![Block::Header { text: TextObject::plain(text) }, Block::Divider],
    )
}

/// Source and author, e.g. `*출처:* Brain Daily | *저자:* Jane`. `None`
/// when the article has neither.
pub fn metadata_line(article: &TranslatedArticle) -> Option<String> {
    let parts: Vec<String> = [
        article.site_name.as_deref().map(|site| format!("*출처:* {}", escape_mrkdwn(site))),
        article.author.as_deref().map(|author| format!("*저자:* {}", escape_mrkdwn(author))),
    ]
    .into_iter()
    .flatten()
    .collect();
    
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

pub fn preview(content: &str, preview_length: usize) -> String {
    truncate_chars(content, preview_length)
}

pub fn article_message(article: &TranslatedArticle, preview_length: usize) -> OutgoingMessage {
    let mut blocks = vec![Block::Section {
        text: TextObject::mrkdwn(format!(
            "*<{}|{}>*",
            article.url,
            escape_mrkdwn(&article.title)
        )),
    }];
    
    if let Some(meta) = metadata_line(article) {
        blocks.push(Block::Context {
            elements: vec![TextObject::mrkdwn(meta)],
        });
    }
    
    blocks.push(Block::Section {
        text: TextObject::mrkdwn(escape_mrkdwn(&preview(&article.content, preview_length))),
    });
    blocks.push(Block::Divider);
    
    OutgoingMessage::with_blocks(article.title.clone(), blocks)
}
