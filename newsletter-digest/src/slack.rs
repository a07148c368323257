use crate::types::{DigestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Slack Block Kit blocks used by the digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: TextObject },
    Divider,
    Section { text: TextObject },
    Context { elements: Vec<TextObject> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::PlainText { text, .. } | Self::Mrkdwn { text } => text,
        }
    }
}

/// A message body: plain-text fallback plus optional rich blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub blocks: Vec<Block>,
}

impl OutgoingMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(text: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            text: text.into(),
            blocks,
        }
    }
}

/// Identifies a posted message; replies thread under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the digest gets delivered.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn post_message(&self, message: &OutgoingMessage) -> Result<MessageId>;

    async fn post_reply(&self, parent: &MessageId, message: &OutgoingMessage) -> Result<MessageId>;
}

/// Escape the characters Slack mrkdwn treats as control sequences.
pub fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "no_blocks")]
    blocks: &'a [Block],
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

fn no_blocks(blocks: &&[Block]) -> bool {
    blocks.is_empty()
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

/// Posts through the Slack Web API `chat.postMessage` method.
pub struct SlackMessenger {
    client: Client,
    api_url: String,
    token: String,
    channel: String,
}

impl SlackMessenger {
    pub fn new(token: String, channel: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            api_url: DEFAULT_SLACK_API_URL.to_string(),
            token,
            channel,
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }
    
    async fn post(&self, message: &OutgoingMessage, thread_ts: Option<&str>) -> Result<MessageId> {
        let request = PostMessageRequest {
            channel: &self.channel,
            text: &message.text,
            blocks: &message.blocks,
            thread_ts,
        };
        
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;
        
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Dispatch(format!("Slack returned HTTP {}", status.as_u16())));
        }
        
        let body: PostMessageResponse = response.json().await?;
        parse_post_response(body)
    }
}

fn parse_post_response(body: PostMessageResponse) -> Result<MessageId> {
    if !body.ok {
        return Err(DigestError::Dispatch(
            body.error.unwrap_or_else(|| "unknown Slack error".to_string()),
        ));
    }
    
    body.ts
        .map(MessageId)
        .ok_or_else(|| DigestError::Dispatch("Slack response missing ts".to_string()))
}

#[async_trait]
impl Messenger for SlackMessenger {
    async fn post_message(&self, message: &OutgoingMessage) -> Result<MessageId> {
        let id = self.post(message, None).await?;
        debug!("Posted message {} to {}", id, self.channel);
        Ok(id)
    }

    async fn post_reply(&self, parent: &MessageId, message: &OutgoingMessage) -> Result<MessageId> {
        let id = self.post(message, Some(&parent.0)).await?;
        debug!("Posted reply {} under {}", id, parent);
        Ok(id)
    }
}

/// Dry-run messenger: writes messages to the log instead of posting them.
#[derive(Default)]
pub struct LogMessenger {
    next_id: AtomicU64,
}

impl LogMessenger {
    pub fn new() -> Self {
        Self::default()
    }
    
    fn next_id(&self) -> MessageId {
        MessageId(format!("dry-run-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

pub fn render_plain(message: &OutgoingMessage) -> String {
    if message.blocks.is_empty() {
        return message.text.clone();
    }
    
    message
        .blocks
        .iter()
        .map(|block| match block {
            Block::Header { text } | Block::Section { text } => text.text().to_string(),
            Block::Divider => "----".to_string(),
            Block::Context { elements } => elements
                .iter()
                .map(TextObject::text)
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Messenger for LogMessenger {
    async fn post_message(&self, message: &OutgoingMessage) -> Result<MessageId> {
        let id = self.next_id();
        info!(id = %id, "[dry-run] message\n{}", render_plain(message));
        Ok(id)
    }

    async fn post_reply(&self, parent: &MessageId, message: &OutgoingMessage) -> Result<MessageId> {
        let id = self.next_id();
        info!(id = %id, parent = %parent, "[dry-run] reply\n{}", render_plain(message));
        Ok(id)
    }
}
