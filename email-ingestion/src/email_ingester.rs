use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use interfaces::defs::{NewsletterSource, RawNewsletter};
use mail_parser::{MessageParser, PartType};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Clone)]
pub struct EmailIngesterConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub mailbox: String,
    pub use_tls: bool,
    pub accept_invalid_certs: bool,
    pub accept_invalid_hostnames: bool,
    /// Only mail from these addresses counts as a newsletter.
    pub senders: Vec<String>,
    pub lookback_days: u32,
    pub max_messages: usize,
}

impl std::fmt::Debug for EmailIngesterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailIngesterConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("mailbox", &self.mailbox)
            .field("use_tls", &self.use_tls)
            .field("senders", &self.senders)
            .field("lookback_days", &self.lookback_days)
            .field("max_messages", &self.max_messages)
            .finish()
    }
}

impl EmailIngesterConfig {
    /// Parse mailbox configuration from a URI plus credentials.
    /// Expected URI format: email://username@server:port/mailbox?tls=true
    pub fn from_uri(uri: &str, password: &str, senders: Vec<String>) -> Result<Self> {
        let parsed_uri = Url::parse(uri)
            .map_err(|e| anyhow::anyhow!("Invalid email URI '{}': {}", uri, e))?;

        if parsed_uri.scheme() != "email" {
            return Err(anyhow::anyhow!("URI must use 'email://' scheme, got: {}", parsed_uri.scheme()));
        }

        let server = parsed_uri.host_str()
            .ok_or_else(|| anyhow::anyhow!("No server specified in URI: {}", uri))?
            .to_string();

        let port = parsed_uri.port().unwrap_or(993); // Default to IMAPS port

        // Gmail style usernames arrive percent-encoded (user%40gmail.com@imap.gmail.com)
        let username = parsed_uri.username().replace("%40", "@");
        if username.is_empty() {
            return Err(anyhow::anyhow!("No username in URI: {}", uri));
        }

        let mailbox = {
            let path = parsed_uri.path().trim_start_matches('/');
            if path.is_empty() {
                "INBOX".to_string()
            } else {
                path.to_string()
            }
        };

        let flag = |name: &str, default: bool| {
            parsed_uri.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.parse().unwrap_or(default))
                .unwrap_or(default)
        };

        // Trust relaxations are only meant for local test servers
        let use_tls = flag("tls", true);
        let accept_invalid_certs = flag("accept_invalid_certs", false);
        let accept_invalid_hostnames = flag("accept_invalid_hostnames", false);

        let senders: Vec<String> = senders
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if senders.is_empty() {
            return Err(anyhow::anyhow!("At least one newsletter sender is required"));
        }

        Ok(Self {
            server,
            port,
            username,
            password: password.to_string(),
            mailbox,
            use_tls,
            accept_invalid_certs,
            accept_invalid_hostnames,
            senders,
            lookback_days: 1,
            max_messages: 20,
        })
    }

    pub fn with_window(mut self, lookback_days: u32, max_messages: usize) -> Self {
        self.lookback_days = lookback_days.max(1);
        self.max_messages = max_messages.max(1);
        self
    }
}

/// Newsletter source backed by an IMAP mailbox.
pub struct EmailIngester {
    config: EmailIngesterConfig,
}

impl EmailIngester {
    pub fn with_config(config: EmailIngesterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmailIngesterConfig {
        &self.config
    }
}

#[async_trait]
impl NewsletterSource for EmailIngester {
    fn source_name(&self) -> String {
        format!("imap://{}/{}", self.config.server, self.config.mailbox)
    }

    async fn fetch_newsletters(&self) -> Result<Vec<RawNewsletter>> {
        let config = self.config.clone();
        // The imap crate is blocking; keep it off the async workers.
        let newsletters = tokio::task::spawn_blocking(move || fetch_from_imap_server(&config))
            .await
            .map_err(|e| anyhow::anyhow!("IMAP task panicked: {}", e))??;

        info!("Fetched {} newsletters from {}", newsletters.len(), self.source_name());
        Ok(newsletters)
    }
}

fn fetch_from_imap_server(config: &EmailIngesterConfig) -> Result<Vec<RawNewsletter>> {
    let tls = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .danger_accept_invalid_hostnames(config.accept_invalid_hostnames)
        .build()?;

    let client = if config.use_tls {
        imap::connect((config.server.as_str(), config.port), &config.server, &tls)?
    } else {
        imap::connect_starttls((config.server.as_str(), config.port), &config.server, &tls)?
    };

    let mut imap_session = client.login(&config.username, &config.password)
        .map_err(|(e, _client)| anyhow::anyhow!("Login failed for {}: {}", config.username, e))?;
    imap_session.select(&config.mailbox)?;

    let since = (Utc::now() - Duration::days(i64::from(config.lookback_days))).date_naive();
    let search_criteria = build_search_query(&config.senders, since);
    info!("Searching {} with: {}", config.mailbox, search_criteria);

    let message_ids = imap_session.search(&search_criteria)?;

    // Highest sequence numbers are the most recent messages
    let mut limited_ids: Vec<u32> = message_ids.into_iter().collect();
    limited_ids.sort_unstable();
    let skip = limited_ids.len().saturating_sub(config.max_messages);
    let limited_ids = &limited_ids[skip..];

    let mut newsletters = Vec::new();

    if limited_ids.is_empty() {
        info!("No new newsletters found");
        imap_session.logout()?;
        return Ok(newsletters);
    }

    let sequence_set = limited_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let messages = imap_session.fetch(&sequence_set, "(UID RFC822)")?;

    for message in messages.iter() {
        let Some(body) = message.body() else {
            warn!("Message {} has no body", message.message);
            continue;
        };

        let fallback_id = message.uid.unwrap_or(message.message).to_string();
        match parse_newsletter(&fallback_id, body) {
            Some(newsletter) => newsletters.push(newsletter),
            None => warn!("No HTML body found in message {}", fallback_id),
        }
    }

    imap_session.logout()?;
    Ok(newsletters)
}

/// Build an IMAP SEARCH query: messages since `since` from any of `senders`.
pub fn build_search_query(senders: &[String], since: NaiveDate) -> String {
    let since_clause = format!("SINCE {}", since.format("%d-%b-%Y"));
    match sender_criteria(senders) {
        Some(from) => format!("{} {}", since_clause, from),
        None => since_clause,
    }
}

// IMAP OR is binary, so n senders nest as OR a (OR b c).
fn sender_criteria(senders: &[String]) -> Option<String> {
    match senders {
        [] => None,
        [single] => Some(format!("FROM \"{}\"", quote_imap(single))),
        [first, rest @ ..] => {
            let rest = sender_criteria(rest)?;
            Some(format!("OR FROM \"{}\" {}", quote_imap(first), rest))
        }
    }
}

fn quote_imap(value: &str) -> String {
    value.chars().filter(|c| *c != '"' && *c != '\\').collect()
}

/// Turn one RFC 822 message into a newsletter. Messages without an HTML part
/// are not newsletters and yield `None`.
pub fn parse_newsletter(fallback_id: &str, raw: &[u8]) -> Option<RawNewsletter> {
    let parsed = MessageParser::default().parse(raw)?;

    let html_body = parsed.html_part(0).and_then(|part| match &part.body {
        PartType::Html(html) => Some(html.to_string()),
        _ => None,
    })?;

    let from = parsed.from()
        .and_then(|addrs| addrs.first())
        .and_then(|addr| addr.address.as_ref())
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let subject = parsed.subject().unwrap_or("(No Subject)").to_string();
    let date = parsed.date().map(|d| d.to_rfc3339()).unwrap_or_default();
    let id = parsed.message_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| fallback_id.to_string());

    debug!("Parsed newsletter {} from {}: {}", id, from, subject);

    Some(RawNewsletter {
        id,
        from,
        subject,
        date,
        html_body,
    })
}
