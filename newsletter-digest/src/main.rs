use anyhow::Context;
use clap::{Parser, Subcommand};
use email_ingestion::{EmailIngester, EmailIngesterConfig};
use newsletter_digest::{
    parser::normalize_url, ArticleScraper, Config, ContentGenerator, Fetcher, GoogleTranslateBackend,
    HttpLlmAdapter, LogMessenger, Messenger, PipelineBuilder, ResolvedLink, SlackMessenger,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "newsletter-digest", about = "Turn brain-health newsletters into a translated Slack digest")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline once
    Run {
        /// Log the digest instead of posting it to Slack
        #[arg(long)]
        dry_run: bool,
    },
    /// Scrape one article and generate reels/card news/blog content for it
    Generate {
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    
    match cli.command {
        Command::Run { dry_run } => run(config, dry_run).await,
        Command::Generate { url } => generate(config, &url).await,
    }
}

async fn run(config: Config, dry_run: bool) -> anyhow::Result<()> {
    let mailbox = config.require_mailbox()?;
    let ingester_config = EmailIngesterConfig::from_uri(&mailbox.uri, &mailbox.password, mailbox.senders.clone())?
        .with_window(mailbox.lookback_days, mailbox.max_messages);
    info!("Reading newsletters from {} ({} senders)", ingester_config.server, ingester_config.senders.len());
    
    let messenger: Arc<dyn Messenger> = if dry_run {
        info!("Dry run: digest will be logged, not posted");
        Arc::new(LogMessenger::new())
    } else {
        let slack = config.require_slack()?;
        Arc::new(SlackMessenger::new(slack.token.clone(), slack.channel.clone())?.with_api_url(&slack.api_url))
    };
    
    let pipeline = PipelineBuilder::new()
        .source(Arc::new(EmailIngester::with_config(ingester_config)))
        .fetcher(Arc::new(Fetcher::new()?))
        .translation(Arc::new(GoogleTranslateBackend::new()?))
        .messenger(messenger)
        .config(config.pipeline.clone())
        .build()?;
    
    let summary = pipeline.run().await?;
    info!("Run summary: {}", serde_json::to_string(&summary)?);
    Ok(())
}

async fn generate(config: Config, url: &str) -> anyhow::Result<()> {
    let url = normalize_url(url).with_context(|| format!("Not a usable article URL: {}", url))?;
    let scraper = ArticleScraper::new(Arc::new(Fetcher::new()?), config.pipeline.scraper.clone());
    
    let link = ResolvedLink {
        title: url.clone(),
        url,
        snippet: String::new(),
    };
    let article = scraper.scrape_one(&link).await?;
    
    let adapter = HttpLlmAdapter::new(config.llm_provider()?)?;
    let generator = ContentGenerator::new(Arc::new(adapter), config.retry);
    let content = generator.generate_for_article(&article).await?;
    
    println!("# {}\n", article.title);
    println!("## 릴스 대본\n{}\n", content.reels_script);
    println!("## 카드 뉴스\n{}\n", content.card_news);
    println!("## 블로그 포스팅\n{}", content.blog_post);
    Ok(())
}
