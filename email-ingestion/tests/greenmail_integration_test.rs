use anyhow::Result;
use email_ingestion::{EmailIngester, EmailIngesterConfig};
use interfaces::NewsletterSource;

use greenmail_helper::{create_test_newsletters, wait_for_server_ready, GreenMailHelper};

const GREENMAIL_IMAP_URI: &str =
    "email://test@localhost:3993/INBOX?tls=true&accept_invalid_certs=true&accept_invalid_hostnames=true";

// Needs a local GreenMail container; see wait_for_server_ready for the command.
#[tokio::test]
#[ignore]
async fn test_fetches_only_configured_senders() -> Result<()> {
    wait_for_server_ready(10).await?;
    let greenmail = GreenMailHelper::new();
    greenmail.reset_server().await?;

    for newsletter in create_test_newsletters() {
        greenmail.send_newsletter(&newsletter).await?;
    }
    tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;

    let config = EmailIngesterConfig::from_uri(
        GREENMAIL_IMAP_URI,
        "test_password",
        vec!["news@brainweekly.org".to_string()],
    )?
    .with_window(1, 10);

    assert_eq!(config.port, 3993);
    assert!(config.accept_invalid_certs);

    let ingester = EmailIngester::with_config(config);
    let newsletters = ingester.fetch_newsletters().await?;

    assert_eq!(newsletters.len(), 1);
    assert_eq!(newsletters[0].from, "news@brainweekly.org");
    assert!(newsletters[0].html_body.contains("dementia"));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_is_an_error() {
    let config = EmailIngesterConfig::from_uri(
        "email://nobody@127.0.0.1:9/INBOX?tls=false",
        "x",
        vec!["news@brainweekly.org".to_string()],
    )
    .unwrap();

    let result = EmailIngester::with_config(config).fetch_newsletters().await;
    assert!(result.is_err());
}
