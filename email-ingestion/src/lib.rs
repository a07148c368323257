pub mod email_ingester;

pub use email_ingester::{EmailIngester, EmailIngesterConfig};
