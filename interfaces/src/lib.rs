pub mod defs;

pub use defs::{
    CandidateLink, NewsletterSource, RawNewsletter, ResolvedLink, ScrapedArticle,
    TranslatedArticle,
};
