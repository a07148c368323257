//! Readable-content extraction: the main text of an article page plus its
//! title, byline and site name.

use crate::parser::{collapse_whitespace, visible_text};
use scraper::{ElementRef, Html, Selector};

const ROOT_SELECTORS: [&str; 8] = [
    "article",
    "main",
    "[role='main']",
    "#content",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".content",
];

const SKIPPED_TAGS: [&str; 11] = [
    "nav", "header", "footer", "aside", "script", "style", "noscript", "iframe", "form", "button",
    "svg",
];

const BLOCK_TAGS: [&str; 10] = ["p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre"];

const INLINE_TAGS: [&str; 16] = [
    "a", "abbr", "b", "br", "cite", "code", "em", "i", "mark", "q", "small", "span", "strong",
    "sub", "sup", "time",
];

const BOILERPLATE_MARKERS: [&str; 12] = [
    "nav", "menu", "sidebar", "footer", "header", "advert", "promo", "share", "social", "comment",
    "related", "newsletter",
];

const MAX_LINK_DENSITY: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadableContent {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub site_name: Option<String>,
    pub text: String,
}

/// Extract the readable part of `html`. Returns `None` when no text survives.
///
/// Every content-root candidate outside navigation and boilerplate is
/// scored by the amount of text it yields; the best one wins and `<body>`
/// is only used when no candidate has any text.
pub fn extract_readable(html: &str) -> Option<ReadableContent> {
    let document = Html::parse_document(html);
    
    let text = best_candidate(&document)
        .or_else(|| {
            let body = Selector::parse("body").ok()?;
            document.select(&body).next().map(paragraphs_of)
        })
        .map(|paragraphs| paragraphs.join("\n\n"))
        .filter(|text| !text.trim().is_empty())?;
    
    Some(ReadableContent {
        title: extract_title(&document),
        byline: extract_byline(&document),
        site_name: meta_content(&document, "meta[property='og:site_name']"),
        text,
    })
}

fn best_candidate(document: &Html) -> Option<Vec<String>> {
    let mut best: Option<(usize, Vec<String>)> = None;
    
    let candidates = ROOT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .flat_map(|selector| document.select(&selector).collect::<Vec<_>>());
    
    for candidate in candidates {
        if is_excluded(candidate) {
            continue;
        }
        
        let paragraphs = paragraphs_of(candidate);
        let score: usize = paragraphs.iter().map(|p| p.chars().count()).sum();
        
        // Ties keep the earlier, more specific candidate.
        if score > 0 && best.as_ref().map_or(true, |(top, _)| score > *top) {
            best = Some((score, paragraphs));
        }
    }
    
    best.map(|(_, paragraphs)| paragraphs)
}

fn is_excluded(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| SKIPPED_TAGS.contains(&el.value().name()) || looks_like_boilerplate(el))
}

fn paragraphs_of(root: ElementRef<'_>) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut pending = Pending::default();
    collect_paragraphs(root, &mut pending, &mut paragraphs);
    pending.flush(&mut paragraphs);
    paragraphs
}

/// Loose text and inline elements waiting to become a paragraph.
#[derive(Default)]
struct Pending {
    text: String,
    link_chars: usize,
}

impl Pending {
    fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn flush(&mut self, out: &mut Vec<String>) {
        let text = collapse_whitespace(&self.text);
        let density = self.link_chars as f64 / text.chars().count().max(1) as f64;
        
        if !text.is_empty() && density <= MAX_LINK_DENSITY {
            out.push(text);
        }
        
        *self = Pending::default();
    }
}

fn collect_paragraphs(element: ElementRef<'_>, pending: &mut Pending, out: &mut Vec<String>) {
    for node in element.children() {
        let Some(child) = ElementRef::wrap(node) else {
            if let Some(text) = node.value().as_text() {
                pending.push(text);
            }
            continue;
        };
        
        let name = child.value().name();
        
        if SKIPPED_TAGS.contains(&name) || looks_like_boilerplate(child) {
            continue;
        }
        
        if name == "br" {
            pending.push(" ");
        } else if INLINE_TAGS.contains(&name) {
            pending.link_chars += if name == "a" {
                visible_text(child).chars().count()
            } else {
                link_chars(child)
            };
            pending.push(&child.text().collect::<String>());
        } else if BLOCK_TAGS.contains(&name) {
            pending.flush(out);
            let text = visible_text(child);
            if !text.is_empty() && link_density(child, &text) <= MAX_LINK_DENSITY {
                out.push(text);
            }
        } else {
            pending.flush(out);
            collect_paragraphs(child, pending, out);
            pending.flush(out);
        }
    }
}

fn looks_like_boilerplate(element: ElementRef<'_>) -> bool {
    let value = element.value();
    let mut names = value.classes().chain(value.id());
    
    names.any(|name| {
        let name = name.to_lowercase();
        BOILERPLATE_MARKERS.iter().any(|marker| name.contains(marker))
    })
}

fn link_chars(element: ElementRef<'_>) -> usize {
    let Ok(selector) = Selector::parse("a") else {
        return 0;
    };
    
    element
        .select(&selector)
        .map(|a| visible_text(a).chars().count())
        .sum()
}

fn link_density(element: ElementRef<'_>, text: &str) -> f64 {
    link_chars(element) as f64 / text.chars().count().max(1) as f64
}

fn extract_title(document: &Html) -> Option<String> {
    meta_content(document, "meta[property='og:title']")
        .or_else(|| first_text(document, "h1"))
        .or_else(|| first_text(document, "title"))
}

fn extract_byline(document: &Html) -> Option<String> {
    meta_content(document, "meta[name='author']")
        .or_else(|| first_text(document, "[rel='author']"))
        .or_else(|| first_text(document, ".byline"))
        .or_else(|| first_text(document, ".author"))
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(visible_text)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"
        <html>
          <head>
            <title>Fallback title | Brain Daily</title>
            <meta property="og:title" content="Walking slows memory decline">
            <meta property="og:site_name" content="Brain Daily">
            <meta name="author" content="Jane Park">
          </head>
          <body>
            <nav><a href="/">Home</a> <a href="/news">News</a></nav>
            <article>
              <h1>Walking slows memory decline</h1>
              <p>A ten year study followed 2,000 adults.</p>
              <div class="share-buttons"><p>Share on every network</p></div>
              <p>Those who walked daily kept sharper memory.</p>
              <p><a href="/a">Related</a> <a href="/b">Links</a></p>
              <script>var x = 1;</script>
            </article>
            <footer><p>Copyright</p></footer>
          </body>
        </html>
    "#;

    #[test]
    fn test_extracts_main_text_and_metadata() {
        let content = extract_readable(ARTICLE).unwrap();
        
        assert_eq!(content.title.as_deref(), Some("Walking slows memory decline"));
        assert_eq!(content.byline.as_deref(), Some("Jane Park"));
        assert_eq!(content.site_name.as_deref(), Some("Brain Daily"));
        assert_eq!(
            content.text,
            "Walking slows memory decline\n\nA ten year study followed 2,000 adults.\n\nThose who walked daily kept sharper memory."
        );
    }

    #[test]
    fn test_falls_back_to_body_text() {
        let html = "<html><body><div>Plain text page about attention</div></body></html>";
        let content = extract_readable(html).unwrap();
        
        assert_eq!(content.text, "Plain text page about attention");
        assert_eq!(content.title, None);
        assert_eq!(content.byline, None);
    }

    #[test]
    fn test_title_falls_back_to_title_tag() {
        let html = "<html><head><title>Only a title</title></head><body><p>Body</p></body></html>";
        let content = extract_readable(html).unwrap();
        assert_eq!(content.title.as_deref(), Some("Only a title"));
    }

    #[test]
    fn test_empty_page_yields_none() {
        assert!(extract_readable("<html><body>   </body></html>").is_none());
        assert!(extract_readable("").is_none());
    }

    #[test]
    fn test_loose_container_text_survives_next_to_caption() {
        let html = "<html><body><article>\
            <div>Researchers followed 1,200 adults for eight years and found daily walking slowed memory decline.</div>\
            <p>Photo: Getty.</p>\
            </article></body></html>";
        let content = extract_readable(html).unwrap();
        
        assert_eq!(
            content.text,
            "Researchers followed 1,200 adults for eight years and found daily walking slowed memory decline.\n\nPhoto: Getty."
        );
    }

    #[test]
    fn test_inline_text_joins_its_paragraph() {
        let html = "<html><body><main><section>Sleep <em>deeply</em> and memory \
            <a href=\"/s\">consolidates</a> overnight.<figure><p>Chart</p></figure></section></main></body></html>";
        let content = extract_readable(html).unwrap();
        
        assert_eq!(content.text, "Sleep deeply and memory consolidates overnight.\n\nChart");
    }

    #[test]
    fn test_article_inside_aside_is_not_the_root() {
        let html = "<html><body>\
            <aside><article><p>Sponsored: buy vitamins</p></article></aside>\
            <main><article><p>Exercise improves attention in children.</p></article></main>\
            </body></html>";
        let content = extract_readable(html).unwrap();
        
        assert_eq!(content.text, "Exercise improves attention in children.");
    }

    #[test]
    fn test_longest_candidate_wins_over_teaser() {
        let html = "<html><body>\
            <article class=\"teaser\"><p>Short teaser.</p></article>\
            <div id=\"content\"><p>The full report describes how aerobic exercise raised hippocampal volume.</p>\
            <p>Participants trained three times a week.</p></div>\
            </body></html>";
        let content = extract_readable(html).unwrap();
        
        assert!(content.text.starts_with("The full report"));
        assert!(!content.text.contains("Short teaser"));
    }
}
