//! Readable-content extraction
//!
//! Turns a rendered document into an [`Article`]: the main content with
//! boilerplate stripped, its plain text and markdown, and the descriptive
//! metadata a reader cares about.

use crate::config::ExtractionConfig;
use crate::crawler::parser::extract_title;
use crate::ExtractionError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Title reported when a document has neither `<title>` nor `<h1>`
pub const NO_TITLE: &str = "No Title";

/// Candidate roots of the main content, most specific first
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    "#content",
    "#main-content",
    "#main",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".content",
    "body",
];

const BOILERPLATE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "iframe",
    "form",
    "nav",
    "header",
    "footer",
    "aside",
    ".navbar",
    ".sidebar",
    ".menu",
    ".advertisement",
    ".ads",
    "#sidebar",
];

const EXCERPT_SELECTORS: &[&str] = &[
    "meta[name='description']",
    "meta[property='og:description']",
];

/// A readable article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    /// Sanitized HTML of the main content
    pub content: String,
    pub text_content: String,
    pub markdown: String,
    pub excerpt: Option<String>,
    pub byline: Option<String>,
    pub language: String,
}

/// Content extraction capability used by the pipeline
pub trait ContentExtractor: Send + Sync {
    /// Returns the readable article of `html`, or
    /// [`ExtractionError::NoReadableContent`] when there is none
    fn extract(&self, html: &str, base_url: &Url) -> Result<Article, ExtractionError>;
}

/// Heuristic main-content extractor
#[derive(Debug, Clone)]
pub struct ReadableExtractor {
    config: ExtractionConfig,
}

impl ReadableExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }
}

impl Default for ReadableExtractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl ContentExtractor for ReadableExtractor {
    fn extract(&self, html: &str, base_url: &Url) -> Result<Article, ExtractionError> {
        let document = Html::parse_document(html);
        let no_content = || ExtractionError::NoReadableContent {
            url: base_url.to_string(),
        };

        let root = main_content(&document).ok_or_else(no_content)?;
        let content = remove_boilerplate(root);
        let fragment = Html::parse_fragment(&content);
        let text_content = collapse_whitespace(fragment.root_element().text());

        if text_content.is_empty() || text_content.chars().count() < self.config.min_content_length
        {
            return Err(no_content());
        }

        let title = extract_title(&document)
            .or_else(|| first_text(&document, "h1"))
            .unwrap_or_else(|| NO_TITLE.to_string());

        let excerpt = EXCERPT_SELECTORS
            .iter()
            .find_map(|selector| meta_content(&document, selector))
            .or_else(|| first_text(&fragment, "p"));

        let byline = meta_content(&document, "meta[name='author']")
            .or_else(|| first_text(&document, "[rel='author']"))
            .or_else(|| first_text(&document, ".byline"));

        let language = document_language(&document)
            .unwrap_or_else(|| self.config.default_language.clone());

        let markdown = html2md::parse_html(&content).trim().to_string();

        Ok(Article {
            title,
            content,
            text_content,
            markdown,
            excerpt,
            byline,
            language,
        })
    }
}

/// Picks the first candidate root that exists in the document
fn main_content(document: &Html) -> Option<ElementRef<'_>> {
    CONTENT_SELECTORS.iter().find_map(|selector_str| {
        let selector = Selector::parse(selector_str).ok()?;
        document.select(&selector).next()
    })
}

/// Returns the inner HTML of `root` without boilerplate elements
///
/// Only the outermost match of a nested pair is removed; its serialization
/// already contains the inner one.
fn remove_boilerplate(root: ElementRef<'_>) -> String {
    let mut result = root.inner_html();
    let Ok(selector) = Selector::parse(&BOILERPLATE_SELECTORS.join(", ")) else {
        return result;
    };

    for element in root.select(&selector) {
        if element.id() == root.id() {
            continue;
        }

        let nested = element
            .ancestors()
            .take_while(|node| node.id() != root.id())
            .filter_map(ElementRef::wrap)
            .any(|ancestor| selector.matches(&ancestor));
        if !nested {
            result = result.replace(&element.html(), "");
        }
    }

    result
}

fn collapse_whitespace<'a>(text: impl Iterator<Item = &'a str>) -> String {
    text.flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .map(|el| collapse_whitespace(el.text()))
        .find(|text| !text.is_empty())
}

fn meta_content(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

fn document_language(document: &Html) -> Option<String> {
    let selector = Selector::parse("html[lang]").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
}
