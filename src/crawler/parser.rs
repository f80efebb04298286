//! HTML parser for rendered pages
//!
//! This module handles parsing rendered HTML to extract:
//! - Anchor hrefs, exactly as written in the document
//! - The page title
//! - The ordered, deduplicated link list of a page

use crate::url::resolve_link;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Parses a full HTML document
pub fn parse_html(html: &str) -> Html {
    Html::parse_document(html)
}

/// Extracts the page title from the `<title>` tag
pub fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts the raw `href` of every anchor, in document order
///
/// Anchors carrying the `download` attribute point at files, not pages,
/// and are skipped.
pub fn extract_hrefs(document: &Html) -> Vec<String> {
    let mut hrefs = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                hrefs.push(href.to_string());
            }
        }
    }

    hrefs
}

/// Parses `html` and returns its anchor hrefs
pub fn collect_hrefs(html: &str) -> Vec<String> {
    extract_hrefs(&parse_html(html))
}

/// Parses `html` and returns its title
pub fn page_title(html: &str) -> Option<String> {
    extract_title(&parse_html(html))
}

/// Turns raw hrefs into the link list of a page
///
/// Each href is resolved against `base_url` (the final URL after
/// redirects) and normalized. Non-HTTP(S) and fragment-only links are
/// dropped, and duplicates are removed keeping the first occurrence.
pub fn resolve_links(hrefs: &[String], base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in hrefs {
        if let Some(absolute_url) = resolve_link(href, base_url) {
            let link = absolute_url.to_string();
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    links
}
