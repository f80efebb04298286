//! Fetch & extract pipeline
//!
//! One [`Pipeline`] per worker. It owns the worker's [`PageFetcher`] and
//! turns a URL into a [`FetchResult`], in full or links-only mode.

use crate::config::Config;
use crate::crawler::browser::{BrowserSession, PageFetcher};
use crate::crawler::extractor::{ContentExtractor, ReadableExtractor, NO_TITLE};
use crate::crawler::parser::{page_title, resolve_links};
use crate::PipelineError;
use serde::{Deserialize, Serialize};
use url::Url;

/// What the pipeline extracts from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Readable article, markdown and metadata
    Full,
    /// Title and links only
    LinksOnly,
}

/// Descriptive metadata of an extracted page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub excerpt: Option<String>,
    pub byline: Option<String>,
    pub language: String,
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// The URL that was requested
    pub url: String,
    pub title: String,
    /// Absolute, normalized, without duplicates, in first-seen order
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
}

pub struct Pipeline {
    fetcher: Box<dyn PageFetcher>,
    extractor: Box<dyn ContentExtractor>,
}

impl Pipeline {
    pub fn new(fetcher: Box<dyn PageFetcher>, extractor: Box<dyn ContentExtractor>) -> Self {
        Self { fetcher, extractor }
    }

    /// Builds a pipeline backed by a fresh browser session
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Box::new(BrowserSession::new(config.browser.clone())),
            Box::new(ReadableExtractor::new(config.extraction.clone())),
        )
    }

    /// Fetches `url` and extracts it according to `mode`
    ///
    /// A page without readable content fails the whole run in
    /// [`ExtractMode::Full`]; there is no partial result.
    pub async fn run(&mut self, url: &Url, mode: ExtractMode) -> Result<FetchResult, PipelineError> {
        let page = self.fetcher.fetch(url).await?;
        let links = resolve_links(&page.hrefs, &page.final_url);

        tracing::debug!("Fetched {} ({} links)", page.final_url, links.len());

        match mode {
            ExtractMode::LinksOnly => Ok(FetchResult {
                url: url.to_string(),
                title: page_title(&page.html).unwrap_or_else(|| NO_TITLE.to_string()),
                links,
                html: None,
                markdown: None,
                metadata: None,
            }),
            ExtractMode::Full => {
                let article = self.extractor.extract(&page.html, &page.final_url)?;

                Ok(FetchResult {
                    url: url.to_string(),
                    title: article.title,
                    links,
                    html: Some(page.html),
                    markdown: Some(article.markdown),
                    metadata: Some(PageMetadata {
                        excerpt: article.excerpt,
                        byline: article.byline,
                        language: article.language,
                    }),
                })
            }
        }
    }

    /// Releases the fetcher's execution context
    pub async fn shutdown(&mut self) {
        self.fetcher.shutdown().await;
    }
}
