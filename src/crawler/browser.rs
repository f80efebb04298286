//! Browser session: the per-worker page fetching context
//!
//! A [`BrowserSession`] owns one execution context, created on the first
//! fetch and released by [`PageFetcher::shutdown`]. Every fetch opens a
//! [`Page`] that carries its own outbound identity and is closed on every
//! exit path, including timeouts.

use crate::config::BrowserConfig;
use crate::crawler::parser::collect_hrefs;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// A navigated page: the document and its anchors as rendered
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL after redirects; relative links resolve against it
    pub final_url: Url,
    pub html: String,
    /// Anchor hrefs in document order, unresolved
    pub hrefs: Vec<String>,
}

/// Fetch capability used by the pipeline
///
/// Implementations are owned by a single worker and are never called
/// concurrently.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&mut self, url: &Url) -> Result<RenderedPage, FetchError>;

    /// Releases the execution context; a later fetch creates a new one
    async fn shutdown(&mut self);
}

/// Outbound identity applied to a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
}

/// Round-robin user agent rotation plus browser-like default headers
#[derive(Debug, Clone)]
pub struct AntiDetectionProfile {
    user_agents: Vec<String>,
    accept_language: String,
    next: usize,
}

impl AntiDetectionProfile {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            user_agents: config.user_agents.clone(),
            accept_language: config.accept_language.clone(),
            next: 0,
        }
    }

    /// Picks the identity for the next page
    pub fn next_identity(&mut self) -> Identity {
        let user_agent = if self.user_agents.is_empty() {
            String::new()
        } else {
            let ua = self.user_agents[self.next % self.user_agents.len()].clone();
            self.next = self.next.wrapping_add(1);
            ua
        };

        Identity { user_agent }
    }

    /// Headers sent with every navigation of the context
    pub fn default_headers(&self) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&self.accept_language)
                .map_err(|e| FetchError::Context(format!("invalid Accept-Language: {}", e)))?,
        );
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
        Ok(headers)
    }
}

/// An open page; closing happens on drop
pub struct Page {
    identity: Identity,
    open_pages: Arc<AtomicUsize>,
}

impl Page {
    fn open(identity: Identity, open_pages: Arc<AtomicUsize>) -> Self {
        open_pages.fetch_add(1, Ordering::SeqCst);
        Self {
            identity,
            open_pages,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.open_pages.fetch_sub(1, Ordering::SeqCst);
    }
}

/// HTTP-backed browser session
pub struct BrowserSession {
    config: BrowserConfig,
    profile: AntiDetectionProfile,
    context: Option<Client>,
    open_pages: Arc<AtomicUsize>,
}

impl BrowserSession {
    pub fn new(config: BrowserConfig) -> Self {
        let profile = AntiDetectionProfile::new(&config);
        Self {
            config,
            profile,
            context: None,
            open_pages: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns true while an execution context exists
    pub fn is_launched(&self) -> bool {
        self.context.is_some()
    }

    /// Number of pages currently open
    pub fn open_pages(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }

    /// Returns the execution context, creating it on first use
    fn context(&mut self) -> Result<Client, FetchError> {
        if let Some(client) = &self.context {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .default_headers(self.profile.default_headers()?)
            .connect_timeout(self.config.navigation_timeout())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| FetchError::Context(e.to_string()))?;

        tracing::debug!("Browser context launched");
        self.context = Some(client.clone());
        Ok(client)
    }
}

#[async_trait]
impl PageFetcher for BrowserSession {
    async fn fetch(&mut self, url: &Url) -> Result<RenderedPage, FetchError> {
        let client = self.context()?;
        let page = Page::open(self.profile.next_identity(), Arc::clone(&self.open_pages));
        let timeout = self.config.navigation_timeout();

        let outcome = tokio::time::timeout(timeout, navigate(&client, &page, url)).await;
        drop(page);

        match outcome {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout_ms: self.config.navigation_timeout_ms,
            }),
        }
    }

    async fn shutdown(&mut self) {
        if self.context.take().is_some() {
            tracing::debug!("Browser context released");
        }
    }
}

/// Navigates `page` to `url` and waits for the document to be ready
async fn navigate(client: &Client, page: &Page, url: &Url) -> Result<RenderedPage, FetchError> {
    let navigation_error = |source| FetchError::Navigation {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url.clone())
        .header(USER_AGENT, page.identity().user_agent.as_str())
        .send()
        .await
        .map_err(navigation_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let html = response.text().await.map_err(navigation_error)?;
    wait_for_ready(&final_url, content_type.as_deref(), &html)?;

    let hrefs = collect_hrefs(&html);
    Ok(RenderedPage {
        final_url,
        html,
        hrefs,
    })
}

/// A document is ready once it is non-empty HTML
fn wait_for_ready(url: &Url, content_type: Option<&str>, html: &str) -> Result<(), FetchError> {
    if let Some(content_type) = content_type {
        if !content_type.to_ascii_lowercase().contains("html") {
            return Err(FetchError::NotReady {
                url: url.to_string(),
                reason: format!("expected an HTML document, got {}", content_type),
            });
        }
    }

    if html.trim().is_empty() {
        return Err(FetchError::NotReady {
            url: url.to_string(),
            reason: "empty document".to_string(),
        });
    }

    Ok(())
}
