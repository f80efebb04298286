//! Integration tests for the fetch & extract pipeline
//!
//! These tests use wiremock to serve pages to a real browser session and
//! check extraction, link handling, failures and page release.

use async_trait::async_trait;
use ghostcrawl::config::{BrowserConfig, ExtractionConfig};
use ghostcrawl::crawler::{
    BrowserSession, ExtractMode, PageFetcher, Pipeline, ReadableExtractor, RenderedPage,
};
use ghostcrawl::{ExtractionError, FetchError, PipelineError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE: &str = r#"<html lang="fr"><head><title>Home</title>
    <meta name="author" content="Jane Doe"></head>
    <body>
    <nav><a href="/menu">Menu</a></nav>
    <article>
        <p>Welcome to the home page.</p>
        <a href="/page1">Page 1</a>
        <a href="page2#section">Page 2</a>
        <a href="/page1/">Page 1 again</a>
        <a href="mailto:someone@example.com">Mail</a>
        <a href="https://other.test/x">Elsewhere</a>
    </article>
    </body></html>"#;

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn browser_config(timeout_ms: u64) -> BrowserConfig {
    BrowserConfig {
        navigation_timeout_ms: timeout_ms,
        ..BrowserConfig::default()
    }
}

/// Browser session whose open-page count stays observable after boxing
struct Observed {
    session: BrowserSession,
    open_after: Arc<AtomicUsize>,
}

#[async_trait]
impl PageFetcher for Observed {
    async fn fetch(&mut self, url: &Url) -> Result<RenderedPage, FetchError> {
        let result = self.session.fetch(url).await;
        self.open_after
            .store(self.session.open_pages(), Ordering::SeqCst);
        result
    }

    async fn shutdown(&mut self) {
        self.session.shutdown().await;
    }
}

fn observed_pipeline(timeout_ms: u64) -> (Pipeline, Arc<AtomicUsize>) {
    let open_after = Arc::new(AtomicUsize::new(usize::MAX));
    let fetcher = Observed {
        session: BrowserSession::new(browser_config(timeout_ms)),
        open_after: open_after.clone(),
    };
    let pipeline = Pipeline::new(
        Box::new(fetcher),
        Box::new(ReadableExtractor::new(ExtractionConfig::default())),
    );
    (pipeline, open_after)
}

fn pipeline(timeout_ms: u64) -> Pipeline {
    observed_pipeline(timeout_ms).0
}

#[tokio::test]
async fn test_full_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(ARTICLE))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let result = pipeline(5000).run(&url, ExtractMode::Full).await.unwrap();

    assert_eq!(result.url, url.to_string());
    assert_eq!(result.title, "Home");
    assert_eq!(
        result.links,
        vec![
            format!("{}/menu", server.uri()),
            format!("{}/page1", server.uri()),
            format!("{}/page2", server.uri()),
            "https://other.test/x".to_string(),
        ]
    );
    assert!(result.html.as_deref().unwrap().contains("Welcome to the home page."));
    assert!(result.markdown.as_deref().unwrap().contains("Welcome to the home page"));

    let metadata = result.metadata.unwrap();
    assert_eq!(metadata.byline.as_deref(), Some("Jane Doe"));
    assert_eq!(metadata.language, "fr");
    assert_eq!(metadata.excerpt.as_deref(), Some("Welcome to the home page."));
}

#[tokio::test]
async fn test_links_only_omits_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(ARTICLE))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let result = pipeline(5000)
        .run(&url, ExtractMode::LinksOnly)
        .await
        .unwrap();

    assert_eq!(result.title, "Home");
    assert_eq!(result.links.len(), 4);
    assert!(result.html.is_none());
    assert!(result.markdown.is_none());
    assert!(result.metadata.is_none());
}

#[tokio::test]
async fn test_links_resolve_against_final_url_after_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "/docs/intro"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/intro"))
        .respond_with(html(
            r#"<html><body><p>Intro</p><a href="next">Next</a></body></html>"#,
        ))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
    let result = pipeline(5000)
        .run(&url, ExtractMode::LinksOnly)
        .await
        .unwrap();

    assert_eq!(result.url, url.to_string());
    assert_eq!(result.title, "No Title");
    assert_eq!(result.links, vec![format!("{}/docs/next", server.uri())]);
}

#[tokio::test]
async fn test_navigation_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(ARTICLE).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let (mut pipeline, open_after) = observed_pipeline(200);
    let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
    let err = pipeline.run(&url, ExtractMode::Full).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Fetch(FetchError::Timeout { timeout_ms: 200, .. })
    ));
    assert_eq!(open_after.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (mut pipeline, open_after) = observed_pipeline(5000);
    let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
    let err = pipeline.run(&url, ExtractMode::Full).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Fetch(FetchError::HttpStatus { status: 404, .. })
    ));
    assert_eq!(open_after.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_html_document_is_not_ready() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/file.pdf", server.uri())).unwrap();
    let err = pipeline(5000).run(&url, ExtractMode::Full).await.unwrap_err();

    assert!(matches!(err, PipelineError::Fetch(FetchError::NotReady { .. })));
}

#[tokio::test]
async fn test_unreadable_page_fails_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(
            r#"<html><head><title>Nav only</title></head><body><nav><a href="/a">A</a></nav></body></html>"#,
        ))
        .mount(&server)
        .await;

    let (mut pipeline, open_after) = observed_pipeline(5000);
    let url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let err = pipeline.run(&url, ExtractMode::Full).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Extraction(ExtractionError::NoReadableContent { .. })
    ));
    assert_eq!(open_after.load(Ordering::SeqCst), 0);

    // Link-only mode does not need readable content
    let result = pipeline.run(&url, ExtractMode::LinksOnly).await.unwrap();
    assert_eq!(result.links, vec![format!("{}/a", server.uri())]);
}

#[tokio::test]
async fn test_session_identity_and_lifecycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "test-agent/1.0"))
        .respond_with(html("<html><body><p>ok</p></body></html>"))
        .mount(&server)
        .await;

    let mut session = BrowserSession::new(BrowserConfig {
        user_agents: vec!["test-agent/1.0".to_string()],
        ..BrowserConfig::default()
    });
    assert!(!session.is_launched());

    let url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let page = session.fetch(&url).await.unwrap();
    assert!(page.html.contains("ok"));
    assert!(session.is_launched());
    assert_eq!(session.open_pages(), 0);

    session.shutdown().await;
    assert!(!session.is_launched());
}
