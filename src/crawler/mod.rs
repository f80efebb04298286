//! Crawler module: fetching pages and processing jobs
//!
//! This module contains the crawl orchestration core, including:
//! - The browser session each worker fetches pages with
//! - HTML parsing, link resolution and readable-content extraction
//! - The fetch & extract pipeline
//! - The job dispatcher and the worker loop around it

mod browser;
mod dispatcher;
mod extractor;
mod parser;
mod pipeline;
mod worker;

pub use browser::{AntiDetectionProfile, BrowserSession, Identity, Page, PageFetcher, RenderedPage};
pub use dispatcher::{Dispatch, Dispatcher};
pub use extractor::{Article, ContentExtractor, ReadableExtractor, NO_TITLE};
pub use parser::{collect_hrefs, page_title, resolve_links};
pub use pipeline::{ExtractMode, FetchResult, PageMetadata, Pipeline};
pub use worker::{spawn_workers, Worker};
