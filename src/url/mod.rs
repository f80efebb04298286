//! URL handling module for Ghostcrawl
//!
//! This module provides URL normalization, link resolution and the hostname
//! comparison used for domain containment.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_host};
pub use normalize::{normalize_url, resolve_link};
