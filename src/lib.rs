//! sitescribe: a sitemap-driven crawler producing a canonical,
//! deduplicated archive of pages with clean Markdown for LLM/RAG, SEO,
//! and link-graph analysis.
//!
//! The pipeline: sitemap intake discovers URLs, each page is fetched and
//! redirect-resolved, the main content is isolated by a strategy cascade,
//! structural regions (FAQ/TOC/CTA/…) are detected with byte offsets,
//! navigation clusters and content links are extracted, and the page is
//! converted to Markdown with structural markers. Everything persists
//! keyed by the canonical URL with hash-gated upserts, so repeated crawls
//! are idempotent.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetch;
pub mod markdown;
pub mod nav;
pub mod sitemap;
pub mod store;
pub mod structure;
pub mod urlnorm;

pub use config::Config;
