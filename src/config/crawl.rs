//! Crawl orchestration configuration

use serde::{Deserialize, Serialize};

use super::DEFAULT_USER_AGENT;
use crate::fetch::FetchMode;

/// Crawl orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Number of concurrent workers
    pub concurrency: usize,
    /// Run-wide cap on successfully fetched pages
    pub max_pages: usize,
    /// Default fetch mode for pages without an override
    pub fetch_mode: FetchMode,
    /// Re-crawl pages that already exist in the store
    pub recrawl: bool,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Emit a progress record every N pages
    pub progress_interval: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            max_pages: 10_000,
            fetch_mode: FetchMode::Static,
            recrawl: false,
            request_timeout_secs: 60,
            progress_interval: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
