//! HTTP fetch engine
//!
//! A pooled-client fetch layer with a fixed User-Agent and per-request
//! timeout. Redirects are followed internally; callers observe only the
//! terminal URL. Browser-mode requests are accepted and recorded but are
//! currently served over the same HTTP tier; the mode stays a seam for a
//! headless-browser implementation.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors that can occur during fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),
    #[error("Content too large: {0} bytes")]
    ContentTooLarge(usize),
    #[error("Failed to parse URL: {0}")]
    InvalidUrl(String),
}

/// How a page was (or should be) fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    Static,
    Browser,
}

impl FetchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Self::Static),
            "browser" => Ok(Self::Browser),
            other => Err(format!("unknown fetch mode '{}' (expected static|browser)", other)),
        }
    }
}

/// Result of a successful fetch
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL that was requested
    pub requested_url: Url,
    /// Terminal URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Response body
    pub body: String,
    /// Content type header value
    pub content_type: String,
    /// Time taken to fetch
    pub fetch_duration: Duration,
}

impl FetchResult {
    /// Whether the fetch ended on a different URL than it started
    pub fn was_redirected(&self) -> bool {
        self.requested_url != self.final_url
    }
}

/// Configuration for the fetch engine
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Maximum response size (bytes)
    pub max_content_size: usize,
    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "sitescribe/0.1 (+https://github.com/sitescribe)".to_string(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            max_content_size: 10 * 1024 * 1024,
            max_redirects: 10,
        }
    }
}

/// Fetch statistics, updated lock-free across workers
#[derive(Debug, Default)]
pub struct FetchStats {
    pub total_fetches: AtomicU64,
    pub successes: AtomicU64,
    pub failures: AtomicU64,
}

impl FetchStats {
    pub fn total(&self) -> u64 {
        self.total_fetches.load(Ordering::Relaxed)
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// HTTP fetch engine shared by all workers
pub struct FetchEngine {
    client: reqwest::Client,
    config: FetchConfig,
    stats: FetchStats,
}

impl FetchEngine {
    /// Create a new fetch engine
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            config,
            stats: FetchStats::default(),
        })
    }

    /// Fetch an HTML page. Rejects non-HTML content types.
    pub async fn fetch_page(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let result = self.fetch(url).await?;

        if !result.content_type.contains("text/html")
            && !result.content_type.contains("application/xhtml")
        {
            return Err(FetchError::InvalidContentType(result.content_type));
        }

        Ok(result)
    }

    /// Fetch any text resource (sitemap XML, robots.txt).
    pub async fn fetch_text(&self, url: &Url) -> Result<FetchResult, FetchError> {
        self.fetch(url).await
    }

    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let start = Instant::now();
        self.stats.total_fetches.fetch_add(1, Ordering::Relaxed);

        let response = match self.client.get(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        let status = response.status();
        let final_url = Url::parse(response.url().as_str())
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        if let Some(len) = response.content_length() {
            if len as usize > self.config.max_content_size {
                return Err(FetchError::ContentTooLarge(len as usize));
            }
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        if body.len() > self.config.max_content_size {
            self.stats.failures.fetch_add(1, Ordering::Relaxed);
            return Err(FetchError::ContentTooLarge(body.len()));
        }

        self.stats.successes.fetch_add(1, Ordering::Relaxed);
        Ok(FetchResult {
            requested_url: url.clone(),
            final_url,
            status_code: status.as_u16(),
            body,
            content_type,
            fetch_duration: start.elapsed(),
        })
    }

    /// Get the user agent
    pub fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    /// Get fetch statistics
    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }
}
