//! Persisted entities: pages, aliases, runs, and domain overrides

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extract::ExtractionMethod;
use crate::fetch::FetchMode;
use crate::nav::NavStructure;
use crate::structure::StructuralStats;

/// Outcome classification of a crawled page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "REDIRECT_ALIAS")]
    RedirectAlias,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "SOFT_404")]
    Soft404,
    #[serde(rename = "ERROR")]
    Error,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::RedirectAlias => "REDIRECT_ALIAS",
            Self::NotFound => "NOT_FOUND",
            Self::Soft404 => "SOFT_404",
            Self::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(Self::Ok),
            "REDIRECT_ALIAS" => Some(Self::RedirectAlias),
            "NOT_FOUND" => Some(Self::NotFound),
            "SOFT_404" => Some(Self::Soft404),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// The canonical page record, keyed by `final_url`
#[derive(Debug, Clone)]
pub struct Page {
    /// Canonical terminal URL; the page identity
    pub final_url: String,
    /// URL as originally requested, before redirects and normalization
    pub requested_url_original: String,
    pub status_code: Option<i32>,
    pub crawl_status: CrawlStatus,
    /// Ordered canonical URLs from first request to final; empty when no
    /// redirect occurred
    pub redirect_chain: Vec<String>,
    pub fetch_mode: FetchMode,
    pub run_id: Uuid,
    pub sitemap_type_hint: Option<String>,
    pub html_content: Option<String>,
    pub clean_html: Option<String>,
    pub markdown: Option<String>,
    pub markdown_enhanced: Option<String>,
    /// MD5 of whitespace-normalized clean HTML; null iff no content
    pub content_hash: Option<String>,
    pub title: Option<String>,
    pub h1: Option<String>,
    pub meta_description: Option<String>,
    pub word_count: Option<i32>,
    pub nav_structure: Option<NavStructure>,
    pub structural_stats: Option<StructuralStats>,
    pub extraction_method: Option<ExtractionMethod>,
    pub junk_score: Option<f64>,
    pub last_crawled_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// A requested-URL to final-URL mapping, written for every redirect
#[derive(Debug, Clone)]
pub struct UrlAlias {
    pub requested_url: String,
    pub final_url: String,
    pub status_code: Option<i32>,
    pub redirect_chain: Vec<String>,
    pub run_id: Uuid,
}

/// Aggregate counters persisted on the run record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub discovered: u64,
    pub crawled: u64,
    pub skipped: u64,
    pub redirects: u64,
    pub errors: u64,
}

/// One crawl invocation
#[derive(Debug, Clone)]
pub struct CrawlRun {
    pub run_id: Uuid,
    pub seed_sitemaps: Vec<String>,
    pub max_pages: i32,
    pub fetch_mode: FetchMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counters: RunCounters,
}

impl CrawlRun {
    pub fn new(seed_sitemaps: Vec<String>, max_pages: usize, fetch_mode: FetchMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            seed_sitemaps,
            max_pages: max_pages as i32,
            fetch_mode,
            started_at: Utc::now(),
            finished_at: None,
            counters: RunCounters::default(),
        }
    }
}

/// Per-host selector configuration, read-only during a crawl
#[derive(Debug, Clone, Default)]
pub struct DomainOverride {
    pub domain: String,
    pub enabled: bool,
    pub main_content_selectors: Vec<String>,
    pub remove_selectors: Vec<String>,
    pub force_fetch_mode: Option<FetchMode>,
    pub notes: Option<String>,
}
