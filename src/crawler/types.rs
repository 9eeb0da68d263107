//! Crawl orchestration types

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::fetch::FetchMode;
use crate::sitemap::SitemapEntry;
use crate::store::RunCounters;

/// Input to a crawl run
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// Deduplicated URL entries from sitemap intake
    pub entries: Vec<SitemapEntry>,
    pub run_id: Uuid,
    pub max_pages: usize,
    pub fetch_mode: FetchMode,
    /// Disable the existence skip; updates stay hash-gated
    pub recrawl: bool,
}

/// A canonical URL queued for fetching, carrying every raw form that
/// mapped to it
#[derive(Debug, Clone)]
pub(crate) struct QueuedUrl {
    pub canonical: String,
    /// Raw URLs (in first-seen order) whose canonical form this is
    pub originals: Vec<String>,
    pub type_hint: Option<&'static str>,
}

/// Lock-free run counters shared by all workers
#[derive(Debug, Default)]
pub struct CrawlCounters {
    pub discovered: AtomicU64,
    pub crawled: AtomicU64,
    pub skipped: AtomicU64,
    pub redirects: AtomicU64,
    pub errors: AtomicU64,
}

impl CrawlCounters {
    pub fn snapshot(&self) -> RunCounters {
        RunCounters {
            discovered: self.discovered.load(Ordering::Relaxed),
            crawled: self.crawled.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Group sitemap entries by canonical URL, preserving first-seen order
/// and collecting every raw form per canonical.
///
/// Intake already accumulates raw forms per canonical; the merge arm
/// covers requests assembled without it.
pub(crate) fn group_by_canonical(entries: &[SitemapEntry]) -> Vec<QueuedUrl> {
    let mut queued: Vec<QueuedUrl> = Vec::new();
    let mut index: std::collections::HashMap<u64, usize> = std::collections::HashMap::new();

    for entry in entries {
        let key = xxhash_rust::xxh3::xxh3_64(entry.canonical.as_bytes());
        match index.get(&key) {
            Some(&pos) => {
                for raw in &entry.raw_forms {
                    if !queued[pos].originals.contains(raw) {
                        queued[pos].originals.push(raw.clone());
                    }
                }
            }
            None => {
                index.insert(key, queued.len());
                queued.push(QueuedUrl {
                    canonical: entry.canonical.clone(),
                    originals: entry.raw_forms.clone(),
                    type_hint: entry.type_hint,
                });
            }
        }
    }

    queued
}
