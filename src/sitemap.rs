//! Sitemap intake
//!
//! Resolves sitemap indexes one level deep, parses `<url><loc>` entries,
//! and emits a deduplicated stream of URL entries annotated with a type
//! hint derived from the sitemap filename. Entries are keyed by canonical
//! URL; every raw form that maps to a canonical is accumulated so the
//! crawler can record one alias per raw form. A failure in one sitemap
//! never aborts the others; the intake fails only when every seed fails.

use std::collections::{HashMap, HashSet};

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::fetch::{FetchEngine, FetchError};
use crate::urlnorm;

/// Errors from sitemap intake
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("no URLs discovered from any seed sitemap")]
    NoUrls,
}

/// A URL entry discovered from a sitemap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    /// Every raw form of the URL as it appeared across sitemaps, in
    /// first-seen order
    pub raw_forms: Vec<String>,
    /// Canonical form of the URL
    pub canonical: String,
    /// Sitemap the entry was first seen in
    pub source: String,
    /// Content-type hint derived from the sitemap filename
    pub type_hint: Option<&'static str>,
}

/// Filename patterns mapped to type hints, checked in order.
///
/// The first matching rule wins, so the specific `*-sitemap` prefixes come
/// before the broad substring rules.
const TYPE_HINT_RULES: &[(&str, &str)] = &[
    (r"^post[-_]sitemap", "post"),
    (r"^page[-_]sitemap", "page"),
    (r"product", "product"),
    (r"event", "event"),
    (r"portfolio", "portfolio"),
    (r"category|tag|author", "pagination"),
    (r"blog|news|article", "post"),
];

/// Sitemap intake front-end
pub struct SitemapIntake {
    hint_rules: Vec<(Regex, &'static str)>,
}

impl SitemapIntake {
    pub fn new() -> Self {
        let hint_rules = TYPE_HINT_RULES
            .iter()
            .filter_map(|(pattern, hint)| Regex::new(pattern).ok().map(|re| (re, *hint)))
            .collect();
        Self { hint_rules }
    }

    /// Resolve all seeds into a deduplicated list of URL entries.
    ///
    /// Sitemap indexes are expanded one level; an index nested inside an
    /// index is skipped with a warning.
    pub async fn collect(
        &self,
        fetcher: &FetchEngine,
        seeds: &[String],
    ) -> Result<Vec<SitemapEntry>, SitemapError> {
        let mut entries: Vec<SitemapEntry> = Vec::new();
        let mut by_canonical: HashMap<String, usize> = HashMap::new();
        let mut visited_sitemaps: HashSet<String> = HashSet::new();

        for seed in seeds {
            let xml = match self.fetch_xml(fetcher, seed).await {
                Some(xml) => xml,
                None => continue,
            };
            visited_sitemaps.insert(seed.clone());

            if is_sitemap_index(&xml) {
                for child in extract_locs(&xml) {
                    if !visited_sitemaps.insert(child.clone()) {
                        continue;
                    }
                    let child_xml = match self.fetch_xml(fetcher, &child).await {
                        Some(xml) => xml,
                        None => continue,
                    };
                    if is_sitemap_index(&child_xml) {
                        warn!("Skipping nested sitemap index: {}", child);
                        continue;
                    }
                    self.collect_urls(&child_xml, &child, &mut entries, &mut by_canonical);
                }
            } else {
                self.collect_urls(&xml, seed, &mut entries, &mut by_canonical);
            }
        }

        if entries.is_empty() {
            return Err(SitemapError::NoUrls);
        }

        debug!("Sitemap intake discovered {} unique URLs", entries.len());
        Ok(entries)
    }

    async fn fetch_xml(&self, fetcher: &FetchEngine, sitemap_url: &str) -> Option<String> {
        let url = match Url::parse(sitemap_url) {
            Ok(u) => u,
            Err(e) => {
                warn!("Invalid sitemap URL {}: {}", sitemap_url, e);
                return None;
            }
        };

        debug!("Fetching sitemap: {}", sitemap_url);
        match fetcher.fetch_text(&url).await {
            Ok(result) if result.status_code < 400 => Some(result.body),
            Ok(result) => {
                warn!("Sitemap {} returned HTTP {}", sitemap_url, result.status_code);
                None
            }
            Err(e) => {
                warn!("Failed to fetch sitemap {}: {}", sitemap_url, e);
                None
            }
        }
    }

    fn collect_urls(
        &self,
        xml: &str,
        source: &str,
        entries: &mut Vec<SitemapEntry>,
        by_canonical: &mut HashMap<String, usize>,
    ) {
        let type_hint = self.type_hint(source);

        for raw in extract_locs(xml) {
            let canonical = match urlnorm::normalize(&raw) {
                Ok(c) => c,
                Err(e) => {
                    warn!("Dropping invalid sitemap URL: {}", e);
                    continue;
                }
            };

            match by_canonical.get(&canonical) {
                // First-seen source and hint win for duplicate canonicals;
                // the raw form is still recorded so an alias can be
                // written for it
                Some(&pos) => {
                    let entry = &mut entries[pos];
                    if !entry.raw_forms.contains(&raw) {
                        entry.raw_forms.push(raw);
                    }
                }
                None => {
                    by_canonical.insert(canonical.clone(), entries.len());
                    entries.push(SitemapEntry {
                        raw_forms: vec![raw],
                        canonical,
                        source: source.to_string(),
                        type_hint,
                    });
                }
            }
        }
    }

    /// Derive a type hint from the sitemap URL's filename.
    pub fn type_hint(&self, sitemap_url: &str) -> Option<&'static str> {
        let filename = sitemap_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_lowercase();

        self.hint_rules
            .iter()
            .find(|(re, _)| re.is_match(&filename))
            .map(|(_, hint)| *hint)
    }
}

impl Default for SitemapIntake {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the XML document is a sitemap index.
pub fn is_sitemap_index(xml: &str) -> bool {
    xml.contains("<sitemapindex")
}

/// Extract all `<loc>` values from sitemap XML, with entity unescaping.
pub fn extract_locs(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut locs = Vec::new();
    let mut in_loc = false;
    let mut buffer = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"loc" => {
                in_loc = true;
                buffer.clear();
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = buffer.trim().to_string();
                if !loc.is_empty() {
                    locs.push(loc);
                }
            }
            Ok(Event::Text(ref t)) if in_loc => {
                if let Ok(text) = t.unescape() {
                    buffer.push_str(&text);
                }
            }
            Ok(Event::CData(ref t)) if in_loc => {
                buffer.push_str(&String::from_utf8_lossy(t.as_ref()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("XML parse error in sitemap: {}", e);
                break;
            }
            _ => {}
        }
    }

    locs
}

#[cfg(test)]
mod tests {
    use super::*;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/first</loc></url>
  <url><loc>https://example.com/second/</loc></url>
  <url><loc>https://example.com/search?q=a&amp;page=1</loc></url>
</urlset>"#;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/post-sitemap.xml</loc></sitemap>
  <sitemap><loc>https://example.com/page-sitemap.xml</loc></sitemap>
</sitemapindex>"#;

    #[test]
    fn extracts_locs_from_urlset() {
        let locs = extract_locs(URLSET);
        assert_eq!(locs.len(), 3);
        assert_eq!(locs[0], "https://example.com/first");
        assert_eq!(locs[2], "https://example.com/search?q=a&page=1");
    }

    #[test]
    fn detects_sitemap_index() {
        assert!(is_sitemap_index(INDEX));
        assert!(!is_sitemap_index(URLSET));
    }

    #[test]
    fn extracts_child_sitemaps_from_index() {
        let locs = extract_locs(INDEX);
        assert_eq!(locs.len(), 2);
        assert!(locs[0].ends_with("post-sitemap.xml"));
    }

    #[test]
    fn cdata_locs_are_supported() {
        let xml = "<urlset><url><loc><![CDATA[https://example.com/cdata]]></loc></url></urlset>";
        let locs = extract_locs(xml);
        assert_eq!(locs, vec!["https://example.com/cdata".to_string()]);
    }

    #[test]
    fn type_hints_follow_filename_rules() {
        let intake = SitemapIntake::new();
        assert_eq!(intake.type_hint("https://ex.com/post-sitemap.xml"), Some("post"));
        assert_eq!(intake.type_hint("https://ex.com/page-sitemap2.xml"), Some("page"));
        assert_eq!(intake.type_hint("https://ex.com/product-sitemap.xml"), Some("product"));
        assert_eq!(intake.type_hint("https://ex.com/category-sitemap.xml"), Some("pagination"));
        assert_eq!(intake.type_hint("https://ex.com/tag-sitemap.xml"), Some("pagination"));
        assert_eq!(intake.type_hint("https://ex.com/news-sitemap.xml"), Some("post"));
        assert_eq!(intake.type_hint("https://ex.com/event-sitemap.xml"), Some("event"));
        assert_eq!(intake.type_hint("https://ex.com/portfolio-sitemap.xml"), Some("portfolio"));
        assert_eq!(intake.type_hint("https://ex.com/sitemap.xml"), None);
    }

    #[test]
    fn specific_prefix_rules_win_over_substring_rules() {
        let intake = SitemapIntake::new();
        // "post-sitemap" also contains no other keyword, but "page-sitemap"
        // must not be claimed by a later rule
        assert_eq!(intake.type_hint("https://ex.com/post-sitemap-articles.xml"), Some("post"));
    }

    #[test]
    fn dedup_preserves_first_seen_source_and_all_raw_forms() {
        let intake = SitemapIntake::new();
        let mut entries = Vec::new();
        let mut by_canonical = HashMap::new();

        let first = r#"<urlset><url><loc>https://example.com/dup/</loc></url></urlset>"#;
        let second = r#"<urlset><url><loc>https://EXAMPLE.com/dup</loc></url></urlset>"#;

        intake.collect_urls(first, "https://ex.com/post-sitemap.xml", &mut entries, &mut by_canonical);
        intake.collect_urls(second, "https://ex.com/page-sitemap.xml", &mut entries, &mut by_canonical);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, "https://ex.com/post-sitemap.xml");
        assert_eq!(entries[0].type_hint, Some("post"));
        assert_eq!(entries[0].canonical, "https://example.com/dup");
        // Both raw forms survive intake so each gets an alias row later
        assert_eq!(
            entries[0].raw_forms,
            vec![
                "https://example.com/dup/".to_string(),
                "https://EXAMPLE.com/dup".to_string()
            ]
        );
    }

    #[test]
    fn identical_raw_forms_are_not_repeated() {
        let intake = SitemapIntake::new();
        let mut entries = Vec::new();
        let mut by_canonical = HashMap::new();
        let xml = r#"<urlset><url><loc>https://example.com/a</loc></url></urlset>"#;

        intake.collect_urls(xml, "https://ex.com/sitemap.xml", &mut entries, &mut by_canonical);
        intake.collect_urls(xml, "https://ex.com/sitemap2.xml", &mut entries, &mut by_canonical);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].raw_forms, vec!["https://example.com/a".to_string()]);
    }

    #[test]
    fn invalid_urls_are_dropped_not_fatal() {
        let intake = SitemapIntake::new();
        let mut entries = Vec::new();
        let mut by_canonical = HashMap::new();
        let xml = r#"<urlset>
            <url><loc>https://example.com/ok</loc></url>
            <url><loc>https://:bad:port</loc></url>
        </urlset>"#;
        intake.collect_urls(xml, "https://ex.com/sitemap.xml", &mut entries, &mut by_canonical);
        assert_eq!(entries.len(), 1);
    }
}
