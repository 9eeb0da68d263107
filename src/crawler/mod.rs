//! Crawl orchestrator
//!
//! Enqueues canonical URLs from sitemap intake (deduplicated, existence
//! checked), then drains the queue with a fixed-size worker pool. Each
//! worker runs the full per-URL pipeline end-to-end: fetch, classify,
//! clean, extract, detect structure, extract navigation, convert to
//! Markdown, hash, persist. Parsing and conversion are CPU-only and run
//! on blocking threads; workers never throw.

pub mod report;
mod types;

pub use report::RunReport;
pub use types::{CrawlCounters, CrawlRequest};

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use scraper::Html;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

use crate::config::CrawlConfig;
use crate::extract::{
    cleaner, metadata::extract_metadata, metadata::PageMetadata, quality, text_of,
    ContentExtractor, ExtractionMethod,
};
use crate::fetch::FetchEngine;
use crate::markdown::{MarkdownBuilder, MarkdownOutput};
use crate::nav::{NavStructure, NavigationExtractor};
use crate::store::{CrawlStatus, DomainOverride, Page, PageStore, UrlAlias};
use crate::structure::{StructuralDetector, StructuralStats};
use crate::urlnorm;

use types::QueuedUrl;

/// Orchestrates a crawl run over a shared store and fetch engine
pub struct CrawlOrchestrator {
    store: Arc<PageStore>,
    fetcher: Arc<FetchEngine>,
    config: CrawlConfig,
    extractor: Arc<ContentExtractor>,
    detector: Arc<StructuralDetector>,
    nav: Arc<NavigationExtractor>,
    markdown: Arc<MarkdownBuilder>,
    /// Per-host override cache for the run; overrides are read-only
    /// during a crawl
    overrides: RwLock<HashMap<String, Option<DomainOverride>>>,
    counters: CrawlCounters,
    running: AtomicBool,
}

impl CrawlOrchestrator {
    pub fn new(store: Arc<PageStore>, fetcher: Arc<FetchEngine>, config: CrawlConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
            extractor: Arc::new(ContentExtractor::default()),
            detector: Arc::new(StructuralDetector::new()),
            nav: Arc::new(NavigationExtractor::new()),
            markdown: Arc::new(MarkdownBuilder::new()),
            overrides: RwLock::new(HashMap::new()),
            counters: CrawlCounters::default(),
            running: AtomicBool::new(false),
        }
    }

    /// Live counters, for progress inspection.
    pub fn counters(&self) -> &CrawlCounters {
        &self.counters
    }

    /// Request cancellation; observed between items.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Run the crawl to completion and return the final report.
    pub async fn run(self: &Arc<Self>, request: CrawlRequest) -> RunReport {
        let start = Instant::now();
        self.running.store(true, Ordering::Relaxed);
        self.counters
            .discovered
            .store(request.entries.len() as u64, Ordering::Relaxed);

        let queued = types::group_by_canonical(&request.entries);
        let mut queue: VecDeque<QueuedUrl> = VecDeque::new();

        for item in queued {
            if !request.recrawl {
                match self.store.page_exists(&item.canonical).await {
                    Ok(true) => {
                        self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                        // Aliases are written even when the page is skipped
                        self.write_aliases(&item, &item.canonical, None, &[], request.run_id)
                            .await;
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Existence check failed for {}: {}", item.canonical, e);
                    }
                }
            }
            queue.push_back(item);
        }

        let queue = Arc::new(Mutex::new(queue));
        let request = Arc::new(request);
        let mut workers = JoinSet::new();

        for _ in 0..self.config.concurrency.max(1) {
            let orchestrator = Arc::clone(self);
            let queue = Arc::clone(&queue);
            let request = Arc::clone(&request);

            workers.spawn(async move {
                loop {
                    if !orchestrator.running.load(Ordering::Relaxed) {
                        break;
                    }
                    if orchestrator.counters.crawled.load(Ordering::Relaxed)
                        >= request.max_pages as u64
                    {
                        break;
                    }

                    let item = { queue.lock().await.pop_front() };
                    let Some(item) = item else { break };

                    orchestrator.process(item, &request).await;
                }
            });
        }

        while workers.join_next().await.is_some() {}

        RunReport {
            counters: self.counters.snapshot(),
            duration: start.elapsed(),
        }
    }

    /// The full per-URL pipeline. Never panics the worker; failures end
    /// up as ERROR pages or logged persistence warnings.
    async fn process(self: &Arc<Self>, item: QueuedUrl, request: &CrawlRequest) {
        let Ok(url) = Url::parse(&item.canonical) else {
            warn!("Dropping unparseable queued URL: {}", item.canonical);
            return;
        };

        let host = url.host_str().unwrap_or_default().to_string();
        let override_cfg = self.lookup_override(&host).await;
        let fetch_mode = override_cfg
            .as_ref()
            .and_then(|o| o.force_fetch_mode)
            .unwrap_or(request.fetch_mode);

        let result = match self.fetcher.fetch_page(&url).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Fetch failed for {}: {}", item.canonical, e);
                let page = Page {
                    final_url: item.canonical.clone(),
                    requested_url_original: item
                        .originals
                        .first()
                        .cloned()
                        .unwrap_or_else(|| item.canonical.clone()),
                    status_code: None,
                    crawl_status: CrawlStatus::Error,
                    redirect_chain: Vec::new(),
                    fetch_mode,
                    run_id: request.run_id,
                    sitemap_type_hint: item.type_hint.map(String::from),
                    html_content: None,
                    clean_html: None,
                    markdown: None,
                    markdown_enhanced: None,
                    content_hash: None,
                    title: None,
                    h1: None,
                    meta_description: None,
                    word_count: None,
                    nav_structure: None,
                    structural_stats: None,
                    extraction_method: None,
                    junk_score: None,
                    last_crawled_at: Utc::now(),
                    last_error: Some(e.to_string()),
                };
                if let Err(e) = self.store.upsert_page(&page).await {
                    warn!("Failed to persist error page {}: {}", page.final_url, e);
                }
                self.write_aliases(&item, &item.canonical, None, &[], request.run_id)
                    .await;
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                self.tick_progress();
                return;
            }
        };

        self.counters.crawled.fetch_add(1, Ordering::Relaxed);

        let canonical_final = urlnorm::normalize_url(&result.final_url)
            .unwrap_or_else(|_| item.canonical.clone());
        let redirected = canonical_final != item.canonical;
        let redirect_chain: Vec<String> = if redirected {
            self.counters.redirects.fetch_add(1, Ordering::Relaxed);
            vec![item.canonical.clone(), canonical_final.clone()]
        } else {
            Vec::new()
        };

        let mut crawl_status = classify_status(result.status_code, redirected);

        // CPU-bound parsing off the async runtime
        let body = result.body;
        let pipeline_body = body.clone();
        let final_url = Url::parse(&canonical_final).unwrap_or_else(|_| result.final_url.clone());
        let pipeline_url = final_url.clone();
        let (main_selectors, remove_selectors) = override_cfg
            .map(|o| (o.main_content_selectors, o.remove_selectors))
            .unwrap_or_default();
        let extractor = Arc::clone(&self.extractor);
        let detector = Arc::clone(&self.detector);
        let nav = Arc::clone(&self.nav);
        let markdown = Arc::clone(&self.markdown);

        let output = tokio::task::spawn_blocking(move || {
            run_pipeline(
                &pipeline_body,
                &pipeline_url,
                &main_selectors,
                &remove_selectors,
                &extractor,
                &detector,
                &nav,
                &markdown,
            )
        })
        .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!("Pipeline task failed for {}: {}", canonical_final, e);
                return;
            }
        };

        if crawl_status == CrawlStatus::Ok
            && quality::looks_like_soft404(
                output.metadata.title.as_deref(),
                &output.body_text,
                output.word_count,
            )
        {
            debug!("Classifying {} as soft 404", canonical_final);
            crawl_status = CrawlStatus::Soft404;
        }

        let page = Page {
            final_url: canonical_final.clone(),
            requested_url_original: item
                .originals
                .first()
                .cloned()
                .unwrap_or_else(|| item.canonical.clone()),
            status_code: Some(result.status_code as i32),
            crawl_status,
            redirect_chain: redirect_chain.clone(),
            fetch_mode,
            run_id: request.run_id,
            sitemap_type_hint: item.type_hint.map(String::from),
            html_content: non_empty(body),
            clean_html: non_empty(output.clean_html),
            markdown: Some(output.markdown.plain),
            markdown_enhanced: Some(output.markdown.enhanced),
            content_hash: output.content_hash,
            title: output.metadata.title,
            h1: output.metadata.h1,
            meta_description: output.metadata.meta_description,
            word_count: Some(output.word_count as i32),
            nav_structure: Some(output.nav_structure),
            structural_stats: Some(output.structural_stats),
            extraction_method: Some(output.method),
            junk_score: Some(output.junk_score),
            last_crawled_at: Utc::now(),
            last_error: None,
        };

        // Page write first; either write can fail without corrupting the
        // other
        if let Err(e) = self.store.upsert_page(&page).await {
            warn!("Failed to persist page {}: {}", page.final_url, e);
        }
        self.write_aliases(
            &item,
            &canonical_final,
            Some(result.status_code as i32),
            &redirect_chain,
            request.run_id,
        )
        .await;

        if crawl_status == CrawlStatus::Error || crawl_status == CrawlStatus::NotFound {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.tick_progress();
    }

    /// Write one alias row per requested form that differs from the
    /// final URL.
    async fn write_aliases(
        &self,
        item: &QueuedUrl,
        final_url: &str,
        status_code: Option<i32>,
        redirect_chain: &[String],
        run_id: uuid::Uuid,
    ) {
        let mut seen: HashSet<&str> = HashSet::new();

        for requested in item
            .originals
            .iter()
            .chain(std::iter::once(&item.canonical))
        {
            if requested == final_url || !seen.insert(requested.as_str()) {
                continue;
            }
            let alias = UrlAlias {
                requested_url: requested.clone(),
                final_url: final_url.to_string(),
                status_code,
                redirect_chain: redirect_chain.to_vec(),
                run_id,
            };
            if let Err(e) = self.store.upsert_alias(&alias).await {
                warn!("Failed to persist alias {}: {}", alias.requested_url, e);
            }
        }
    }

    async fn lookup_override(&self, host: &str) -> Option<DomainOverride> {
        if host.is_empty() {
            return None;
        }

        {
            let cache = self.overrides.read().await;
            if let Some(cached) = cache.get(host) {
                return cached.clone();
            }
        }

        let fetched = match self.store.get_override(host).await {
            Ok(value) => value.filter(|o| o.enabled),
            Err(e) => {
                warn!("Override lookup failed for {}: {}", host, e);
                None
            }
        };

        self.overrides
            .write()
            .await
            .insert(host.to_string(), fetched.clone());
        fetched
    }

    fn tick_progress(&self) {
        let processed = self.counters.crawled.load(Ordering::Relaxed)
            + self.counters.errors.load(Ordering::Relaxed);
        if processed > 0 && processed % self.config.progress_interval as u64 == 0 {
            report::log_progress(&self.counters);
        }
    }
}

/// Classify the response status.
fn classify_status(status_code: u16, redirected: bool) -> CrawlStatus {
    match status_code {
        404 | 410 => CrawlStatus::NotFound,
        code if code >= 400 => CrawlStatus::Error,
        _ if redirected => CrawlStatus::RedirectAlias,
        _ => CrawlStatus::Ok,
    }
}

/// Output of the CPU-only per-page pipeline
pub(crate) struct PipelineOutput {
    pub clean_html: String,
    pub word_count: usize,
    pub method: ExtractionMethod,
    pub junk_score: f64,
    pub metadata: PageMetadata,
    pub nav_structure: NavStructure,
    pub structural_stats: StructuralStats,
    pub markdown: MarkdownOutput,
    pub content_hash: Option<String>,
    pub body_text: String,
}

/// Run cleaning, metadata, extraction, structural detection, navigation
/// extraction, Markdown conversion, and hashing over one fetched body.
///
/// Structural detection runs on the raw HTML so its offsets match the
/// string the Markdown builder walks; content extraction runs on the
/// cleaned document.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_pipeline(
    body: &str,
    final_url: &Url,
    main_selectors: &[String],
    remove_selectors: &[String],
    extractor: &ContentExtractor,
    detector: &StructuralDetector,
    nav: &NavigationExtractor,
    markdown: &MarkdownBuilder,
) -> PipelineOutput {
    let document = Html::parse_document(body);

    let metadata = extract_metadata(&document, final_url);
    let elements = detector.detect(&document, body);
    let structural_stats = StructuralStats::from_elements(&elements);
    let nav_structure = nav.extract(&document, final_url, &elements);
    let markdown = markdown.build(&document, &elements, final_url, metadata.h1.as_deref());

    for issue in &markdown.seo_issues {
        debug!(url = %final_url, "SEO issue: {}", issue);
    }
    if metadata.has_multiple_h1 {
        debug!(url = %final_url, "SEO issue: page has multiple h1 elements");
    }

    let cleaned = cleaner::clean_html(body, remove_selectors);
    let content = extractor.extract(&cleaned, final_url, main_selectors);
    let content_hash = quality::content_hash(&content.clean_html);
    let body_text = text_of(&content.clean_html);

    PipelineOutput {
        clean_html: content.clean_html,
        word_count: content.word_count,
        method: content.method,
        junk_score: content.junk_score,
        metadata,
        nav_structure,
        structural_stats,
        markdown,
        content_hash,
        body_text,
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(200, false), CrawlStatus::Ok);
        assert_eq!(classify_status(200, true), CrawlStatus::RedirectAlias);
        assert_eq!(classify_status(404, false), CrawlStatus::NotFound);
        assert_eq!(classify_status(410, false), CrawlStatus::NotFound);
        assert_eq!(classify_status(500, false), CrawlStatus::Error);
        assert_eq!(classify_status(403, true), CrawlStatus::Error);
    }

    fn tools() -> (
        ContentExtractor,
        StructuralDetector,
        NavigationExtractor,
        MarkdownBuilder,
    ) {
        (
            ContentExtractor::default(),
            StructuralDetector::new(),
            NavigationExtractor::new(),
            MarkdownBuilder::new(),
        )
    }

    fn article_fixture() -> String {
        let words = (0..150)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            r#"<html lang="en"><head>
                <title>Fixture Article</title>
                <meta name="description" content="A fixture page">
            </head><body>
                <nav class="main-navigation"><ul>
                    <li><a href="/a">A</a></li>
                    <li><a href="/b">B</a></li>
                    <li><a href="/c">C</a></li>
                </ul></nav>
                <article>
                    <h1>Fixture Article</h1>
                    <p>{}</p>
                    <p>See <a href="/related-page">the related page</a>.</p>
                </article>
            </body></html>"#,
            words
        )
    }

    #[test]
    fn pipeline_produces_all_products() {
        let (extractor, detector, nav, markdown) = tools();
        let url = Url::parse("https://example.com/post").unwrap();
        let body = article_fixture();

        let output = run_pipeline(&body, &url, &[], &[], &extractor, &detector, &nav, &markdown);

        assert_eq!(output.metadata.title.as_deref(), Some("Fixture Article"));
        assert_eq!(output.metadata.language.as_deref(), Some("en"));
        assert!(output.word_count >= 100);
        assert_ne!(output.method, ExtractionMethod::Fallback);
        assert!(output.content_hash.is_some());
        assert_eq!(output.nav_structure.primary_nav.len(), 3);
        assert!(output
            .nav_structure
            .content_links
            .iter()
            .any(|l| l.url == "https://example.com/related-page"));
        assert!(output.markdown.plain.starts_with("# Fixture Article"));
        assert_eq!(output.structural_stats.total(), 0);
    }

    #[test]
    fn pipeline_hash_is_stable_across_runs() {
        let (extractor, detector, nav, markdown) = tools();
        let url = Url::parse("https://example.com/post").unwrap();
        let body = article_fixture();

        let first = run_pipeline(&body, &url, &[], &[], &extractor, &detector, &nav, &markdown);
        let second = run_pipeline(&body, &url, &[], &[], &extractor, &detector, &nav, &markdown);

        assert_eq!(first.content_hash, second.content_hash);
        assert_eq!(first.clean_html, second.clean_html);
    }

    #[test]
    fn pipeline_flags_soft404_material() {
        let (extractor, detector, nav, markdown) = tools();
        let url = Url::parse("https://example.com/missing").unwrap();
        let body = r#"<html><head><title>Page Not Found</title></head><body>
            <p>Sorry, the page you requested could not be found on this site.</p>
        </body></html>"#;

        let output = run_pipeline(body, &url, &[], &[], &extractor, &detector, &nav, &markdown);

        assert!(quality::looks_like_soft404(
            output.metadata.title.as_deref(),
            &output.body_text,
            output.word_count,
        ));
    }

    #[test]
    fn pipeline_respects_domain_override() {
        let (extractor, detector, nav, markdown) = tools();
        let url = Url::parse("https://example.com/custom").unwrap();
        let words = (0..120)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let body = format!(
            r#"<html><body>
                <div class="promo">Promo to remove</div>
                <div class="custom-body"><p>{}</p></div>
            </body></html>"#,
            words
        );

        let output = run_pipeline(
            &body,
            &url,
            &["div.custom-body".to_string()],
            &[".promo".to_string()],
            &extractor,
            &detector,
            &nav,
            &markdown,
        );

        assert_eq!(output.method, ExtractionMethod::DomainOverride);
        assert!(!output.clean_html.contains("Promo to remove"));
    }
}
