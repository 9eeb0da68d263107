//! Main-content extraction
//!
//! A cascade of strategies over the cleaned document, tried in order:
//! domain-override selectors, readability, semantic tags, CMS selector
//! patterns, and finally the cleaned body itself. A strategy succeeds iff
//! it yields non-empty HTML whose text body has at least the configured
//! word count; the fallback never fails.

pub mod cleaner;
pub mod metadata;
pub mod quality;
mod types;

pub use types::*;

use std::io::Cursor;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Semantic main-content tags, in priority order.
const SEMANTIC_SELECTORS: &[&str] = &["article", "main", "[role='main']", "[itemprop='articleBody']"];

/// Well-known CMS content containers, in priority order.
const CMS_SELECTORS: &[&str] = &[
    ".entry-content",
    ".post-content",
    ".article-content",
    ".content-area",
    "#content",
    ".main-content",
    "[itemprop='articleBody']",
];

/// Content extractor running the strategy cascade
pub struct ContentExtractor {
    config: ExtractorConfig,
    semantic_selectors: Vec<Selector>,
    cms_selectors: Vec<Selector>,
}

impl ContentExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let semantic_selectors = SEMANTIC_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();
        let cms_selectors = CMS_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();
        Self {
            config,
            semantic_selectors,
            cms_selectors,
        }
    }

    /// Run the cascade over cleaned HTML.
    ///
    /// `override_selectors` carries the domain override's main-content
    /// selectors, tried before anything else.
    pub fn extract(
        &self,
        cleaned_html: &str,
        url: &Url,
        override_selectors: &[String],
    ) -> ExtractedContent {
        let document = Html::parse_fragment(cleaned_html);

        if let Some((html, word_count)) = self.try_override(&document, override_selectors) {
            return self.finish(html, word_count, ExtractionMethod::DomainOverride);
        }

        if let Some((html, word_count)) = self.try_readability(cleaned_html, url) {
            return self.finish(html, word_count, ExtractionMethod::Readability);
        }

        if let Some((html, word_count)) = self.try_selectors(&document, &self.semantic_selectors) {
            return self.finish(html, word_count, ExtractionMethod::Semantic);
        }

        if let Some((html, word_count)) = self.try_selectors(&document, &self.cms_selectors) {
            return self.finish(html, word_count, ExtractionMethod::CmsPattern);
        }

        // Fallback: the cleaned body, whatever its word count
        let word_count = word_count(&text_of(cleaned_html));
        self.finish(cleaned_html.to_string(), word_count, ExtractionMethod::Fallback)
    }

    fn finish(&self, html: String, word_count: usize, method: ExtractionMethod) -> ExtractedContent {
        let junk = junk_score(&html);
        debug!(
            method = method.as_str(),
            word_count, junk_score = junk, "Content extraction complete"
        );
        ExtractedContent {
            clean_html: html,
            word_count,
            method,
            junk_score: junk,
        }
    }

    fn try_override(
        &self,
        document: &Html,
        override_selectors: &[String],
    ) -> Option<(String, usize)> {
        for selector_str in override_selectors {
            let sel = match Selector::parse(selector_str) {
                Ok(sel) => sel,
                Err(_) => {
                    debug!("Skipping unparseable override selector: {}", selector_str);
                    continue;
                }
            };
            if let Some(hit) = self.accept(document.select(&sel).next().map(|el| el.inner_html())) {
                return Some(hit);
            }
        }
        None
    }

    fn try_readability(&self, cleaned_html: &str, url: &Url) -> Option<(String, usize)> {
        let mut cursor = Cursor::new(cleaned_html.as_bytes());
        let product = readability::extractor::extract(&mut cursor, url).ok()?;
        let word_count = word_count(&product.text);
        if product.content.trim().is_empty() || word_count < self.config.min_word_count {
            return None;
        }
        Some((product.content, word_count))
    }

    fn try_selectors(&self, document: &Html, selectors: &[Selector]) -> Option<(String, usize)> {
        for sel in selectors {
            if let Some(hit) = self.accept(document.select(sel).next().map(|el| el.inner_html())) {
                return Some(hit);
            }
        }
        None
    }

    /// Apply the word-count success gate to a candidate region.
    fn accept(&self, html: Option<String>) -> Option<(String, usize)> {
        let html = html?;
        if html.trim().is_empty() {
            return None;
        }
        let words = word_count(&text_of(&html));
        if words < self.config.min_word_count {
            return None;
        }
        Some((html, words))
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

/// Text body of an HTML fragment.
pub fn text_of(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect::<Vec<_>>().join(" ")
}

/// Whitespace-split token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Ratio of characters inside `<a>` elements to total text characters,
/// clamped to [0, 1]. A crude navigation-density estimator.
pub fn junk_score(html: &str) -> f64 {
    let fragment = Html::parse_fragment(html);

    let total: usize = fragment
        .root_element()
        .text()
        .map(|t| t.trim().chars().count())
        .sum();
    if total == 0 {
        return 0.0;
    }

    let anchor_sel = match Selector::parse("a") {
        Ok(sel) => sel,
        Err(_) => return 0.0,
    };
    let linked: usize = fragment
        .select(&anchor_sel)
        .map(|a| a.text().map(|t| t.trim().chars().count()).sum::<usize>())
        .sum();

    (linked as f64 / total as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://example.com/article").unwrap()
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn override_selector_wins_the_cascade() {
        let html = format!(
            r#"<div class="custom-main"><p>{}</p></div><article><p>{}</p></article>"#,
            words(150),
            words(150),
        );
        let extractor = ContentExtractor::default();
        let content = extractor.extract(&html, &url(), &["div.custom-main".to_string()]);
        assert_eq!(content.method, ExtractionMethod::DomainOverride);
        assert!(content.word_count >= 100);
        assert!(content.clean_html.contains("word0"));
    }

    #[test]
    fn override_below_threshold_falls_through() {
        let html = format!(
            r#"<div class="custom-main"><p>too short</p></div><article><p>{}</p></article>"#,
            words(150),
        );
        let extractor = ContentExtractor::default();
        let content = extractor.extract(&html, &url(), &["div.custom-main".to_string()]);
        assert_ne!(content.method, ExtractionMethod::DomainOverride);
        assert!(content.word_count >= 100);
    }

    #[test]
    fn rich_article_is_extracted_before_fallback() {
        let html = format!("<article><h1>Title</h1><p>{}</p></article>", words(200));
        let extractor = ContentExtractor::default();
        let content = extractor.extract(&html, &url(), &[]);
        assert_ne!(content.method, ExtractionMethod::Fallback);
        assert!(content.word_count >= 100);
    }

    #[test]
    fn semantic_strategy_picks_first_nonempty_tag() {
        let html = format!("<main><p>{}</p></main>", words(120));
        let document = Html::parse_fragment(&html);
        let extractor = ContentExtractor::default();
        let (content, wc) = extractor
            .try_selectors(&document, &extractor.semantic_selectors)
            .expect("main tag should satisfy the semantic strategy");
        assert!(content.contains("word0"));
        assert!(wc >= 100);
    }

    #[test]
    fn cms_strategy_matches_entry_content() {
        let html = format!(r#"<div class="entry-content"><p>{}</p></div>"#, words(120));
        let document = Html::parse_fragment(&html);
        let extractor = ContentExtractor::default();
        let (content, _) = extractor
            .try_selectors(&document, &extractor.cms_selectors)
            .expect("entry-content should satisfy the CMS strategy");
        assert!(content.contains("word0"));
    }

    #[test]
    fn fallback_triggers_when_everything_is_short() {
        let html = "<div><p>Just a few words here.</p></div>";
        let extractor = ContentExtractor::default();
        let content = extractor.extract(html, &url(), &[]);
        assert_eq!(content.method, ExtractionMethod::Fallback);
        assert!(content.word_count < 100);
        assert!(content.word_count > 0);
    }

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count("one  two\nthree\tfour"), 4);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn junk_score_is_link_density() {
        assert_eq!(junk_score("<p>no links at all</p>"), 0.0);

        let all_links = r#"<ul><li><a href="/a">aaaa</a></li><li><a href="/b">bbbb</a></li></ul>"#;
        assert!((junk_score(all_links) - 1.0).abs() < f64::EPSILON);

        let mixed = r#"<p>plain text body</p><a href="/x">link</a>"#;
        let score = junk_score(mixed);
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn junk_score_of_empty_is_zero() {
        assert_eq!(junk_score(""), 0.0);
    }
}
