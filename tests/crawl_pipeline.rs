//! Cross-module pipeline properties over fixture HTML.
//!
//! These exercise the invariants that hold across component boundaries:
//! URL identity laws, marker balance and the marker-strip law, H1
//! hoisting, navigation-list suppression, and soft-404 classification.

use regex::Regex;
use scraper::Html;
use url::Url;

use sitescribe::extract::{cleaner, quality, ContentExtractor, ExtractionMethod};
use sitescribe::markdown::{MarkdownBuilder, MARKER_STRIP_PATTERN};
use sitescribe::nav::NavigationExtractor;
use sitescribe::structure::{StructuralDetector, StructuralStats};
use sitescribe::urlnorm;

fn page_url() -> Url {
    Url::parse("https://example.com/post").unwrap()
}

fn words(n: usize) -> String {
    (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
}

struct PageProducts {
    enhanced: String,
    plain: String,
    stats: StructuralStats,
    nav: sitescribe::nav::NavStructure,
}

fn run_page(html: &str, h1: Option<&str>) -> PageProducts {
    let document = Html::parse_document(html);
    let elements = StructuralDetector::new().detect(&document, html);
    let stats = StructuralStats::from_elements(&elements);
    let nav = NavigationExtractor::new().extract(&document, &page_url(), &elements);
    let markdown = MarkdownBuilder::new().build(&document, &elements, &page_url(), h1);
    PageProducts {
        enhanced: markdown.enhanced,
        plain: markdown.plain,
        stats,
        nav,
    }
}

#[test]
fn normalize_is_idempotent_over_many_shapes() {
    let inputs = [
        "https://Example.com/A/B/?z=1&a=2&utm_campaign=x#frag",
        "EX.com/old?utm_source=x",
        "https://ex.com/old/",
        "https://ex.com",
        "https://ex.com/path?q=hello%20world&fbclid=123",
        "https://sub.domain.example.org/deep/path///",
    ];
    for input in inputs {
        let once = urlnorm::normalize(input).unwrap();
        assert_eq!(urlnorm::normalize(&once).unwrap(), once, "input: {}", input);
    }
}

#[test]
fn cosmetic_variants_share_one_identity() {
    let pairs = [
        ("https://EX.com/old?utm_source=x", "https://ex.com/old/"),
        ("https://ex.com/p?b=2&a=1", "https://ex.com/p?a=1&b=2#top"),
        ("ex.com/page", "https://ex.com/page/"),
    ];
    for (a, b) in pairs {
        assert!(urlnorm::equivalent(a, b), "{} should equal {}", a, b);
    }
}

#[test]
fn faq_json_ld_scenario() {
    let html = r#"<html><body><article>
<h1>Guide</h1>
<p>Intro paragraph.</p>
<script type="application/ld+json">{"@context":"https://schema.org","@type":"FAQPage","mainEntity":[{"@type":"Question","name":"Q1","acceptedAnswer":{"@type":"Answer","text":"First answer."}},{"@type":"Question","name":"Q2","acceptedAnswer":{"@type":"Answer","text":"Second answer."}}]}</script>
</article></body></html>"#;

    let products = run_page(html, None);

    assert!(products.stats.faq_modules >= 1);
    assert_eq!(
        products.enhanced.matches("<!-- STRUCT:FAQ:START -->").count(),
        products.enhanced.matches("<!-- STRUCT:FAQ:END -->").count()
    );
    assert!(products.enhanced.contains("<!-- STRUCT:FAQ:Q -->"));
    assert!(products.enhanced.contains("**Q1**"));
    assert!(products.enhanced.contains("First answer."));
}

#[test]
fn marker_balance_holds_for_every_type() {
    let html = r##"<html><body><article>
<div class="toc"><ul><li><a href="#a">A</a></li><li><a href="#b">B</a></li></ul></div>
<div class="faq"><dl><dt>Q?</dt><dd>A.</dd></dl></div>
<div class="cta"><a href="/go">Go</a></div>
<div class="testimonial"><p>Nice.</p></div>
<div class="author-bio"><p>By someone.</p></div>
<div class="related-posts"><p>More: <a href="/m">m</a></p></div>
<p>Body text.</p>
</article></body></html>"##;

    let products = run_page(html, None);

    for tag in ["FAQ", "TOC", "CTA", "TESTIMONIAL", "AUTHOR", "RELATED", "BREADCRUMB", "ACCORDION"] {
        let starts = products
            .enhanced
            .matches(&format!("<!-- STRUCT:{}:START -->", tag))
            .count();
        let ends = products
            .enhanced
            .matches(&format!("<!-- STRUCT:{}:END -->", tag))
            .count();
        assert_eq!(starts, ends, "unbalanced {} markers", tag);
    }
    assert!(products.enhanced.contains("<!-- STRUCT:TOC:START -->"));
    assert!(products.enhanced.contains("<!-- STRUCT:CTA:START -->"));
}

#[test]
fn stripping_markers_yields_plain_exactly() {
    let html = r#"<html><body><article>
<div class="faq"><dl><dt>How?</dt><dd>Like this.</dd></dl></div>
<p>Some prose follows the FAQ.</p>
</article></body></html>"#;

    let products = run_page(html, None);

    // The documented derivation: one regex plus blank-run collapse
    let strip = Regex::new(MARKER_STRIP_PATTERN).unwrap();
    let blanks = Regex::new(r"\n{3,}").unwrap();
    let derived = strip.replace_all(&products.enhanced, "");
    let derived = derived
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    let derived = blanks.replace_all(&derived, "\n\n").trim().to_string();

    assert_eq!(products.plain, derived);
    assert!(!products.plain.contains("STRUCT"));
}

#[test]
fn h1_hoisting_law() {
    let html = r#"<html><body><article>
<p>Opening paragraph without any heading.</p>
</article></body></html>"#;

    let products = run_page(html, Some("Hoisted Title"));
    let first_line = products
        .plain
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap();
    assert_eq!(first_line, "# Hoisted Title");
}

#[test]
fn base64_image_scenario() {
    let payload = "A".repeat(100);
    let html = format!(
        r#"<html><body><article>
<p>{}</p>
<img src="data:image/png;base64,{}" alt="chart">
</article></body></html>"#,
        words(30),
        payload
    );

    let products = run_page(&html, None);

    assert!(products.plain.contains("![chart](data:image/png;base64,...)"));
    // No base64 run of 50+ chars survives anywhere in the Markdown
    let long_b64 = Regex::new(r"base64,[A-Za-z0-9+/=]{50,}").unwrap();
    assert!(!long_b64.is_match(&products.plain));
    assert!(!long_b64.is_match(&products.enhanced));
}

#[test]
fn nav_list_suppression_scenario() {
    let mut footer_items = String::new();
    for i in 0..10 {
        footer_items.push_str(&format!(r#"<li><a href="/f{}">Footer {}</a></li>"#, i, i));
    }
    let html = format!(
        r#"<html><body>
<article><p>{}</p></article>
<footer><nav><ul>{}</ul></nav></footer>
</body></html>"#,
        words(40),
        footer_items
    );

    let products = run_page(&html, None);

    // Present as a navigation cluster, absent from the Markdown
    assert_eq!(products.nav.footer_nav.len(), 10);
    assert!(!products.plain.contains("Footer 3"));
    assert!(!products.enhanced.contains("Footer 3"));
}

#[test]
fn body_link_only_list_is_dropped_from_markdown() {
    let html = format!(
        r#"<html><body><article>
<p>{}</p>
<ul>
<li><a href="/1">One</a></li>
<li><a href="/2">Two</a></li>
<li><a href="/3">Three</a></li>
<li><a href="/4">Four</a></li>
<li><a href="/5">Five</a></li>
</ul>
</article></body></html>"#,
        words(20)
    );
    let products = run_page(&html, None);
    assert!(!products.plain.contains("[One]"));
}

#[test]
fn soft404_scenario() {
    let body_40_words = words(37);
    let html = format!(
        r#"<html><head><title>Page Not Found</title></head><body>
<p>{}</p>
</body></html>"#,
        body_40_words
    );

    let cleaned = cleaner::clean_html(&html, &[]);
    let content = ContentExtractor::default().extract(&cleaned, &page_url(), &[]);

    assert!(content.word_count < 150);
    assert!(quality::looks_like_soft404(
        Some("Page Not Found"),
        &body_40_words,
        content.word_count,
    ));
}

#[test]
fn fallback_extraction_boundary() {
    let html = format!("<div><p>{}</p></div>", words(50));
    let content = ContentExtractor::default().extract(&html, &page_url(), &[]);
    assert_eq!(content.method, ExtractionMethod::Fallback);

    let html = format!("<article><p>{}</p></article>", words(200));
    let content = ContentExtractor::default().extract(&html, &page_url(), &[]);
    assert_ne!(content.method, ExtractionMethod::Fallback);
}

#[test]
fn content_hash_matches_documented_definition() {
    let clean = "<p>Some   content\nwith whitespace</p>";
    let hash = quality::content_hash(clean).unwrap();

    let normalized = clean.split_whitespace().collect::<Vec<_>>().join(" ");
    let expected = format!("{:x}", md5::compute(normalized.as_bytes()));
    assert_eq!(hash, expected);
}

#[test]
fn content_links_are_absolute_and_normalized() {
    let html = r#"<html><body><article>
<p><a href="/relative?utm_source=x">Rel</a></p>
<p><a href="https://Other.ORG/x/">Abs</a></p>
</article></body></html>"#;

    let products = run_page(html, None);
    for link in &products.nav.content_links {
        let normalized = urlnorm::normalize(&link.url).unwrap();
        assert_eq!(link.url, normalized, "stored link must be canonical");
        assert!(link.url.starts_with("http"));
    }
}
