//! Structural region detection
//!
//! Classifies contiguous regions of the raw HTML (FAQ, table of contents,
//! breadcrumb, CTA, accordion, testimonial, author bio, related posts) by
//! a fixed selector table per kind, with byte offsets into the raw string.
//! FAQ has a second path through JSON-LD `FAQPage` blocks. Offsets are
//! recovered by document-order substring search of each element's
//! serialized form.

mod types;

pub use types::*;

use std::collections::{HashMap, HashSet};

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Selector tables per kind, tried in order.
const FAQ_SELECTORS: &[&str] = &[
    ".faq",
    ".faqs",
    ".faq-section",
    ".faq-container",
    ".faq-block",
    "#faq",
    "#faqs",
    ".wp-block-yoast-faq-block",
    ".schema-faq",
    ".qa-section",
    ".frequently-asked-questions",
];

/// Question selectors tried inside a FAQ region; the first one with hits
/// wins so widget variants don't double-count.
const FAQ_QUESTION_SELECTORS: &[&str] = &[
    ".faq-question",
    ".schema-faq-question",
    ".question",
    ".accordion-title",
    ".accordion-header",
    ".accordion-button",
    "dt",
    "summary",
    "h3",
    "h4",
];

const TOC_SELECTORS: &[&str] = &[
    ".toc",
    "#toc",
    ".table-of-contents",
    "#table-of-contents",
    ".toc-container",
    ".ez-toc-container",
    "#ez-toc-container",
    "nav.toc",
    ".jump-links",
    ".lwptoc",
];

const BREADCRUMB_SELECTORS: &[&str] = &[
    ".breadcrumb",
    ".breadcrumbs",
    "#breadcrumbs",
    "nav[aria-label='breadcrumb']",
    "nav[aria-label='Breadcrumb']",
    ".yoast-breadcrumb",
    ".rank-math-breadcrumb",
    ".woocommerce-breadcrumb",
];

const CTA_SELECTORS: &[&str] = &[
    ".cta",
    ".call-to-action",
    ".cta-section",
    ".cta-banner",
    ".cta-box",
    ".hero-cta",
];

const ACCORDION_SELECTORS: &[&str] = &[
    ".accordion",
    ".accordions",
    "details",
    ".collapse",
    ".collapsible",
    ".elementor-accordion",
];

const TESTIMONIAL_SELECTORS: &[&str] = &[
    ".testimonial",
    ".testimonials",
    ".testimonial-slider",
    ".reviews",
    ".review-card",
];

const AUTHOR_BIO_SELECTORS: &[&str] = &[
    ".author-bio",
    ".author-box",
    ".about-author",
    ".post-author",
    ".author-info",
    ".entry-author",
];

const RELATED_SELECTORS: &[&str] = &[
    ".related-posts",
    ".related-articles",
    ".related",
    ".yarpp-related",
    ".more-posts",
    ".similar-posts",
];

/// Minimum fraction of in-region links that must be anchor links for a
/// TOC classification, expressed as anchors/total >= 1/2.
const TOC_ANCHOR_NUMERATOR: usize = 1;
const TOC_ANCHOR_DENOMINATOR: usize = 2;

/// Structural region detector
pub struct StructuralDetector {
    tables: Vec<(StructuralKind, Vec<(String, Selector)>)>,
    question_selectors: Vec<Selector>,
    ld_json: Option<Selector>,
    anchor: Option<Selector>,
}

impl StructuralDetector {
    pub fn new() -> Self {
        let compile = |list: &[&str]| -> Vec<(String, Selector)> {
            list.iter()
                .filter_map(|s| Selector::parse(s).ok().map(|sel| (s.to_string(), sel)))
                .collect()
        };

        // Accordion goes last so FAQ suppression can see every FAQ region
        let tables = vec![
            (StructuralKind::FaqModule, compile(FAQ_SELECTORS)),
            (StructuralKind::TocOrJump, compile(TOC_SELECTORS)),
            (StructuralKind::Breadcrumb, compile(BREADCRUMB_SELECTORS)),
            (StructuralKind::TemplateCta, compile(CTA_SELECTORS)),
            (StructuralKind::Testimonial, compile(TESTIMONIAL_SELECTORS)),
            (StructuralKind::AuthorBio, compile(AUTHOR_BIO_SELECTORS)),
            (StructuralKind::RelatedPosts, compile(RELATED_SELECTORS)),
            (StructuralKind::Accordion, compile(ACCORDION_SELECTORS)),
        ];

        Self {
            tables,
            question_selectors: FAQ_QUESTION_SELECTORS
                .iter()
                .filter_map(|s| Selector::parse(s).ok())
                .collect(),
            ld_json: Selector::parse("script[type='application/ld+json']").ok(),
            anchor: Selector::parse("a[href]").ok(),
        }
    }

    /// Detect all structural regions in the document.
    ///
    /// `raw_html` must be the exact string `document` was parsed from;
    /// offsets index into it.
    pub fn detect(&self, document: &Html, raw_html: &str) -> Vec<StructuralElement> {
        let mut elements: Vec<StructuralElement> = Vec::new();
        let mut seen_starts: HashSet<usize> = HashSet::new();
        let mut cursor: HashMap<String, usize> = HashMap::new();

        // JSON-LD FAQPage blocks first: the schema path wins over any
        // selector match on the same region
        if let Some(ld_sel) = &self.ld_json {
            for script in document.select(ld_sel) {
                let json_text = script.text().collect::<String>();
                let Ok(value) = serde_json::from_str::<serde_json::Value>(&json_text) else {
                    continue;
                };
                let Some(entries) = faq_entries_from_json_ld(&value) else {
                    continue;
                };
                let Some((start, end)) = locate(raw_html, &script, &mut cursor) else {
                    continue;
                };
                if !seen_starts.insert(start) {
                    continue;
                }
                elements.push(StructuralElement {
                    start,
                    end,
                    selector: "script[type='application/ld+json']".to_string(),
                    detail: StructuralDetail::Faq {
                        has_schema: true,
                        entries,
                    },
                    node: Some(script.id()),
                });
            }
        }

        for (kind, selectors) in &self.tables {
            for (selector_str, sel) in selectors {
                for matched in document.select(sel) {
                    let Some((start, end)) = locate(raw_html, &matched, &mut cursor) else {
                        debug!("Could not locate {} region in raw HTML", selector_str);
                        continue;
                    };
                    if seen_starts.contains(&start) {
                        continue;
                    }

                    let detail = match kind {
                        StructuralKind::FaqModule => {
                            let entries = self.harvest_questions(&matched);
                            if entries.is_empty() {
                                continue;
                            }
                            StructuralDetail::Faq {
                                has_schema: false,
                                entries,
                            }
                        }
                        StructuralKind::TocOrJump => {
                            let (total, anchors) = self.link_counts(&matched);
                            if total == 0
                                || anchors * TOC_ANCHOR_DENOMINATOR < total * TOC_ANCHOR_NUMERATOR
                            {
                                continue;
                            }
                            StructuralDetail::Toc {
                                total_links: total,
                                anchor_links: anchors,
                            }
                        }
                        StructuralKind::Breadcrumb => StructuralDetail::Breadcrumb,
                        StructuralKind::TemplateCta => StructuralDetail::TemplateCta,
                        StructuralKind::Testimonial => StructuralDetail::Testimonial,
                        StructuralKind::AuthorBio => StructuralDetail::AuthorBio,
                        StructuralKind::RelatedPosts => StructuralDetail::RelatedPosts,
                        StructuralKind::Accordion => {
                            // FAQ wins over a coinciding accordion widget
                            let overlaps_faq = elements.iter().any(|e| {
                                e.kind() == StructuralKind::FaqModule
                                    && e.start < end
                                    && start < e.end
                            });
                            if overlaps_faq {
                                continue;
                            }
                            StructuralDetail::Accordion
                        }
                    };

                    seen_starts.insert(start);
                    elements.push(StructuralElement {
                        start,
                        end,
                        selector: selector_str.clone(),
                        detail,
                        node: Some(matched.id()),
                    });
                }
            }
        }

        elements.sort_by_key(|e| e.start);
        elements
    }

    /// Harvest question/answer pairs from a selector-matched FAQ region.
    fn harvest_questions(&self, region: &ElementRef) -> Vec<FaqEntry> {
        for sel in &self.question_selectors {
            let mut entries = Vec::new();
            let mut seen = HashSet::new();

            for question_el in region.select(sel) {
                let question = question_el.text().collect::<String>().trim().to_string();
                if question.is_empty() || question.len() > 300 || !seen.insert(question.clone()) {
                    continue;
                }
                let answer = next_sibling_text(&question_el);
                entries.push(FaqEntry { question, answer });
            }

            if !entries.is_empty() {
                return entries;
            }
        }
        Vec::new()
    }

    fn link_counts(&self, region: &ElementRef) -> (usize, usize) {
        let Some(anchor) = &self.anchor else {
            return (0, 0);
        };
        let mut total = 0;
        let mut anchors = 0;
        for link in region.select(anchor) {
            total += 1;
            if link.value().attr("href").is_some_and(|h| h.starts_with('#')) {
                anchors += 1;
            }
        }
        (total, anchors)
    }
}

impl Default for StructuralDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Return the innermost element containing `offset`, by linear scan.
pub fn structural_at(offset: usize, elements: &[StructuralElement]) -> Option<&StructuralElement> {
    elements
        .iter()
        .filter(|e| e.contains(offset))
        .min_by_key(|e| e.end - e.start)
}

/// Locate a matched element's byte range in the raw HTML.
///
/// Serialized forms are searched in document order: repeated identical
/// regions resolve to successive occurrences. When re-serialization does
/// not reproduce the source bytes, an opening-tag pattern is used and the
/// serialized length approximates the span.
fn locate(
    raw: &str,
    element: &ElementRef,
    cursor: &mut HashMap<String, usize>,
) -> Option<(usize, usize)> {
    let serialized = element.html();

    if let Some(start) = find_from(raw, &serialized, cursor) {
        return Some((start, start + serialized.len()));
    }

    let open = opening_pattern(element);
    let start = find_from(raw, &open, cursor)?;
    Some((start, (start + serialized.len()).min(raw.len())))
}

fn find_from(raw: &str, needle: &str, cursor: &mut HashMap<String, usize>) -> Option<usize> {
    let from = *cursor.get(needle).unwrap_or(&0);
    let hit = raw
        .get(from..)
        .and_then(|tail| tail.find(needle).map(|p| p + from))
        .or_else(|| raw.find(needle))?;
    cursor.insert(needle.to_string(), hit + 1);
    Some(hit)
}

fn opening_pattern(element: &ElementRef) -> String {
    let tag = element.value().name();
    match element.value().attrs().next() {
        Some((attr, value)) => format!("<{} {}=\"{}\"", tag, attr, value),
        None => format!("<{}", tag),
    }
}

/// Extract FAQ entries from a JSON-LD value if it describes a `FAQPage`.
fn faq_entries_from_json_ld(value: &serde_json::Value) -> Option<Vec<FaqEntry>> {
    use serde_json::Value;

    match value {
        Value::Array(items) => items.iter().find_map(faq_entries_from_json_ld),
        Value::Object(map) => {
            let is_faq_page = match map.get("@type") {
                Some(Value::String(t)) => t == "FAQPage",
                Some(Value::Array(types)) => {
                    types.iter().any(|t| t.as_str() == Some("FAQPage"))
                }
                _ => false,
            };

            if is_faq_page {
                let entries = map
                    .get("mainEntity")
                    .map(collect_main_entity)
                    .unwrap_or_default();
                return Some(entries);
            }

            map.get("@graph").and_then(faq_entries_from_json_ld)
        }
        _ => None,
    }
}

fn collect_main_entity(value: &serde_json::Value) -> Vec<FaqEntry> {
    use serde_json::Value;

    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| {
            let question = item.get("name")?.as_str()?.trim().to_string();
            if question.is_empty() {
                return None;
            }
            let answer = item
                .get("acceptedAnswer")
                .and_then(|a| match a {
                    Value::Array(answers) => answers.first(),
                    other => Some(other),
                })
                .and_then(|a| a.get("text"))
                .and_then(|t| t.as_str())
                .map(|t| t.trim().to_string());
            Some(FaqEntry { question, answer })
        })
        .collect()
}

/// Text of the next element sibling, used as the answer for a harvested
/// question.
fn next_sibling_text(element: &ElementRef) -> Option<String> {
    let mut sibling = element.next_sibling();
    while let Some(node) = sibling {
        if let Some(el) = ElementRef::wrap(node) {
            let text = el.text().collect::<String>().trim().to_string();
            return if text.is_empty() { None } else { Some(text) };
        }
        sibling = node.next_sibling();
    }
    None
}
