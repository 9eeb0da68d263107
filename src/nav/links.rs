//! Content link enumeration and classification
//!
//! Links inside the main content region are classified by the structural
//! region they sit in, with anchor links overriding to jump links. The
//! nearest preceding heading and the link's position in the body are
//! recorded for downstream link weighting.

use std::collections::HashMap;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::structure::{StructuralElement, StructuralKind};
use crate::urlnorm;

use super::types::{ContentLink, LinkSourceType};

/// Main content region candidates, in priority order.
const MAIN_REGION_SELECTORS: &[&str] = &[
    "main",
    "#main-content",
    "#content",
    ".content",
    "article",
    ".entry-content",
    ".post-content",
    ".page-content",
    "[role='main']",
];

/// Ancestor class tokens that exclude a link from the content set.
const EXCLUDED_ANCESTOR_CLASSES: &[&str] = &["nav", "menu", "sidebar", "footer", "header"];

/// Ancestor tags that exclude a link from the content set.
const EXCLUDED_ANCESTOR_TAGS: &[&str] = &["nav", "header", "footer", "aside"];

pub(super) fn extract_content_links(
    document: &Html,
    page_url: &Url,
    elements: &[StructuralElement],
) -> Vec<ContentLink> {
    let region = find_main_region(document);
    let Some(region) = region else {
        return Vec::new();
    };

    let Ok(anchor_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let kind_by_node: HashMap<NodeId, StructuralKind> = elements
        .iter()
        .filter_map(|e| e.node.map(|id| (id, e.kind())))
        .collect();

    let page_canonical = urlnorm::normalize_url(page_url).unwrap_or_default();

    // First pass: collect eligible anchors so positions use the real total
    let anchors: Vec<ElementRef> = region
        .select(&anchor_sel)
        .filter(|a| !has_excluded_ancestor(a, &region))
        .collect();
    let total = anchors.len().max(1);

    let mut links = Vec::new();
    for (index, anchor) in anchors.iter().enumerate() {
        let Some(href) = anchor.value().attr("href") else { continue };
        let href = href.trim();
        if href.is_empty() || href.starts_with("javascript:") {
            continue;
        }

        let Ok(url) = urlnorm::resolve(href, page_url) else { continue };

        let mut source_type = classify(anchor, &kind_by_node);

        // Pure anchors and same-page fragment links are jump links
        if href.starts_with('#') || (href.contains('#') && url == page_canonical) {
            source_type = LinkSourceType::TocOrJump;
        }

        let label = link_label(anchor);
        let is_external = is_external(&url, page_url);
        let body_position_pct =
            ((100.0 * index as f64) / total as f64).round() as u8;

        links.push(ContentLink {
            url,
            label,
            source_type,
            nearest_heading: nearest_heading(anchor, &region),
            body_position_pct,
            is_external,
        });
    }

    links
}

fn find_main_region(document: &Html) -> Option<ElementRef<'_>> {
    for selector_str in MAIN_REGION_SELECTORS {
        if let Ok(sel) = Selector::parse(selector_str) {
            if let Some(el) = document.select(&sel).next() {
                return Some(el);
            }
        }
    }
    Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
}

/// Whether any ancestor between the anchor and the region root is a
/// navigation/header/footer/sidebar container.
fn has_excluded_ancestor(anchor: &ElementRef, region: &ElementRef) -> bool {
    let mut current = anchor.parent();
    while let Some(node) = current {
        if node.id() == region.id() {
            break;
        }
        if let Some(el) = node.value().as_element() {
            if EXCLUDED_ANCESTOR_TAGS.contains(&el.name()) {
                return true;
            }
            if let Some(classes) = el.attr("class") {
                let lower = classes.to_lowercase();
                if EXCLUDED_ANCESTOR_CLASSES
                    .iter()
                    .any(|token| lower.contains(token))
                {
                    return true;
                }
            }
        }
        current = node.parent();
    }
    false
}

/// Classify by the innermost structural region containing the anchor.
fn classify(anchor: &ElementRef, kind_by_node: &HashMap<NodeId, StructuralKind>) -> LinkSourceType {
    let mut current = Some(**anchor);
    while let Some(node) = current {
        if let Some(kind) = kind_by_node.get(&node.id()) {
            return match kind {
                StructuralKind::FaqModule => LinkSourceType::FaqModule,
                // An accordion is FAQ-shaped for link weighting
                StructuralKind::Accordion => LinkSourceType::FaqModule,
                StructuralKind::TocOrJump => LinkSourceType::TocOrJump,
                StructuralKind::Breadcrumb => LinkSourceType::Breadcrumb,
                StructuralKind::TemplateCta => LinkSourceType::TemplateCta,
                StructuralKind::Testimonial => LinkSourceType::Testimonial,
                StructuralKind::AuthorBio => LinkSourceType::AuthorBio,
                StructuralKind::RelatedPosts => LinkSourceType::RelatedPosts,
            };
        }
        current = node.parent();
    }
    LinkSourceType::ContextualBody
}

fn link_label(anchor: &ElementRef) -> String {
    let text = anchor.text().collect::<String>().trim().to_string();
    if !text.is_empty() {
        return text;
    }

    for node in anchor.descendants() {
        if let Some(el) = node.value().as_element() {
            if el.name() == "img" {
                if let Some(alt) = el.attr("alt") {
                    let alt = alt.trim();
                    if !alt.is_empty() {
                        return alt.to_string();
                    }
                }
            }
        }
    }
    String::new()
}

fn is_external(normalized_url: &str, page_url: &Url) -> bool {
    let link_host = Url::parse(normalized_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_default();
    !urlnorm::same_site(&link_host, page_url.host_str().unwrap_or_default())
}

/// Closest preceding heading, by previous-sibling then
/// parent-previous-sibling walk.
fn nearest_heading(anchor: &ElementRef, region: &ElementRef) -> Option<String> {
    fn heading_text(node: &ego_tree::NodeRef<Node>) -> Option<String> {
        let el = ElementRef::wrap(*node)?;
        if matches!(el.value().name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
            let text = el.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
        None
    }

    /// Last heading in document order within a subtree.
    fn last_heading_within(node: &ego_tree::NodeRef<Node>) -> Option<String> {
        let el = ElementRef::wrap(*node)?;
        let sel = Selector::parse("h1, h2, h3, h4, h5, h6").ok()?;
        el.select(&sel)
            .last()
            .map(|h| h.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    let mut node = **anchor;
    loop {
        for prev in node.prev_siblings() {
            if let Some(text) = heading_text(&prev) {
                return Some(text);
            }
            if let Some(text) = last_heading_within(&prev) {
                return Some(text);
            }
        }
        let parent = node.parent()?;
        if parent.id() == region.id() {
            // Headings above the region don't describe its links
            return None;
        }
        node = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::StructuralDetector;

    fn page() -> Url {
        Url::parse("https://example.com/post").unwrap()
    }

    fn extract(html: &str) -> Vec<ContentLink> {
        let document = Html::parse_document(html);
        let elements = StructuralDetector::new().detect(&document, html);
        extract_content_links(&document, &page(), &elements)
    }

    #[test]
    fn body_links_are_contextual_and_normalized() {
        let html = r#"<html><body><article>
            <p>See <a href="/other?utm_source=x">the other post</a> for details.</p>
        </article></body></html>"#;
        let links = extract(html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/other");
        assert_eq!(links[0].label, "the other post");
        assert_eq!(links[0].source_type, LinkSourceType::ContextualBody);
        assert!(!links[0].is_external);
    }

    #[test]
    fn links_in_faq_region_are_classified() {
        let html = r#"<html><body><article>
            <div class="faq"><dl>
                <dt>Where to read more?</dt>
                <dd><a href="/more">Right here</a></dd>
            </dl></div>
            <p><a href="/plain">Plain link</a></p>
        </article></body></html>"#;
        let links = extract(html);
        let faq_link = links.iter().find(|l| l.label == "Right here").unwrap();
        assert_eq!(faq_link.source_type, LinkSourceType::FaqModule);
        let plain = links.iter().find(|l| l.label == "Plain link").unwrap();
        assert_eq!(plain.source_type, LinkSourceType::ContextualBody);
    }

    #[test]
    fn anchor_links_override_to_jump() {
        let html = r##"<html><body><article>
            <p><a href="#section-2">Jump down</a></p>
        </article></body></html>"##;
        let links = extract(html);
        assert_eq!(links[0].source_type, LinkSourceType::TocOrJump);
    }

    #[test]
    fn nav_ancestors_are_excluded() {
        let html = r#"<html><body><main>
            <div class="inline-menu"><a href="/menu-item">Menu item</a></div>
            <p><a href="/body-link">Body link</a></p>
        </main></body></html>"#;
        let links = extract(html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "Body link");
    }

    #[test]
    fn external_links_are_flagged() {
        let html = r#"<html><body><article>
            <p><a href="https://other.org/ref">Reference</a></p>
        </article></body></html>"#;
        let links = extract(html);
        assert!(links[0].is_external);
    }

    #[test]
    fn nearest_heading_walks_backwards() {
        let html = r#"<html><body><article>
            <h2>Installation</h2>
            <p>Run the installer, then read <a href="/docs">the docs</a>.</p>
            <h2>Usage</h2>
            <p><a href="/examples">Examples</a> live elsewhere.</p>
        </article></body></html>"#;
        let links = extract(html);
        let docs = links.iter().find(|l| l.label == "the docs").unwrap();
        assert_eq!(docs.nearest_heading.as_deref(), Some("Installation"));
        let examples = links.iter().find(|l| l.label == "Examples").unwrap();
        assert_eq!(examples.nearest_heading.as_deref(), Some("Usage"));
    }

    #[test]
    fn body_position_is_monotonic_percent() {
        let html = r#"<html><body><article>
            <p><a href="/a">A</a></p>
            <p><a href="/b">B</a></p>
            <p><a href="/c">C</a></p>
            <p><a href="/d">D</a></p>
        </article></body></html>"#;
        let links = extract(html);
        assert_eq!(links.len(), 4);
        assert_eq!(links[0].body_position_pct, 0);
        assert_eq!(links[1].body_position_pct, 25);
        assert_eq!(links[2].body_position_pct, 50);
        assert_eq!(links[3].body_position_pct, 75);
    }

    #[test]
    fn image_links_use_alt_as_label() {
        let html = r#"<html><body><article>
            <a href="/gallery"><img src="/thumb.png" alt="Gallery thumbnail"></a>
        </article></body></html>"#;
        let links = extract(html);
        assert_eq!(links[0].label, "Gallery thumbnail");
    }

    #[test]
    fn body_fallback_when_no_main_region() {
        let html = r#"<html><body>
            <p><a href="/somewhere">Somewhere</a></p>
        </body></html>"#;
        let links = extract(html);
        assert_eq!(links.len(), 1);
    }
}
