//! HTML cleaner
//!
//! Strips scripts, styles, navigation landmarks, ads, comments, and empty
//! anchors from raw HTML before content extraction. Cleaning is
//! best-effort: when the document has no body the input is returned
//! unmodified with a warning.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use scraper::{Html, Node, Selector};
use tracing::warn;

/// Tags removed wholesale, with their subtrees.
const REMOVE_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "nav", "header", "footer", "aside", "template",
];

/// Class- and role-based junk containers removed in the same pass.
const REMOVE_SELECTORS: &[&str] = &[
    ".banner",
    ".menu",
    ".sidebar",
    ".modal",
    ".ad",
    ".ads",
    ".advert",
    ".advertisement",
    ".popup",
    ".cookie-banner",
    ".cookie-notice",
    ".newsletter-signup",
    ".social-share",
    ".comments",
    "#comments",
    "#sidebar",
    "[role='navigation']",
    "[role='banner']",
    "[role='complementary']",
    "[role='contentinfo']",
    "[role='dialog']",
    "[role='search']",
];

/// Elements that never take a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Remove boilerplate from raw HTML and return the cleaned body inner HTML.
///
/// `extra_remove` carries domain-override removal selectors applied in the
/// same pass as the built-in set.
pub fn clean_html(html: &str, extra_remove: &[String]) -> String {
    let document = Html::parse_document(html);

    let body = match Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
    {
        Some(body) => body,
        None => {
            warn!("HTML has no body element, returning input unmodified");
            return html.to_string();
        }
    };

    let mut removed: HashSet<NodeId> = HashSet::new();
    for selector_str in REMOVE_SELECTORS
        .iter()
        .map(|s| s.to_string())
        .chain(extra_remove.iter().cloned())
    {
        match Selector::parse(&selector_str) {
            Ok(sel) => {
                for matched in document.select(&sel) {
                    removed.insert(matched.id());
                }
            }
            Err(_) => warn!("Skipping unparseable removal selector: {}", selector_str),
        }
    }

    let mut out = String::new();
    for child in body.children() {
        serialize_node(child, &removed, &mut out);
    }
    out.trim().to_string()
}

fn serialize_node(node: NodeRef<Node>, removed: &HashSet<NodeId>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(&escape_text(text));
        }
        Node::Element(element) => {
            if removed.contains(&node.id()) {
                return;
            }
            let name = element.name();
            if REMOVE_TAGS.contains(&name) {
                return;
            }
            if name == "a" && is_empty_anchor(&node) {
                return;
            }

            out.push('<');
            out.push_str(name);
            for (attr, value) in element.attrs() {
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');

            if VOID_TAGS.contains(&name) {
                return;
            }

            for child in node.children() {
                serialize_node(child, removed, out);
            }

            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        // Comments, doctypes, and processing instructions are dropped
        _ => {}
    }
}

/// Whether an anchor has no text and no image descendant.
fn is_empty_anchor(node: &NodeRef<Node>) -> bool {
    let mut has_text = false;
    let mut has_image = false;

    for descendant in node.descendants() {
        match descendant.value() {
            Node::Text(text) => {
                if !text.trim().is_empty() {
                    has_text = true;
                }
            }
            Node::Element(element) => {
                if matches!(element.name(), "img" | "svg" | "picture") {
                    has_image = true;
                }
            }
            _ => {}
        }
    }

    !has_text && !has_image
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
