//! Navigation cluster extraction
//!
//! Each cluster is found by a priority-ordered selector list; the first
//! container meeting the cluster's predicate wins. Menus are walked as a
//! tree to depth 3 with dense per-depth ordering. Content links are
//! enumerated separately and classified by the structural region they sit
//! in (see `links`).

mod links;
mod types;

pub use types::*;

use std::collections::HashSet;
use std::time::Instant;

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::structure::StructuralElement;
use crate::urlnorm;

/// Maximum menu nesting depth
const MAX_MENU_DEPTH: u8 = 3;

/// Link cap for the generic footer fallback scan
const FOOTER_FALLBACK_CAP: usize = 20;

/// Primary nav containers, in priority order
const PRIMARY_NAV_SELECTORS: &[&str] = &[
    "nav.primary-navigation",
    "nav.main-navigation",
    "#primary-menu",
    "#main-menu",
    "#site-navigation",
    ".main-nav",
    ".primary-nav",
    ".navbar-nav",
    "header nav",
];

/// Broad fallback tried when every priority selector fails
const PRIMARY_NAV_FALLBACK: &str = "nav, [role='navigation']";

const FOOTER_NAV_SELECTORS: &[&str] = &[
    "footer nav",
    ".footer-nav",
    ".footer-menu",
    "#footer-menu",
    ".footer-links",
    "footer .menu",
];

const FOOTER_FALLBACK_SELECTORS: &[&str] = &["footer", ".site-footer", "#footer", ".footer-widgets"];

const UTILITY_SELECTORS: &[&str] = &[
    ".utility-nav",
    ".top-bar",
    ".topbar",
    ".header-top",
    ".secondary-nav",
    ".header-contact",
];

const LANGUAGE_SELECTORS: &[&str] = &[
    ".language-switcher",
    ".lang-switcher",
    ".wpml-ls",
    ".lang-menu",
    ".polylang-switcher",
    "nav.languages",
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

/// Scheme prefixes that mark a link as utility rather than navigation
const UTILITY_PREFIXES: &[&str] = &["tel:", "mailto:", "sms:", "whatsapp:"];

/// Social domains excluded from navigation clusters
const SOCIAL_DOMAINS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
    "pinterest.com",
    "tiktok.com",
];

/// Breadcrumb separator tokens dropped during tokenization
const BREADCRUMB_SEPARATORS: &[&str] = &[">", "/", "»", "|", "→", "›", "-", "·"];

struct CompiledList {
    selectors: Vec<(String, Selector)>,
}

impl CompiledList {
    fn new(list: &[&str]) -> Self {
        Self {
            selectors: list
                .iter()
                .filter_map(|s| Selector::parse(s).ok().map(|sel| (s.to_string(), sel)))
                .collect(),
        }
    }
}

/// Navigation cluster extractor
pub struct NavigationExtractor {
    primary: CompiledList,
    primary_fallback: Option<Selector>,
    footer: CompiledList,
    footer_fallback: CompiledList,
    utility: CompiledList,
    language: CompiledList,
    breadcrumb: CompiledList,
    anchor: Option<Selector>,
    header_utility: Vec<Selector>,
}

impl NavigationExtractor {
    pub fn new() -> Self {
        Self {
            primary: CompiledList::new(PRIMARY_NAV_SELECTORS),
            primary_fallback: Selector::parse(PRIMARY_NAV_FALLBACK).ok(),
            footer: CompiledList::new(FOOTER_NAV_SELECTORS),
            footer_fallback: CompiledList::new(FOOTER_FALLBACK_SELECTORS),
            utility: CompiledList::new(UTILITY_SELECTORS),
            language: CompiledList::new(LANGUAGE_SELECTORS),
            breadcrumb: CompiledList::new(BREADCRUMB_SELECTORS),
            anchor: Selector::parse("a[href]").ok(),
            header_utility: ["header a[href^='tel:']", "header a[href^='mailto:']"]
                .iter()
                .filter_map(|s| Selector::parse(s).ok())
                .collect(),
        }
    }

    /// Extract every navigation cluster plus classified content links.
    pub fn extract(
        &self,
        document: &Html,
        page_url: &Url,
        elements: &[StructuralElement],
    ) -> NavStructure {
        let start = Instant::now();
        let mut meta = ExtractionMeta::default();

        let primary_nav = self.extract_primary(document, page_url, &mut meta);
        let footer_nav = self.extract_footer(document, page_url, &mut meta);
        let utility_header = self.extract_utility(document, page_url, &mut meta);
        let language_switcher = self.extract_language(document, page_url, &mut meta);
        let breadcrumb = self.extract_breadcrumb(document, page_url, &mut meta);
        let content_links = links::extract_content_links(document, page_url, elements);

        meta.cluster_count = [
            !primary_nav.is_empty(),
            !footer_nav.is_empty(),
            !utility_header.is_empty(),
            !language_switcher.is_empty(),
            !breadcrumb.is_empty(),
        ]
        .iter()
        .filter(|present| **present)
        .count();
        meta.has_mega_menu =
            primary_nav.len() > 15 && primary_nav.iter().any(|item| item.depth >= 1);
        meta.extraction_time_ms = start.elapsed().as_millis() as u64;

        NavStructure {
            primary_nav,
            footer_nav,
            utility_header,
            language_switcher,
            breadcrumb,
            content_links,
            extraction_meta: meta,
        }
    }

    fn extract_primary(
        &self,
        document: &Html,
        page_url: &Url,
        meta: &mut ExtractionMeta,
    ) -> Vec<NavItem> {
        for (selector_str, sel) in &self.primary.selectors {
            for container in document.select(sel) {
                let items = self.walk_menu(container, page_url);
                if internal_count(&items) >= 3 {
                    meta.selectors_matched.push(format!("primary:{}", selector_str));
                    return items;
                }
            }
        }

        if let Some(fallback) = &self.primary_fallback {
            for container in document.select(fallback) {
                let items = self.walk_menu(container, page_url);
                if internal_count(&items) >= 3 {
                    meta.selectors_matched.push("primary:fallback".to_string());
                    return items;
                }
            }
        }

        Vec::new()
    }

    fn extract_footer(
        &self,
        document: &Html,
        page_url: &Url,
        meta: &mut ExtractionMeta,
    ) -> Vec<NavItem> {
        for (selector_str, sel) in &self.footer.selectors {
            for container in document.select(sel) {
                let items = self.walk_menu(container, page_url);
                if items.len() >= 2 {
                    meta.selectors_matched.push(format!("footer:{}", selector_str));
                    return items;
                }
            }
        }

        // Fallback: flat scan of generic footer containers
        for (selector_str, sel) in &self.footer_fallback.selectors {
            if let Some(container) = document.select(sel).next() {
                let items = self.flat_links(container, page_url, FOOTER_FALLBACK_CAP, true);
                if !items.is_empty() {
                    meta.selectors_matched.push(format!("footer:{}", selector_str));
                    return items;
                }
            }
        }

        Vec::new()
    }

    fn extract_utility(
        &self,
        document: &Html,
        page_url: &Url,
        meta: &mut ExtractionMeta,
    ) -> Vec<NavItem> {
        let mut items: Vec<NavItem> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut order = 0u32;

        let mut push = |url: String, label: String, link_type: LinkType, is_external: bool| {
            if seen.insert(url.clone()) {
                items.push(NavItem {
                    url,
                    label,
                    depth: 0,
                    order,
                    parent_labels: None,
                    is_external,
                    link_type,
                });
                order += 1;
            }
        };

        for (selector_str, sel) in &self.utility.selectors {
            let mut matched = false;
            for container in document.select(sel) {
                if let Some(anchor_sel) = &self.anchor {
                    for link in container.select(anchor_sel) {
                        let Some(href) = link.value().attr("href") else { continue };
                        let label = anchor_label(&link);
                        let link_type = link_type_of(&link);
                        if is_utility_href(href) {
                            push(href.to_string(), label, link_type, false);
                            matched = true;
                        } else if let Ok(url) = urlnorm::resolve(href, page_url) {
                            let external = is_external(&url, page_url);
                            push(url, label, link_type, external);
                            matched = true;
                        }
                    }
                }
            }
            if matched {
                meta.selectors_matched.push(format!("utility:{}", selector_str));
            }
        }

        for sel in &self.header_utility {
            for link in document.select(sel) {
                if let Some(href) = link.value().attr("href") {
                    push(href.to_string(), anchor_label(&link), link_type_of(&link), false);
                }
            }
        }

        items
    }

    fn extract_language(
        &self,
        document: &Html,
        page_url: &Url,
        meta: &mut ExtractionMeta,
    ) -> Vec<NavItem> {
        let Some(anchor_sel) = &self.anchor else {
            return Vec::new();
        };

        for (selector_str, sel) in &self.language.selectors {
            for container in document.select(sel) {
                let mut items = Vec::new();
                let mut order = 0u32;

                for link in container.select(anchor_sel) {
                    let Some(href) = link.value().attr("href") else { continue };
                    let Ok(url) = urlnorm::resolve(href, page_url) else { continue };

                    let label = language_label(&link);
                    if label.is_empty() || label.chars().count() > 12 {
                        continue;
                    }

                    items.push(NavItem {
                        is_external: is_external(&url, page_url),
                        url,
                        label,
                        depth: 0,
                        order,
                        parent_labels: None,
                        link_type: link_type_of(&link),
                    });
                    order += 1;
                }

                if (2..=10).contains(&items.len()) {
                    meta.selectors_matched.push(format!("language:{}", selector_str));
                    return items;
                }
            }
        }

        Vec::new()
    }

    fn extract_breadcrumb(
        &self,
        document: &Html,
        page_url: &Url,
        meta: &mut ExtractionMeta,
    ) -> Vec<BreadcrumbItem> {
        for (selector_str, sel) in &self.breadcrumb.selectors {
            if let Some(container) = document.select(sel).next() {
                let mut items = breadcrumb_items(&container, page_url);

                if items.len() < 2 {
                    items = breadcrumb_text_split(&container);
                }

                if items.len() >= 2 {
                    meta.selectors_matched.push(format!("breadcrumb:{}", selector_str));
                    return items;
                }
            }
        }
        Vec::new()
    }

    /// Walk a menu container as a tree.
    ///
    /// Top-level `<li>` children yield depth-0 items in document order;
    /// nested lists recurse to depth 3. A parent item with `href="#"` is
    /// kept iff it has a submenu.
    fn walk_menu(&self, container: ElementRef, page_url: &Url) -> Vec<NavItem> {
        let list = if container.value().name() == "ul" || container.value().name() == "ol" {
            Some(container)
        } else {
            first_list(&container)
        };

        let mut items = Vec::new();
        let mut counters = [0u32; (MAX_MENU_DEPTH + 1) as usize];
        if let Some(list) = list {
            let mut parents = Vec::new();
            self.walk_list(list, 0, &mut parents, &mut counters, &mut items, page_url);
        }
        items
    }

    fn walk_list(
        &self,
        list: ElementRef,
        depth: u8,
        parents: &mut Vec<String>,
        counters: &mut [u32; (MAX_MENU_DEPTH + 1) as usize],
        items: &mut Vec<NavItem>,
        page_url: &Url,
    ) {
        for li in list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "li")
        {
            let anchor = direct_anchor(&li);
            let submenu = direct_submenu(&li);

            let Some(anchor) = anchor else {
                // A label-less wrapper still exposes its submenu
                if let Some(submenu) = submenu {
                    if depth < MAX_MENU_DEPTH {
                        self.walk_list(submenu, depth + 1, parents, counters, items, page_url);
                    }
                }
                continue;
            };

            let Some(href) = anchor.value().attr("href") else { continue };
            let label = anchor_label(&anchor);

            if href.trim() == "#" && submenu.is_none() {
                continue;
            }
            if is_utility_href(href) || is_social_href(href) {
                continue;
            }

            let Ok(url) = urlnorm::resolve(href, page_url) else { continue };

            let order = counters[depth as usize];
            counters[depth as usize] += 1;

            items.push(NavItem {
                is_external: is_external(&url, page_url),
                url,
                label: label.clone(),
                depth,
                order,
                parent_labels: if depth > 0 { Some(parents.clone()) } else { None },
                link_type: link_type_of(&anchor),
            });

            if let Some(submenu) = submenu {
                if depth < MAX_MENU_DEPTH {
                    parents.push(label);
                    self.walk_list(submenu, depth + 1, parents, counters, items, page_url);
                    parents.pop();
                }
            }
        }
    }

    /// Flat scan collecting internal non-utility links up to a cap.
    fn flat_links(
        &self,
        container: ElementRef,
        page_url: &Url,
        cap: usize,
        internal_only: bool,
    ) -> Vec<NavItem> {
        let Some(anchor_sel) = &self.anchor else {
            return Vec::new();
        };

        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut order = 0u32;

        for link in container.select(anchor_sel) {
            if items.len() >= cap {
                break;
            }
            let Some(href) = link.value().attr("href") else { continue };
            if is_utility_href(href) || is_social_href(href) {
                continue;
            }
            let Ok(url) = urlnorm::resolve(href, page_url) else { continue };
            let external = is_external(&url, page_url);
            if internal_only && external {
                continue;
            }
            if !seen.insert(url.clone()) {
                continue;
            }

            items.push(NavItem {
                is_external: external,
                url,
                label: anchor_label(&link),
                depth: 0,
                order,
                parent_labels: None,
                link_type: link_type_of(&link),
            });
            order += 1;
        }

        items
    }
}

impl Default for NavigationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// 16-hex-char fingerprint of a cluster: MD5 of its sorted non-external
/// URLs joined by `|`. Enables cross-page nav deduplication downstream.
pub fn nav_fingerprint(items: &[NavItem]) -> String {
    let mut urls: Vec<&str> = items
        .iter()
        .filter(|item| !item.is_external)
        .map(|item| item.url.as_str())
        .collect();
    urls.sort_unstable();
    let digest = format!("{:x}", md5::compute(urls.join("|").as_bytes()));
    digest[..16].to_string()
}

fn internal_count(items: &[NavItem]) -> usize {
    items.iter().filter(|item| !item.is_external).count()
}

fn is_utility_href(href: &str) -> bool {
    let lower = href.trim().to_lowercase();
    UTILITY_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

fn is_social_href(href: &str) -> bool {
    let lower = href.to_lowercase();
    SOCIAL_DOMAINS
        .iter()
        .any(|domain| lower.contains(&format!("//{}", domain)) || lower.contains(&format!(".{}", domain)) || lower.contains(&format!("//www.{}", domain)))
}

fn is_external(normalized_url: &str, page_url: &Url) -> bool {
    let link_host = Url::parse(normalized_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_default();
    let page_host = page_url.host_str().unwrap_or_default();
    !urlnorm::same_site(&link_host, page_host)
}

/// The anchor's own text: direct text nodes first, falling back to the
/// full descendant text, then to an image alt.
fn anchor_label(anchor: &ElementRef) -> String {
    let own: String = anchor
        .children()
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some(text.to_string()),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_string();
    if !own.is_empty() {
        return own;
    }

    let full = anchor.text().collect::<String>().trim().to_string();
    if !full.is_empty() {
        return full;
    }

    image_alt(anchor).unwrap_or_default()
}

fn image_alt(anchor: &ElementRef) -> Option<String> {
    for node in anchor.descendants() {
        if let Some(el) = node.value().as_element() {
            if el.name() == "img" {
                if let Some(alt) = el.attr("alt") {
                    let alt = alt.trim();
                    if !alt.is_empty() {
                        return Some(alt.to_string());
                    }
                }
            }
        }
    }
    None
}

fn link_type_of(anchor: &ElementRef) -> LinkType {
    let mut has_icon = false;
    for node in anchor.descendants() {
        if let Some(el) = node.value().as_element() {
            match el.name() {
                "img" | "picture" => return LinkType::Image,
                "svg" | "i" => has_icon = true,
                _ => {
                    if el
                        .attr("class")
                        .is_some_and(|c| c.split_whitespace().any(|t| t.contains("icon")))
                    {
                        has_icon = true;
                    }
                }
            }
        }
    }
    if has_icon {
        LinkType::Icon
    } else {
        LinkType::Text
    }
}

fn language_label(anchor: &ElementRef) -> String {
    let text = anchor_label(anchor);
    if !text.is_empty() {
        return text;
    }

    if let Some(hreflang) = anchor.value().attr("hreflang") {
        return hreflang.trim().to_string();
    }

    // Class-derived code, e.g. "lang-en" or a bare "en" token
    if let Some(classes) = anchor.value().attr("class") {
        for token in classes.split_whitespace() {
            if let Some(code) = token.strip_prefix("lang-") {
                if code.len() == 2 {
                    return code.to_string();
                }
            }
        }
    }

    String::new()
}

fn first_list<'a>(container: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    for node in container.descendants() {
        if let Some(el) = ElementRef::wrap(node) {
            if matches!(el.value().name(), "ul" | "ol") {
                return Some(el);
            }
        }
    }
    None
}

/// First anchor in the `<li>` that is not inside a nested list.
fn direct_anchor<'a>(li: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    fn search<'a>(node: NodeRef<'a, Node>) -> Option<ElementRef<'a>> {
        for child in node.children() {
            if let Some(el) = ElementRef::wrap(child) {
                match el.value().name() {
                    "a" => return Some(el),
                    "ul" | "ol" => continue,
                    _ => {
                        if let Some(found) = search(child) {
                            return Some(found);
                        }
                    }
                }
            }
        }
        None
    }
    search(**li)
}

/// First nested list belonging to this `<li>` (sub-menu, dropdown-menu, or
/// any list not owned by a deeper item).
fn direct_submenu<'a>(li: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    fn search<'a>(node: NodeRef<'a, Node>) -> Option<ElementRef<'a>> {
        for child in node.children() {
            if let Some(el) = ElementRef::wrap(child) {
                match el.value().name() {
                    "ul" | "ol" => return Some(el),
                    "li" => continue,
                    _ => {
                        if let Some(found) = search(child) {
                            return Some(found);
                        }
                    }
                }
            }
        }
        None
    }
    search(**li)
}

fn breadcrumb_items(container: &ElementRef, page_url: &Url) -> Vec<BreadcrumbItem> {
    let mut items: Vec<BreadcrumbItem> = Vec::new();

    for node in container.descendants() {
        let Some(el) = ElementRef::wrap(node) else { continue };
        let name = el.value().name();

        let token = match name {
            "a" => el.text().collect::<String>(),
            // Spans that merely wrap an anchor would duplicate its text
            "span" if !contains_anchor(&el) => el.text().collect::<String>(),
            _ => continue,
        };

        let label = token.trim().to_string();
        if label.is_empty()
            || label.chars().count() > 100
            || BREADCRUMB_SEPARATORS.contains(&label.as_str())
        {
            continue;
        }
        if items.last().is_some_and(|prev| prev.label == label) {
            continue;
        }

        let url = if name == "a" {
            el.value()
                .attr("href")
                .and_then(|href| urlnorm::resolve(href, page_url).ok())
        } else {
            None
        };

        items.push(BreadcrumbItem { label, url });
    }

    items
}

fn breadcrumb_text_split(container: &ElementRef) -> Vec<BreadcrumbItem> {
    let text = container.text().collect::<String>();
    text.split(['>', '»', '/', '|', '→', '›'])
        .map(|part| part.trim())
        .filter(|part| !part.is_empty() && part.chars().count() <= 100)
        .map(|part| BreadcrumbItem {
            label: part.to_string(),
            url: None,
        })
        .collect()
}

fn contains_anchor(el: &ElementRef) -> bool {
    el.descendants().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| e.name() == "a")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/post").unwrap()
    }

    fn extract(html: &str) -> NavStructure {
        let document = Html::parse_document(html);
        NavigationExtractor::new().extract(&document, &page(), &[])
    }

    #[test]
    fn primary_nav_requires_three_internal_links() {
        let accepted = r#"<html><body><nav class="main-navigation"><ul>
            <li><a href="/a">A</a></li>
            <li><a href="/b">B</a></li>
            <li><a href="/c">C</a></li>
        </ul></nav></body></html>"#;
        let nav = extract(accepted);
        assert_eq!(nav.primary_nav.len(), 3);

        let rejected = r#"<html><body><nav class="main-navigation"><ul>
            <li><a href="/a">A</a></li>
            <li><a href="/b">B</a></li>
        </ul></nav></body></html>"#;
        let nav = extract(rejected);
        assert!(nav.primary_nav.is_empty());
    }

    #[test]
    fn primary_nav_filters_utility_and_social_links() {
        let html = r#"<html><body><nav class="main-navigation"><ul>
            <li><a href="/a">A</a></li>
            <li><a href="/b">B</a></li>
            <li><a href="tel:+15551234">Call us</a></li>
            <li><a href="https://facebook.com/page">FB</a></li>
        </ul></nav></body></html>"#;
        let nav = extract(html);
        // Only two internal non-utility links remain, below the predicate
        assert!(nav.primary_nav.is_empty());
    }

    #[test]
    fn menu_tree_walk_tracks_depth_order_and_parents() {
        let html = r#"<html><body><nav class="main-navigation"><ul>
            <li><a href="/services">Services</a>
                <ul class="sub-menu">
                    <li><a href="/services/web">Web</a></li>
                    <li><a href="/services/seo">SEO</a></li>
                </ul>
            </li>
            <li><a href="/about">About</a></li>
            <li><a href="/contact">Contact</a></li>
        </ul></nav></body></html>"#;
        let nav = extract(html);

        let services = nav.primary_nav.iter().find(|i| i.label == "Services").unwrap();
        assert_eq!(services.depth, 0);
        assert_eq!(services.order, 0);
        assert!(services.parent_labels.is_none());

        let web = nav.primary_nav.iter().find(|i| i.label == "Web").unwrap();
        assert_eq!(web.depth, 1);
        assert_eq!(web.order, 0);
        assert_eq!(web.parent_labels.as_deref(), Some(&["Services".to_string()][..]));

        let seo = nav.primary_nav.iter().find(|i| i.label == "SEO").unwrap();
        assert_eq!(seo.order, 1);

        // Depth-0 ordering is dense across the cluster
        let about = nav.primary_nav.iter().find(|i| i.label == "About").unwrap();
        assert_eq!(about.order, 1);
        let contact = nav.primary_nav.iter().find(|i| i.label == "Contact").unwrap();
        assert_eq!(contact.order, 2);
    }

    #[test]
    fn hash_href_parent_kept_only_with_submenu() {
        let html = r##"<html><body><nav class="main-navigation"><ul>
            <li><a href="#">Products</a>
                <ul class="dropdown-menu">
                    <li><a href="/p1">P1</a></li>
                    <li><a href="/p2">P2</a></li>
                </ul>
            </li>
            <li><a href="#">Dead toggle</a></li>
            <li><a href="/x">X</a></li>
        </ul></nav></body></html>"##;
        let nav = extract(html);
        assert!(nav.primary_nav.iter().any(|i| i.label == "Products"));
        assert!(!nav.primary_nav.iter().any(|i| i.label == "Dead toggle"));
    }

    #[test]
    fn footer_nav_accepts_two_links() {
        let html = r#"<html><body><footer><nav><ul>
            <li><a href="/privacy">Privacy</a></li>
            <li><a href="/terms">Terms</a></li>
        </ul></nav></footer></body></html>"#;
        let nav = extract(html);
        assert_eq!(nav.footer_nav.len(), 2);
    }

    #[test]
    fn footer_fallback_scans_generic_containers_with_cap() {
        let mut links = String::new();
        for i in 0..30 {
            links.push_str(&format!(r#"<a href="/l{}">L{}</a>"#, i, i));
        }
        let html = format!(
            r#"<html><body><footer><div class="widgets">{}</div></footer></body></html>"#,
            links
        );
        let nav = extract(&html);
        assert_eq!(nav.footer_nav.len(), FOOTER_FALLBACK_CAP);
        assert!(nav.footer_nav.iter().all(|i| !i.is_external));
    }

    #[test]
    fn utility_header_aggregates_and_dedups() {
        let html = r#"<html><body>
            <div class="top-bar">
                <a href="tel:+15551234">Call</a>
                <a href="mailto:hi@example.com">Email</a>
                <a href="/support">Support</a>
            </div>
            <header><a href="tel:+15551234">Call again</a></header>
        </body></html>"#;
        let nav = extract(html);
        let urls: Vec<_> = nav.utility_header.iter().map(|i| i.url.as_str()).collect();
        assert!(urls.contains(&"tel:+15551234"));
        assert!(urls.contains(&"mailto:hi@example.com"));
        // Deduplicated by URL
        assert_eq!(urls.iter().filter(|u| **u == "tel:+15551234").count(), 1);
    }

    #[test]
    fn language_switcher_needs_two_to_ten_short_labels() {
        let html = r#"<html><body><div class="language-switcher">
            <a href="/en/">EN</a>
            <a href="/de/">DE</a>
            <a href="/fr/">FR</a>
        </div></body></html>"#;
        let nav = extract(html);
        assert_eq!(nav.language_switcher.len(), 3);

        let single = r#"<html><body><div class="language-switcher">
            <a href="/en/">EN</a>
        </div></body></html>"#;
        let nav = extract(single);
        assert!(nav.language_switcher.is_empty());
    }

    #[test]
    fn language_label_falls_back_to_hreflang() {
        let html = r#"<html><body><div class="lang-switcher">
            <a href="/en/" hreflang="en"><span class="flag-icon"></span></a>
            <a href="/de/" hreflang="de"><span class="flag-icon"></span></a>
        </div></body></html>"#;
        let nav = extract(html);
        let labels: Vec<_> = nav.language_switcher.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["en", "de"]);
    }

    #[test]
    fn breadcrumb_structured_tokenization() {
        let html = r#"<html><body><nav class="breadcrumbs">
            <a href="/">Home</a> <span>&gt;</span>
            <a href="/blog">Blog</a> <span>&gt;</span>
            <span>Current Post</span>
        </nav></body></html>"#;
        let nav = extract(html);
        let labels: Vec<_> = nav.breadcrumb.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Home", "Blog", "Current Post"]);
        assert_eq!(nav.breadcrumb[0].url.as_deref(), Some("https://example.com/"));
        assert!(nav.breadcrumb[2].url.is_none());
    }

    #[test]
    fn breadcrumb_text_split_fallback() {
        let html = r#"<html><body><div class="breadcrumb">Home > Blog > Deep Post</div></body></html>"#;
        let nav = extract(html);
        let labels: Vec<_> = nav.breadcrumb.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Home", "Blog", "Deep Post"]);
    }

    #[test]
    fn link_types_detect_images_and_icons() {
        let html = r#"<html><body><nav class="main-navigation"><ul>
            <li><a href="/a"><img src="/logo.png" alt="Logo"></a></li>
            <li><a href="/b"><i class="fa fa-star"></i></a></li>
            <li><a href="/c">Plain</a></li>
        </ul></nav></body></html>"#;
        let nav = extract(html);
        let by_label = |label: &str| {
            nav.primary_nav
                .iter()
                .find(|i| i.label == label)
                .map(|i| i.link_type)
        };
        assert_eq!(by_label("Logo"), Some(LinkType::Image));
        assert_eq!(by_label("Plain"), Some(LinkType::Text));
        assert!(nav.primary_nav.iter().any(|i| i.link_type == LinkType::Icon));
    }

    #[test]
    fn external_links_are_flagged() {
        let html = r#"<html><body><nav class="main-navigation"><ul>
            <li><a href="/in">In</a></li>
            <li><a href="/in2">In2</a></li>
            <li><a href="/in3">In3</a></li>
            <li><a href="https://other.org/out">Out</a></li>
        </ul></nav></body></html>"#;
        let nav = extract(html);
        let out = nav.primary_nav.iter().find(|i| i.label == "Out").unwrap();
        assert!(out.is_external);
        let inn = nav.primary_nav.iter().find(|i| i.label == "In").unwrap();
        assert!(!inn.is_external);
    }

    #[test]
    fn www_host_counts_as_internal() {
        let html = r#"<html><body><nav class="main-navigation"><ul>
            <li><a href="https://www.example.com/a">A</a></li>
            <li><a href="https://www.example.com/b">B</a></li>
            <li><a href="https://www.example.com/c">C</a></li>
        </ul></nav></body></html>"#;
        let nav = extract(html);
        assert_eq!(nav.primary_nav.len(), 3);
        assert!(nav.primary_nav.iter().all(|i| !i.is_external));
    }

    #[test]
    fn fingerprint_is_order_insensitive_and_16_chars() {
        let item = |url: &str, external: bool| NavItem {
            url: url.to_string(),
            label: "x".to_string(),
            depth: 0,
            order: 0,
            parent_labels: None,
            is_external: external,
            link_type: LinkType::Text,
        };

        let a = vec![
            item("https://example.com/a", false),
            item("https://example.com/b", false),
            item("https://other.org/c", true),
        ];
        let b = vec![
            item("https://example.com/b", false),
            item("https://other.org/d", true),
            item("https://example.com/a", false),
        ];

        let fa = nav_fingerprint(&a);
        let fb = nav_fingerprint(&b);
        assert_eq!(fa.len(), 16);
        // External URLs don't participate, so the two fingerprints match
        assert_eq!(fa, fb);
    }

    #[test]
    fn menu_depth_is_capped_at_three() {
        let html = r#"<html><body><nav class="main-navigation"><ul>
            <li><a href="/l0">L0</a>
              <ul><li><a href="/l1">L1</a>
                <ul><li><a href="/l2">L2</a>
                  <ul><li><a href="/l3">L3</a>
                    <ul><li><a href="/l4">L4</a></li></ul>
                  </li></ul>
                </li></ul>
              </li></ul>
            </li>
            <li><a href="/x">X</a></li>
            <li><a href="/y">Y</a></li>
        </ul></nav></body></html>"#;
        let nav = extract(html);

        assert!(nav.primary_nav.iter().all(|i| i.depth <= 3));
        assert!(nav.primary_nav.iter().any(|i| i.label == "L3"));
        assert!(!nav.primary_nav.iter().any(|i| i.label == "L4"));

        let l3 = nav.primary_nav.iter().find(|i| i.label == "L3").unwrap();
        assert_eq!(
            l3.parent_labels.as_deref(),
            Some(&["L0".to_string(), "L1".to_string(), "L2".to_string()][..])
        );
    }

    #[test]
    fn order_is_dense_per_depth_across_parents() {
        let html = r#"<html><body><nav class="main-navigation"><ul>
            <li><a href="/a">A</a>
              <ul><li><a href="/a1">A1</a></li><li><a href="/a2">A2</a></li></ul>
            </li>
            <li><a href="/b">B</a>
              <ul><li><a href="/b1">B1</a></li></ul>
            </li>
            <li><a href="/c">C</a></li>
        </ul></nav></body></html>"#;
        let nav = extract(html);

        let order_of = |label: &str| nav.primary_nav.iter().find(|i| i.label == label).unwrap().order;
        // Depth-1 ordering continues across sibling submenus
        assert_eq!(order_of("A1"), 0);
        assert_eq!(order_of("A2"), 1);
        assert_eq!(order_of("B1"), 2);
        // Depth-0 ordering is independent
        assert_eq!(order_of("A"), 0);
        assert_eq!(order_of("B"), 1);
        assert_eq!(order_of("C"), 2);
    }

    #[test]
    fn breadcrumb_skips_nested_duplicate_labels() {
        let html = r#"<html><body><nav class="breadcrumb">
            <span><a href="/">Home</a></span>
            <span>Library</span>
            <span>Library</span>
            <span>Current</span>
        </nav></body></html>"#;
        let nav = extract(html);
        let labels: Vec<_> = nav.breadcrumb.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Home", "Library", "Current"]);
    }

    #[test]
    fn breadcrumb_drops_overlong_tokens() {
        let long = "x".repeat(150);
        let html = format!(
            r#"<html><body><div class="breadcrumbs">
                <a href="/">Home</a><span>{}</span><span>Post</span>
            </div></body></html>"#,
            long
        );
        let nav = extract(&html);
        assert!(nav.breadcrumb.iter().all(|b| b.label.chars().count() <= 100));
    }

    #[test]
    fn cluster_count_reflects_nonempty_clusters() {
        let html = r#"<html><body>
            <nav class="main-navigation"><ul>
                <li><a href="/a">A</a></li>
                <li><a href="/b">B</a></li>
                <li><a href="/c">C</a></li>
            </ul></nav>
            <div class="breadcrumb">Home > Post</div>
        </body></html>"#;
        let nav = extract(html);
        assert_eq!(nav.extraction_meta.cluster_count, 2);
        assert!(!nav.extraction_meta.has_mega_menu);
        assert!(nav
            .extraction_meta
            .selectors_matched
            .iter()
            .any(|s| s.starts_with("primary:")));
    }
}
