//! Structure-preserving Markdown builder
//!
//! One DOM pass produces a marked Markdown document with
//! `<!-- STRUCT:TYPE:ROLE -->` sentinels around detected structural
//! regions; the plain Markdown is derived from it by stripping the
//! markers and collapsing blank runs, so the two stay in lockstep.
//!
//! Conversion rules: ATX headings with hierarchy normalization, inlined
//! absolute links, base64 image placeholders, suppression of link-only
//! lists, boilerplate line removal, and H1 hoisting from page metadata.

use std::collections::{HashMap, HashSet};

use ego_tree::{NodeId, NodeRef};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::structure::{StructuralDetail, StructuralElement};

/// Regex that strips structural markers from the enhanced Markdown.
pub const MARKER_STRIP_PATTERN: &str = r"<!-- STRUCT:[A-Z_]+:[A-Z_]+ -->";

/// Minimum fraction of list items that must be bare links for the list to
/// be dropped as navigation, expressed as links/items >= 4/5.
const NAV_LIST_NUMERATOR: usize = 4;
const NAV_LIST_DENOMINATOR: usize = 5;

/// Minimum run of base64 payload characters that triggers sanitization.
const BASE64_MIN_CHARS: usize = 50;

/// Both Markdown products for a page
#[derive(Debug, Clone)]
pub struct MarkdownOutput {
    /// Markdown with structural markers embedded
    pub enhanced: String,
    /// Markdown with all markers stripped
    pub plain: String,
    /// SEO findings surfaced during conversion (e.g. misplaced H1)
    pub seo_issues: Vec<String>,
}

/// HTML to Markdown converter
pub struct MarkdownBuilder {
    marker_strip: Regex,
    blank_runs: Regex,
    boilerplate: Vec<Regex>,
}

impl MarkdownBuilder {
    pub fn new() -> Self {
        let boilerplate = [
            r"^Home\s*[>»/›].*",
            r"(?i)^posted on .+ by .+",
            r"(?i)^(©|\(c\)\s|copyright\b).*",
            r"(?i)^last updated\b.*",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

        Self {
            marker_strip: Regex::new(MARKER_STRIP_PATTERN).expect("marker pattern is valid"),
            blank_runs: Regex::new(r"\n{3,}").expect("blank-run pattern is valid"),
            boilerplate,
        }
    }

    /// Convert a document to marked and plain Markdown.
    ///
    /// `document` must be the parse the structural `elements` were
    /// detected on; markers anchor to their nodes. `h1` is the page
    /// metadata H1 hoisted to the top of the document.
    pub fn build(
        &self,
        document: &Html,
        elements: &[StructuralElement],
        page_url: &Url,
        h1: Option<&str>,
    ) -> MarkdownOutput {
        let markers: HashMap<NodeId, &StructuralElement> = elements
            .iter()
            .filter_map(|e| e.node.map(|id| (id, e)))
            .collect();

        let mut renderer = Renderer {
            out: String::new(),
            base: page_url,
            markers,
            struct_depth: 0,
            pending_questions: HashSet::new(),
            in_pre: false,
        };

        if let Some(body) = Selector::parse("body")
            .ok()
            .and_then(|sel| document.select(&sel).next())
        {
            for child in body.children() {
                renderer.render_node(child);
            }
        }

        let mut seo_issues = Vec::new();

        let mut enhanced = renderer.out;
        enhanced = trim_line_ends(&enhanced);
        enhanced = normalize_heading_hierarchy(&enhanced);
        enhanced = self.strip_boilerplate(&enhanced);
        if let Some(h1) = h1 {
            enhanced = hoist_h1(enhanced, h1, &mut seo_issues);
        }
        enhanced = self.collapse_blanks(&enhanced);

        let plain = self.strip_markers(&enhanced);

        MarkdownOutput {
            enhanced,
            plain,
            seo_issues,
        }
    }

    /// Strip all structural markers and collapse the blank runs they leave.
    pub fn strip_markers(&self, enhanced: &str) -> String {
        let stripped = self.marker_strip.replace_all(enhanced, "");
        self.collapse_blanks(&stripped)
    }

    fn collapse_blanks(&self, text: &str) -> String {
        let trimmed = trim_line_ends(text);
        let collapsed = self.blank_runs.replace_all(&trimmed, "\n\n");
        collapsed.trim().to_string()
    }

    fn strip_boilerplate(&self, text: &str) -> String {
        let mut lines: Vec<&str> = Vec::new();
        let mut prev_content: Option<&str> = None;

        for line in text.lines() {
            let trimmed = line.trim();

            // Markers are never boilerplate and never deduplicated
            if self.marker_strip.is_match(trimmed) {
                lines.push(line);
                continue;
            }

            if !trimmed.is_empty() && self.boilerplate.iter().any(|re| re.is_match(trimmed)) {
                continue;
            }

            // Collapse consecutive duplicate non-empty lines
            if !trimmed.is_empty() && prev_content == Some(trimmed) {
                continue;
            }
            if !trimmed.is_empty() {
                prev_content = Some(trimmed);
            }

            lines.push(line);
        }

        lines.join("\n")
    }
}

impl Default for MarkdownBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Renderer<'a> {
    out: String,
    base: &'a Url,
    markers: HashMap<NodeId, &'a StructuralElement>,
    /// Depth of structural regions currently open
    struct_depth: usize,
    /// Questions of the innermost selector-detected FAQ region, consumed
    /// as their elements are rendered
    pending_questions: HashSet<String>,
    in_pre: bool,
}

impl Renderer<'_> {
    fn render_node(&mut self, node: NodeRef<'_, Node>) {
        match node.value() {
            Node::Text(text) => self.push_text(text),
            Node::Element(_) => self.render_element(node),
            _ => {}
        }
    }

    fn render_children(&mut self, node: NodeRef<'_, Node>) {
        for child in node.children() {
            self.render_node(child);
        }
    }

    fn render_element(&mut self, node: NodeRef<'_, Node>) {
        let Some(element) = node.value().as_element() else {
            return;
        };
        let name = element.name().to_string();

        if let Some(marker) = self.markers.get(&node.id()).copied() {
            self.render_marked_region(node, marker);
            return;
        }

        // Selector-FAQ question elements get Q/A markers around them
        if self.struct_depth > 0 && !self.pending_questions.is_empty() {
            if let Some(el) = ElementRef::wrap(node) {
                let text = collapse_ws(&el.text().collect::<String>());
                if self.pending_questions.remove(&text) {
                    self.block_break();
                    self.out.push_str("<!-- STRUCT:FAQ:Q -->");
                    self.block_break();
                    self.out.push_str("**");
                    self.out.push_str(&text);
                    self.out.push_str("**");
                    self.block_break();
                    self.out.push_str("<!-- STRUCT:FAQ:A -->");
                    self.block_break();
                    return;
                }
            }
        }

        match name.as_str() {
            "script" | "style" | "noscript" | "iframe" | "template" => {}
            "nav" | "header" | "footer" | "aside" => {
                // Chrome containers only surface when they hold a marked
                // region (e.g. a breadcrumb inside a nav)
                if self.subtree_has_marker(node) {
                    self.render_children(node);
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name.as_bytes()[1] - b'0';
                self.block_break();
                for _ in 0..level {
                    self.out.push('#');
                }
                self.out.push(' ');
                self.render_children(node);
                self.block_break();
            }
            "p" => {
                self.block_break();
                self.render_children(node);
                self.block_break();
            }
            "br" => self.out.push('\n'),
            "hr" => {
                self.block_break();
                self.out.push_str("---");
                self.block_break();
            }
            "ul" => self.render_list(node, false, 0),
            "ol" => self.render_list(node, true, 0),
            "a" => self.render_link(node),
            "img" => self.render_image(node),
            "strong" | "b" => self.render_wrapped(node, "**"),
            "em" | "i" => self.render_wrapped(node, "*"),
            "code" => {
                if self.in_pre {
                    self.render_children(node);
                } else {
                    self.render_wrapped(node, "`");
                }
            }
            "pre" => {
                self.block_break();
                self.out.push_str("```\n");
                self.in_pre = true;
                self.render_children(node);
                self.in_pre = false;
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.out.push_str("```");
                self.block_break();
            }
            "blockquote" => {
                let inner = self.render_to_string(node);
                self.block_break();
                for line in inner.trim().lines() {
                    self.out.push_str("> ");
                    self.out.push_str(line);
                    self.out.push('\n');
                }
                self.block_break();
            }
            "tr" => {
                let cells: Vec<String> = node
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| matches!(el.value().name(), "td" | "th"))
                    .map(|el| collapse_ws(&el.text().collect::<String>()))
                    .collect();
                if !cells.is_empty() {
                    self.newline();
                    self.out.push_str(&cells.join(" | "));
                    self.newline();
                }
            }
            "td" | "th" => {} // handled by tr
            "dt" => {
                let term = self.render_to_string(node);
                let term = term.trim();
                if !term.is_empty() {
                    self.block_break();
                    self.out.push_str("**");
                    self.out.push_str(term);
                    self.out.push_str("**");
                    self.block_break();
                }
            }
            "div" | "section" | "article" | "main" | "figure" | "figcaption" | "details"
            | "summary" | "dl" | "dd" => {
                self.block_break();
                self.render_children(node);
                self.block_break();
            }
            _ => self.render_children(node),
        }
    }

    fn render_marked_region(&mut self, node: NodeRef<'_, Node>, marker: &StructuralElement) {
        let tag = marker.kind().marker_tag();

        self.block_break();
        self.out.push_str(&format!("<!-- STRUCT:{}:START -->", tag));
        self.block_break();

        match &marker.detail {
            StructuralDetail::Faq {
                has_schema: true,
                entries,
            } => {
                // The region is a JSON-LD script: emit its Q/A pairs
                // instead of rendering the raw JSON
                for entry in entries {
                    self.out.push_str("<!-- STRUCT:FAQ:Q -->");
                    self.block_break();
                    self.out.push_str("**");
                    self.out.push_str(&entry.question);
                    self.out.push_str("**");
                    self.block_break();
                    self.out.push_str("<!-- STRUCT:FAQ:A -->");
                    self.block_break();
                    if let Some(answer) = &entry.answer {
                        self.out.push_str(answer);
                        self.block_break();
                    }
                }
            }
            StructuralDetail::Faq {
                has_schema: false,
                entries,
            } => {
                let saved: HashSet<String> = std::mem::take(&mut self.pending_questions);
                self.pending_questions = entries
                    .iter()
                    .map(|e| collapse_ws(&e.question))
                    .collect();
                self.struct_depth += 1;
                self.render_children(node);
                self.struct_depth -= 1;
                self.pending_questions = saved;
            }
            _ => {
                self.struct_depth += 1;
                self.render_children(node);
                self.struct_depth -= 1;
            }
        }

        self.block_break();
        self.out.push_str(&format!("<!-- STRUCT:{}:END -->", tag));
        self.block_break();
    }

    fn render_list(&mut self, node: NodeRef<'_, Node>, ordered: bool, depth: usize) {
        let items: Vec<NodeRef<'_, Node>> = node
            .children()
            .filter(|child| {
                child
                    .value()
                    .as_element()
                    .is_some_and(|el| el.name() == "li")
            })
            .collect();

        if items.is_empty() {
            return;
        }

        // Link-only lists are navigation, not content. Lists inside a
        // marked structural region (a TOC, a FAQ) keep their content.
        if self.struct_depth == 0 && is_nav_list(&items) {
            return;
        }

        let mut index = 1usize;
        for li in &items {
            self.newline();
            self.out.push_str(&"  ".repeat(depth));
            if ordered {
                self.out.push_str(&format!("{}. ", index));
                index += 1;
            } else {
                self.out.push_str("- ");
            }

            for child in li.children() {
                if let Some(el) = child.value().as_element() {
                    if matches!(el.name(), "ul" | "ol") {
                        self.render_list(child, el.name() == "ol", depth + 1);
                        continue;
                    }
                }
                self.render_node(child);
            }
        }
        self.block_break();
    }

    fn render_link(&mut self, node: NodeRef<'_, Node>) {
        let Some(element) = node.value().as_element() else { return };
        let Some(href) = element.attr("href") else {
            self.render_children(node);
            return;
        };

        let label = self.render_to_string(node);
        let label = label.trim();

        // Empty text with no image child: drop entirely
        if label.is_empty() {
            return;
        }

        let resolved = self
            .base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string());

        self.ensure_inline_space();
        self.out.push('[');
        self.out.push_str(label);
        self.out.push_str("](");
        self.out.push_str(&resolved);
        self.out.push(')');
    }

    fn render_image(&mut self, node: NodeRef<'_, Node>) {
        let Some(element) = node.value().as_element() else { return };
        let Some(src) = element.attr("src") else { return };
        let alt = element.attr("alt").unwrap_or("");

        let sanitized = sanitize_image_src(src, self.base);

        self.ensure_inline_space();
        self.out.push_str("![");
        self.out.push_str(alt.trim());
        self.out.push_str("](");
        self.out.push_str(&sanitized);
        self.out.push(')');
    }

    fn render_wrapped(&mut self, node: NodeRef<'_, Node>, delimiter: &str) {
        let inner = self.render_to_string(node);
        let inner = inner.trim();
        if inner.is_empty() {
            return;
        }
        self.ensure_inline_space();
        self.out.push_str(delimiter);
        self.out.push_str(inner);
        self.out.push_str(delimiter);
    }

    /// Render a node's children into a detached buffer.
    fn render_to_string(&mut self, node: NodeRef<'_, Node>) -> String {
        let saved = std::mem::take(&mut self.out);
        self.render_children(node);
        std::mem::replace(&mut self.out, saved)
    }

    fn push_text(&mut self, raw: &str) {
        if self.in_pre {
            self.out.push_str(raw);
            return;
        }

        let collapsed = collapse_ws(raw);
        if collapsed.is_empty() {
            return;
        }

        if raw.starts_with(char::is_whitespace) {
            self.ensure_inline_space();
        }
        self.out.push_str(&collapsed);
        if raw.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn ensure_inline_space(&mut self) {
        if let Some(last) = self.out.chars().last() {
            if !last.is_whitespace() && last != '(' && last != '[' {
                self.out.push(' ');
            }
        }
    }

    fn newline(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Ensure the output ends with a paragraph break (unless empty).
    fn block_break(&mut self) {
        if self.out.is_empty() {
            return;
        }
        while self.out.ends_with(' ') {
            self.out.pop();
        }
        if self.out.ends_with("\n\n") {
            return;
        }
        if self.out.ends_with('\n') {
            self.out.push('\n');
        } else {
            self.out.push_str("\n\n");
        }
    }

    fn subtree_has_marker(&self, node: NodeRef<'_, Node>) -> bool {
        node.descendants().any(|n| self.markers.contains_key(&n.id()))
    }
}

/// Whether at least 4/5 of the list items are bare links.
fn is_nav_list(items: &[NodeRef<'_, Node>]) -> bool {
    let link_items = items
        .iter()
        .filter(|li| {
            let Some(li_el) = ElementRef::wrap(**li) else {
                return false;
            };
            let li_text = collapse_ws(&li_el.text().collect::<String>());
            if li_text.is_empty() {
                return false;
            }
            let Ok(anchor_sel) = Selector::parse("a") else {
                return false;
            };
            li_el
                .select(&anchor_sel)
                .next()
                .map(|a| collapse_ws(&a.text().collect::<String>()) == li_text)
                .unwrap_or(false)
        })
        .count();

    link_items * NAV_LIST_DENOMINATOR >= items.len() * NAV_LIST_NUMERATOR
}

/// Replace long base64 payloads with a truncated placeholder; resolve
/// everything else absolute.
fn sanitize_image_src(src: &str, base: &Url) -> String {
    if let Some(idx) = src.find(";base64,") {
        let payload = &src[idx + ";base64,".len()..];
        if payload.len() >= BASE64_MIN_CHARS {
            return format!("{};base64,...", &src[..idx]);
        }
    }
    if src.starts_with("data:") {
        return src.to_string();
    }
    base.join(src).map(|u| u.to_string()).unwrap_or_else(|_| src.to_string())
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_line_ends(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clamp heading jumps: no heading may sit more than one level below the
/// previous one, and none may exceed h6.
fn normalize_heading_hierarchy(text: &str) -> String {
    let mut out_lines: Vec<String> = Vec::new();
    let mut prev_level: Option<u8> = None;
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out_lines.push(line.to_string());
            continue;
        }
        if in_fence {
            out_lines.push(line.to_string());
            continue;
        }

        let hashes = line.bytes().take_while(|b| *b == b'#').count() as u8;
        let is_heading = hashes > 0 && line.as_bytes().get(hashes as usize) == Some(&b' ');

        if !is_heading {
            out_lines.push(line.to_string());
            continue;
        }

        let max_allowed = prev_level.map(|p| p + 1).unwrap_or(hashes).min(6);
        let level = hashes.min(max_allowed);
        prev_level = Some(level);

        let rest = &line[hashes as usize..];
        out_lines.push(format!("{}{}", "#".repeat(level as usize), rest));
    }

    out_lines.join("\n")
}

/// Place the metadata H1 at the top of the document.
fn hoist_h1(markdown: String, h1: &str, seo_issues: &mut Vec<String>) -> String {
    let h1 = h1.trim();
    if h1.is_empty() {
        return markdown;
    }

    let lines: Vec<&str> = markdown.lines().collect();
    let first_content = lines.iter().position(|l| !l.trim().is_empty());
    let first_h1 = lines.iter().position(|l| is_h1_line(l));

    if let Some(h1_idx) = first_h1 {
        let existing = lines[h1_idx].trim_start_matches('#').trim();
        if h1_idx != first_content.unwrap_or(0) {
            seo_issues.push(format!(
                "h1 \"{}\" is not the first element of the document",
                existing
            ));
        }
        if existing == h1 && Some(h1_idx) == first_content {
            return markdown;
        }
    }

    let body = lines
        .into_iter()
        .filter(|l| !is_h1_line(l))
        .collect::<Vec<_>>()
        .join("\n");

    format!("# {}\n\n{}", h1, body)
}

fn is_h1_line(line: &str) -> bool {
    line.starts_with("# ")
}
