//! Page metadata extraction
//!
//! Fixed-priority chains over the parsed document: title from `<title>`,
//! OpenGraph, or the first heading; description, canonical, social image,
//! and document language.

use scraper::{Html, Selector};
use url::Url;

/// Maximum stored length for the H1 text.
const H1_MAX_CHARS: usize = 500;

/// Metadata extracted from a page head and headings
#[derive(Debug, Clone, Default)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub h1: Option<String>,
    pub meta_description: Option<String>,
    pub canonical: Option<String>,
    pub og_image: Option<String>,
    pub language: Option<String>,
    pub has_multiple_h1: bool,
}

/// Extract metadata from a parsed document.
pub fn extract_metadata(document: &Html, base: &Url) -> PageMetadata {
    let h1_texts = collect_h1(document);
    let first_h1 = h1_texts.first().cloned();

    let title = select_text(document, "title")
        .or_else(|| meta_content(document, "og:title"))
        .or_else(|| first_h1.clone());

    let h1 = first_h1.map(|text| truncate_chars(&text, H1_MAX_CHARS));

    let meta_description = meta_content(document, "description")
        .or_else(|| meta_content(document, "og:description"));

    let canonical = select_attr(document, "link[rel='canonical']", "href")
        .and_then(|href| absolute(&href, base));

    let og_image = meta_content(document, "og:image").and_then(|src| absolute(&src, base));

    let language = select_attr(document, "html", "lang")
        .or_else(|| select_attr(document, "meta[http-equiv='content-language']", "content"))
        .map(|lang| lang.chars().take(2).collect::<String>().to_lowercase())
        .filter(|lang| !lang.is_empty());

    PageMetadata {
        title,
        h1,
        meta_description,
        canonical,
        og_image,
        language,
        has_multiple_h1: h1_texts.len() > 1,
    }
}

fn collect_h1(document: &Html) -> Vec<String> {
    let mut texts = Vec::new();
    if let Ok(sel) = Selector::parse("h1") {
        for el in document.select(&sel) {
            let text = el.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                texts.push(text);
            }
        }
    }
    texts
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = document.select(&sel).next()?;
    let text = el.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = document.select(&sel).next()?;
    let value = el.value().attr(attr)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Get meta content by name or property.
pub fn meta_content(document: &Html, name: &str) -> Option<String> {
    select_attr(document, &format!("meta[name='{}']", name), "content")
        .or_else(|| select_attr(document, &format!("meta[property='{}']", name), "content"))
}

fn absolute(reference: &str, base: &Url) -> Option<String> {
    base.join(reference).ok().map(|u| u.to_string())
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
