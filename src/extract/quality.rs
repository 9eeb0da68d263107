//! Content hashing and soft-404 heuristics

/// Pages with fewer words than this are eligible for soft-404
/// classification.
pub const SOFT404_MAX_WORDS: usize = 150;

/// Phrases that indicate a 404 page served with a 200 status.
const SOFT404_PHRASES: &[&str] = &[
    "page not found",
    "404 not found",
    "error 404",
    "page doesn't exist",
    "page does not exist",
    "page cannot be found",
    "page you requested could not be found",
    "nothing was found",
    "no longer available",
];

/// Collapse all whitespace runs to single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// MD5 hash of whitespace-normalized clean HTML.
///
/// Returns `None` iff no content was extracted, so the stored hash is
/// null exactly when the content fields are.
pub fn content_hash(clean_html: &str) -> Option<String> {
    if clean_html.trim().is_empty() {
        return None;
    }
    let normalized = normalize_whitespace(clean_html);
    Some(format!("{:x}", md5::compute(normalized.as_bytes())))
}

/// Soft-404 post-check: an OK response whose title or body carries a
/// known 404 phrase and whose body is short.
pub fn looks_like_soft404(title: Option<&str>, body_text: &str, word_count: usize) -> bool {
    if word_count >= SOFT404_MAX_WORDS {
        return false;
    }

    let title_lower = title.map(|t| t.to_lowercase()).unwrap_or_default();
    let body_lower = body_text.to_lowercase();

    SOFT404_PHRASES
        .iter()
        .any(|phrase| title_lower.contains(phrase) || body_lower.contains(phrase))
}
