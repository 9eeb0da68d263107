//! Content extraction types

use serde::{Deserialize, Serialize};

/// Strategy that produced the stored clean HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Readability,
    Semantic,
    CmsPattern,
    DomainOverride,
    Fallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Readability => "readability",
            Self::Semantic => "semantic",
            Self::CmsPattern => "cms_pattern",
            Self::DomainOverride => "domain_override",
            Self::Fallback => "fallback",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "readability" => Some(Self::Readability),
            "semantic" => Some(Self::Semantic),
            "cms_pattern" => Some(Self::CmsPattern),
            "domain_override" => Some(Self::DomainOverride),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

/// Extracted main content of a page
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Main-region HTML after extraction
    pub clean_html: String,
    /// Whitespace-split token count of the text body
    pub word_count: usize,
    /// Strategy that produced the content
    pub method: ExtractionMethod,
    /// Ratio of link text to total text, clamped to [0, 1]
    pub junk_score: f64,
}

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Minimum word count for a strategy to succeed
    pub min_word_count: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self { min_word_count: 100 }
    }
}
