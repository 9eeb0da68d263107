//! Navigation structure types, persisted as JSON on the page record

use serde::{Deserialize, Serialize};

/// Presentation of a navigation link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Text,
    Image,
    Icon,
}

/// A link in a navigation cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavItem {
    pub url: String,
    pub label: String,
    /// Menu nesting depth, 0..=3
    pub depth: u8,
    /// Dense zero-based position within the cluster at this depth
    pub order: u32,
    /// Labels of ancestor menu items, present for nested items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_labels: Option<Vec<String>>,
    pub is_external: bool,
    pub link_type: LinkType,
}

/// One step of a breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbItem {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Structural context a content link appears in, used downstream for
/// weighting internal-link signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSourceType {
    ContextualBody,
    FaqModule,
    TocOrJump,
    Breadcrumb,
    PrimaryNav,
    Footer,
    TemplateCta,
    RepeatedBlock,
    RelatedPosts,
    AuthorBio,
    Testimonial,
}

/// A link found inside the main content region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentLink {
    pub url: String,
    pub label: String,
    pub source_type: LinkSourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_heading: Option<String>,
    /// Position of the link within the body, 0..=100
    pub body_position_pct: u8,
    pub is_external: bool,
}

/// Bookkeeping about the extraction itself
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionMeta {
    pub selectors_matched: Vec<String>,
    pub cluster_count: usize,
    pub has_mega_menu: bool,
    pub extraction_time_ms: u64,
}

/// All navigation clusters and content links for a page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavStructure {
    pub primary_nav: Vec<NavItem>,
    pub footer_nav: Vec<NavItem>,
    pub utility_header: Vec<NavItem>,
    pub language_switcher: Vec<NavItem>,
    pub breadcrumb: Vec<BreadcrumbItem>,
    pub content_links: Vec<ContentLink>,
    pub extraction_meta: ExtractionMeta,
}
