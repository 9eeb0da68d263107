//! Structural element types
//!
//! Detected regions are a tagged-variant type: every kind carries its own
//! metadata record rather than a flat string tag.

use ego_tree::NodeId;
use serde::{Deserialize, Serialize};

/// Kinds of structural regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralKind {
    FaqModule,
    TocOrJump,
    Breadcrumb,
    TemplateCta,
    Accordion,
    Testimonial,
    AuthorBio,
    RelatedPosts,
}

impl StructuralKind {
    /// The `TYPE` token used in Markdown markers.
    pub fn marker_tag(&self) -> &'static str {
        match self {
            Self::FaqModule => "FAQ",
            Self::TocOrJump => "TOC",
            Self::Breadcrumb => "BREADCRUMB",
            Self::TemplateCta => "CTA",
            Self::Accordion => "ACCORDION",
            Self::Testimonial => "TESTIMONIAL",
            Self::AuthorBio => "AUTHOR",
            Self::RelatedPosts => "RELATED",
        }
    }
}

/// A question/answer pair harvested from a FAQ region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: Option<String>,
}

/// Per-kind metadata for a detected region
#[derive(Debug, Clone)]
pub enum StructuralDetail {
    Faq {
        /// Whether the region came from a JSON-LD `FAQPage` block
        has_schema: bool,
        entries: Vec<FaqEntry>,
    },
    Toc {
        total_links: usize,
        anchor_links: usize,
    },
    Breadcrumb,
    TemplateCta,
    Accordion,
    Testimonial,
    AuthorBio,
    RelatedPosts,
}

impl StructuralDetail {
    pub fn kind(&self) -> StructuralKind {
        match self {
            Self::Faq { .. } => StructuralKind::FaqModule,
            Self::Toc { .. } => StructuralKind::TocOrJump,
            Self::Breadcrumb => StructuralKind::Breadcrumb,
            Self::TemplateCta => StructuralKind::TemplateCta,
            Self::Accordion => StructuralKind::Accordion,
            Self::Testimonial => StructuralKind::Testimonial,
            Self::AuthorBio => StructuralKind::AuthorBio,
            Self::RelatedPosts => StructuralKind::RelatedPosts,
        }
    }
}

/// A contiguous HTML region classified as a structural element.
///
/// `start`/`end` are byte offsets into the raw HTML string the detector
/// ran over.
#[derive(Debug, Clone)]
pub struct StructuralElement {
    pub start: usize,
    pub end: usize,
    /// Selector that matched the region
    pub selector: String,
    pub detail: StructuralDetail,
    /// Handle into the parse that produced this element, used by the
    /// Markdown builder to anchor markers without re-locating offsets
    pub(crate) node: Option<NodeId>,
}

impl StructuralElement {
    pub fn kind(&self) -> StructuralKind {
        self.detail.kind()
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn overlaps(&self, other: &StructuralElement) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Aggregate counts per structural type, persisted as JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralStats {
    pub faq_modules: u32,
    pub toc_sections: u32,
    pub breadcrumbs: u32,
    pub template_ctas: u32,
    pub accordions: u32,
    pub testimonials: u32,
    pub author_bios: u32,
    pub related_posts: u32,
}

impl StructuralStats {
    pub fn from_elements(elements: &[StructuralElement]) -> Self {
        let mut stats = Self::default();
        for element in elements {
            match element.kind() {
                StructuralKind::FaqModule => stats.faq_modules += 1,
                StructuralKind::TocOrJump => stats.toc_sections += 1,
                StructuralKind::Breadcrumb => stats.breadcrumbs += 1,
                StructuralKind::TemplateCta => stats.template_ctas += 1,
                StructuralKind::Accordion => stats.accordions += 1,
                StructuralKind::Testimonial => stats.testimonials += 1,
                StructuralKind::AuthorBio => stats.author_bios += 1,
                StructuralKind::RelatedPosts => stats.related_posts += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> u32 {
        self.faq_modules
            + self.toc_sections
            + self.breadcrumbs
            + self.template_ctas
            + self.accordions
            + self.testimonials
            + self.author_bios
            + self.related_posts
    }
}
