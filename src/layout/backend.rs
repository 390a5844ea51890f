/*!
 * Structured-document backend seam.
 *
 * A backend turns document bytes into raw pages of positioned tokens (or
 * block-level text regions when no token detail is available). Clustering
 * the tokens into lines is the extractor's job, not the backend's.
 */

use std::fmt::Debug;

use crate::errors::LayoutError;
use crate::layout::model::BBox;

/// A positioned word token as reported by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub text: String,
    pub bbox: BBox,
}

impl RawToken {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// A block-level text region, possibly spanning several lines
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub text: String,
    pub bbox: BBox,
}

/// One page as reported by the backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    pub width: f32,
    pub height: f32,
    /// Word-level tokens; empty when the page has no positioned text
    pub tokens: Vec<RawToken>,
    /// Block-level regions used when `tokens` is empty
    pub blocks: Vec<RawBlock>,
}

/// Common trait for structured-document backends
pub trait StructuredBackend: Send + Sync + Debug {
    /// Whether the bytes carry a signature this backend understands
    fn recognizes(&self, bytes: &[u8]) -> bool;

    /// Parse the document into raw pages
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawPage>, LayoutError>;
}
