/*!
 * Document layout extraction.
 *
 * This module provides:
 * - The page/line/word layout model
 * - Spatial clustering of positioned tokens into lines
 * - A PDF backend and a plain-text fallback
 * - The enrichment boundary applied before playback
 */

pub mod backend;
pub mod enrichment;
pub mod extractor;
pub mod model;
pub mod pdf;

// Re-export main types
pub use backend::{RawBlock, RawPage, RawToken, StructuredBackend};
pub use enrichment::{DocumentEnrichment, LineEnrichment, WordEnrichment};
pub use extractor::{LayoutExtractor, cluster_tokens, plain_text_layout, y_bucket};
pub use model::{BBox, DocumentLayout, Line, Page, Word};
pub use pdf::PdfBackend;
