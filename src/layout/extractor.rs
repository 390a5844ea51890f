/*!
 * Layout extraction.
 *
 * Turns raw document bytes into ordered pages and lines. Extraction is a
 * total function: anything the structured backend cannot handle degrades to
 * a plain-text split, so ingestion never fails.
 */

use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, info, warn};

use crate::errors::LayoutError;
use crate::layout::backend::{RawPage, RawToken, StructuredBackend};
use crate::layout::model::{DocumentLayout, Line, Page, Word};
use crate::layout::pdf::PdfBackend;

/// Vertical distance (in bucket units) beyond which a token starts a new line
pub const LINE_BREAK_TOLERANCE: f32 = 1.5;

/// Quantize a y coordinate into 2-unit buckets so baseline jitter sorts together
pub fn y_bucket(y: f32) -> f32 {
    (y / 2.0).round_ties_even() * 2.0
}

/// Layout extractor with an optional structured-document backend
#[derive(Debug)]
pub struct LayoutExtractor {
    backend: Option<Box<dyn StructuredBackend>>,
}

impl Default for LayoutExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutExtractor {
    /// Create an extractor backed by the PDF backend
    pub fn new() -> Self {
        Self::with_backend(Box::new(PdfBackend::new()))
    }

    /// Create an extractor with a custom structured backend
    pub fn with_backend(backend: Box<dyn StructuredBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Create an extractor that always uses the plain-text path
    pub fn text_only() -> Self {
        Self { backend: None }
    }

    /// Extract a layout from document bytes. Never fails.
    pub fn extract(&self, bytes: &[u8]) -> DocumentLayout {
        match self.try_structured(bytes) {
            Ok(layout) => layout,
            Err(LayoutError::UnsupportedFormat) => {
                debug!("No structured backend for input, using plain-text layout");
                plain_text_layout(bytes)
            }
            Err(e) => {
                warn!("Structured extraction failed, falling back to text: {}", e);
                plain_text_layout(bytes)
            }
        }
    }

    /// Extract through the structured backend only
    pub fn try_structured(&self, bytes: &[u8]) -> Result<DocumentLayout, LayoutError> {
        let backend = match &self.backend {
            Some(backend) if backend.recognizes(bytes) => backend,
            _ => return Err(LayoutError::UnsupportedFormat),
        };

        // Third-party parsers may panic on hostile input; treat that as a
        // parse failure like any other.
        let raw_pages = panic::catch_unwind(AssertUnwindSafe(|| backend.parse(bytes)))
            .map_err(|_| LayoutError::LoadFailed("backend panicked while parsing".to_string()))??;

        let mut pages: Vec<Page> = raw_pages
            .into_iter()
            .enumerate()
            .map(|(index, raw)| build_page(index, raw))
            .collect();

        if pages.is_empty() {
            pages.push(Page::new(0, Vec::new()));
        }

        let layout = DocumentLayout::new(pages);
        info!(
            "Extracted {} page(s), {} line(s)",
            layout.pages.len(),
            layout.total_lines()
        );
        Ok(layout)
    }
}

/// Fallback layout: one page, one line per non-blank text line, no spatial data
pub fn plain_text_layout(bytes: &[u8]) -> DocumentLayout {
    let text = String::from_utf8_lossy(bytes);

    let lines: Vec<Line> = text
        .split(['\n', '\r'])
        .filter(|raw| !raw.trim().is_empty())
        .enumerate()
        .map(|(index, raw)| Line::from_text(index, raw))
        .collect();

    debug!("Plain-text layout with {} line(s)", lines.len());
    DocumentLayout::new(vec![Page::new(0, lines)])
}

fn build_page(index: usize, raw: RawPage) -> Page {
    let lines = if raw.tokens.is_empty() {
        block_lines(&raw)
    } else {
        cluster_tokens(raw.tokens)
    };
    Page::with_size(index, raw.width, raw.height, lines)
}

/// Split block regions on line breaks; each line inherits its block's box
fn block_lines(raw: &RawPage) -> Vec<Line> {
    let mut lines = Vec::new();
    for block in &raw.blocks {
        for text in block.text.lines().filter(|t| !t.trim().is_empty()) {
            lines.push(Line::from_text(lines.len(), text).with_bbox(block.bbox));
        }
    }
    lines
}

fn reading_order(a: &RawToken, b: &RawToken) -> Ordering {
    y_bucket(a.bbox.y0)
        .total_cmp(&y_bucket(b.bbox.y0))
        .then(a.bbox.x0.total_cmp(&b.bbox.x0))
}

/// Cluster positioned tokens into lines.
///
/// Tokens are ordered by (y bucket, x); a new line starts whenever a token's
/// bucket moves more than [`LINE_BREAK_TOLERANCE`] away from the bucket of
/// the line being built.
pub fn cluster_tokens(mut tokens: Vec<RawToken>) -> Vec<Line> {
    tokens.sort_by(reading_order);

    let mut lines = Vec::new();
    let mut current: Vec<Word> = Vec::new();
    let mut current_bucket: Option<f32> = None;

    for token in tokens {
        let bucket = y_bucket(token.bbox.y0);
        match current_bucket {
            Some(line_bucket) if (bucket - line_bucket).abs() > LINE_BREAK_TOLERANCE => {
                lines.push(Line::from_words(lines.len(), std::mem::take(&mut current)));
                current_bucket = Some(bucket);
            }
            None => current_bucket = Some(bucket),
            _ => {}
        }
        current.push(Word::with_bbox(token.text, token.bbox));
    }

    if !current.is_empty() {
        lines.push(Line::from_words(lines.len(), current));
    }

    lines
}
