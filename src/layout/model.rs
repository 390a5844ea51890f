/*!
 * Document layout model.
 *
 * A document is an ordered list of pages, each page an ordered list of lines,
 * each line an ordered list of words. Coordinates use a top-left origin with
 * y growing downward.
 */

use serde::{Deserialize, Serialize};

/// Default importance and difficulty for content that has not been enriched
pub const DEFAULT_SCORE: f32 = 0.5;

fn default_score() -> f32 {
    DEFAULT_SCORE
}

/// Axis-aligned bounding box in page coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    /// Create a new bounding box
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// A single token of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Token text
    pub text: String,

    /// Position on the page, when the source had spatial data
    #[serde(default)]
    pub bbox: Option<BBox>,

    /// Importance in [0, 1]
    #[serde(default = "default_score")]
    pub importance_score: f32,

    /// Character the word belongs to, if any
    #[serde(default)]
    pub character: Option<String>,

    /// Whether enrichment flagged the word as a keyword
    #[serde(default)]
    pub is_keyword: bool,
}

impl Word {
    /// Create a word without spatial data
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bbox: None,
            importance_score: DEFAULT_SCORE,
            character: None,
            is_keyword: false,
        }
    }

    /// Create a word with a bounding box
    pub fn with_bbox(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            bbox: Some(bbox),
            ..Self::new(text)
        }
    }
}

/// One row of text, the unit of narration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Zero-based index, dense within the page
    pub index: usize,

    /// Display text; words joined by single spaces when word detail exists
    pub text: String,

    /// Union of the word boxes, or the block box for block-level lines
    #[serde(default)]
    pub bbox: Option<BBox>,

    /// Word detail, empty for lines produced without it
    #[serde(default)]
    pub words: Vec<Word>,

    #[serde(default = "default_score")]
    pub importance_score: f32,

    #[serde(default)]
    pub character: Option<String>,

    #[serde(default)]
    pub key_concepts: Vec<String>,

    #[serde(default = "default_score")]
    pub reading_difficulty: f32,
}

impl Line {
    /// Create a line from plain text, without word detail
    pub fn from_text(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            bbox: None,
            words: Vec::new(),
            importance_score: DEFAULT_SCORE,
            character: None,
            key_concepts: Vec::new(),
            reading_difficulty: DEFAULT_SCORE,
        }
    }

    /// Create a line from words; text and bounding box are derived from them
    pub fn from_words(index: usize, words: Vec<Word>) -> Self {
        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let bbox = words
            .iter()
            .filter_map(|w| w.bbox)
            .reduce(|acc, b| acc.union(&b));

        Self {
            bbox,
            words,
            ..Self::from_text(index, text)
        }
    }

    /// Builder-style bounding box setter
    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Number of whitespace-delimited words in the display text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// An ordered list of lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,

    #[serde(default)]
    pub width: Option<f32>,

    #[serde(default)]
    pub height: Option<f32>,

    #[serde(default)]
    pub lines: Vec<Line>,
}

impl Page {
    /// Create a page with no physical dimensions
    pub fn new(index: usize, lines: Vec<Line>) -> Self {
        Self {
            index,
            width: None,
            height: None,
            lines,
        }
    }

    /// Create a page with physical dimensions
    pub fn with_size(index: usize, width: f32, height: f32, lines: Vec<Line>) -> Self {
        Self {
            index,
            width: Some(width),
            height: Some(height),
            lines,
        }
    }
}

/// The complete layout of a document plus document-level enrichment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    pub pages: Vec<Page>,

    /// Character roster
    #[serde(default)]
    pub characters: Vec<String>,

    #[serde(default)]
    pub genre: Option<String>,

    #[serde(default)]
    pub reading_level: Option<String>,
}

impl DocumentLayout {
    /// Create a layout from pages, with no document-level metadata
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    /// Total number of lines across all pages
    pub fn total_lines(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }

    /// Resolve a document-wide line position into its page index and line.
    ///
    /// Positions count lines in reading order across pages, so position 0 is
    /// the first line of the first non-empty page.
    pub fn line_at(&self, position: usize) -> Option<(usize, &Line)> {
        let mut remaining = position;
        for page in &self.pages {
            if remaining < page.lines.len() {
                return Some((page.index, &page.lines[remaining]));
            }
            remaining -= page.lines.len();
        }
        None
    }

    /// Mutable variant of [`DocumentLayout::line_at`] addressed by page and line index
    pub fn line_mut(&mut self, page_index: usize, line_index: usize) -> Option<&mut Line> {
        self.pages
            .iter_mut()
            .find(|p| p.index == page_index)
            .and_then(|p| p.lines.get_mut(line_index))
    }
}
