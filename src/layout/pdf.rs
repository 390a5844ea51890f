/*!
 * PDF backend built on lopdf.
 *
 * lopdf exposes content streams but no glyph metrics, so this backend
 * interprets the text-positioning operators itself and estimates glyph
 * advances from the font size. The resulting boxes are good enough to order
 * words into lines; they are not exact glyph extents.
 */

use std::collections::BTreeMap;

use log::{debug, trace};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::errors::LayoutError;
use crate::layout::backend::{RawBlock, RawPage, RawToken, StructuredBackend};
use crate::layout::model::BBox;

/// File signature every PDF starts with
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// US Letter, used when a page carries no usable MediaBox
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Estimated glyph advance as a fraction of the font size
const GLYPH_ADVANCE_EM: f32 = 0.5;

/// TJ adjustments (thousandths of an em) beyond this are read as word gaps
const TJ_WORD_GAP: f32 = 200.0;

/// Affine transform `[a b c d e f]` as used by PDF
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        let values: Vec<f32> = operands.iter().filter_map(number).collect();
        match values.as_slice() {
            [a, b, c, d, e, f] => Some(Matrix {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }

    fn translation(tx: f32, ty: f32) -> Matrix {
        Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        }
    }

    /// `self × other` in PDF row-vector convention
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Single-byte font encodings lopdf can map to Unicode
const SIMPLE_ENCODINGS: &[&str] = &[
    "StandardEncoding",
    "MacRomanEncoding",
    "MacExpertEncoding",
    "WinAnsiEncoding",
];

/// Base encoding of a simple font, either the `/Encoding` name or the
/// `/BaseEncoding` of an encoding dictionary
fn font_encoding(doc: &Document, font: &Dictionary) -> Option<String> {
    let name = match font.get_deref(b"Encoding", doc).ok()? {
        Object::Name(name) => name.as_slice(),
        Object::Dictionary(dict) => dict.get(b"BaseEncoding").and_then(Object::as_name).ok()?,
        _ => return None,
    };
    let name = std::str::from_utf8(name).ok()?;
    SIMPLE_ENCODINGS.contains(&name).then(|| name.to_string())
}

/// Decode a PDF string operand. UTF-16BE with BOM is honoured, a known font
/// encoding goes through lopdf's tables, anything else is read
/// byte-per-char. Control characters are dropped.
fn decode_pdf_string(bytes: &[u8], encoding: Option<&str>) -> String {
    let decoded = if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(encoding) = encoding {
        Document::decode_text(Some(encoding), bytes)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    };

    decoded
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect()
}

/// Interpreter state for one page's content stream
struct TextState {
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_size: f32,
    leading: f32,
    page_height: f32,
    /// Font resource name to encoding
    fonts: BTreeMap<Vec<u8>, String>,
    encoding: Option<String>,
    tokens: Vec<RawToken>,
    pending: Option<PendingWord>,
}

/// A word whose glyphs are still being shown
struct PendingWord {
    text: String,
    origin: (f32, f32),
    end: (f32, f32),
    size: f32,
}

impl TextState {
    fn new(page_height: f32) -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 12.0,
            leading: 0.0,
            page_height,
            fonts: BTreeMap::new(),
            encoding: None,
            tokens: Vec::new(),
            pending: None,
        }
    }

    fn with_fonts(mut self, fonts: BTreeMap<Vec<u8>, String>) -> Self {
        self.fonts = fonts;
        self
    }

    fn decode(&self, bytes: &[u8]) -> String {
        decode_pdf_string(bytes, self.encoding.as_deref())
    }

    fn device_matrix(&self) -> Matrix {
        self.text_matrix.then(&self.ctm)
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn advance(&mut self, width: f32) {
        self.text_matrix = Matrix::translation(width, 0.0).then(&self.text_matrix);
    }

    fn show(&mut self, text: &str) {
        let advance = self.font_size * GLYPH_ADVANCE_EM;
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.flush_word();
                self.advance(advance);
                continue;
            }

            let device = self.device_matrix();
            let origin = device.apply(0.0, 0.0);
            let size = self.font_size * device.vertical_scale();
            self.advance(advance);
            let end = self.device_matrix().apply(0.0, 0.0);

            match self.pending.as_mut() {
                Some(word) => {
                    word.text.push(ch);
                    word.end = end;
                }
                None => {
                    self.pending = Some(PendingWord {
                        text: ch.to_string(),
                        origin,
                        end,
                        size,
                    });
                }
            }
        }
    }

    fn adjust(&mut self, thousandths: f32) {
        if thousandths.abs() > TJ_WORD_GAP {
            self.flush_word();
        }
        self.advance(-thousandths / 1000.0 * self.font_size);
    }

    fn flush_word(&mut self) {
        let Some(word) = self.pending.take() else {
            return;
        };

        // Baseline sits at origin.y; ascent ~0.8em, descent ~0.2em. Flip to a
        // top-left origin.
        let baseline = word.origin.1;
        let top = self.page_height - (baseline + word.size * 0.8);
        let bottom = self.page_height - (baseline - word.size * 0.2);
        let x0 = word.origin.0.min(word.end.0);
        let x1 = word.origin.0.max(word.end.0);

        trace!("token '{}' at ({:.1}, {:.1})", word.text, x0, top);
        self.tokens
            .push(RawToken::new(word.text, BBox::new(x0, top, x1, bottom)));
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.ctm = m.then(&self.ctm);
                }
            }
            "BT" => {
                self.flush_word();
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => self.flush_word(),
            "Tf" => {
                self.encoding = operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| self.fonts.get(name).cloned());
                if let Some(size) = operands.get(1).and_then(number) {
                    self.font_size = size.abs();
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.leading = leading;
                }
            }
            "Td" | "TD" => {
                self.flush_word();
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if operator == "TD" {
                    self.leading = -ty;
                }
                self.move_line(tx, ty);
            }
            "Tm" => {
                self.flush_word();
                if let Some(m) = Matrix::from_operands(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => {
                self.flush_word();
                self.next_line();
            }
            // Showing text never ends a word by itself; whitespace and
            // positioning do.
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = self.decode(bytes);
                    self.show(&text);
                }
            }
            "'" => {
                self.flush_word();
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = self.decode(bytes);
                    self.show(&text);
                }
            }
            "\"" => {
                self.flush_word();
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    let text = self.decode(bytes);
                    self.show(&text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => {
                                let text = self.decode(bytes);
                                self.show(&text);
                            }
                            other => {
                                if let Some(n) = number(other) {
                                    self.adjust(n);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Structured backend for PDF documents
#[derive(Debug, Default, Clone)]
pub struct PdfBackend;

impl PdfBackend {
    pub fn new() -> Self {
        Self
    }

    fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
        let media_box = doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|dict| dict.get(b"MediaBox").ok())
            .and_then(|obj| obj.as_array().ok())
            .map(|items| items.iter().filter_map(number).collect::<Vec<_>>());

        match media_box.as_deref() {
            Some([x0, y0, x1, y1]) => ((x1 - x0).abs(), (y1 - y0).abs()),
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    fn read_page(
        doc: &Document,
        index: usize,
        page_number: u32,
        page_id: ObjectId,
    ) -> Result<RawPage, LayoutError> {
        let (width, height) = Self::page_size(doc, page_id);

        let data = doc.get_page_content(page_id).map_err(|e| LayoutError::PageDecode {
            page: index,
            message: e.to_string(),
        })?;
        let content = Content::decode(&data).map_err(|e| LayoutError::PageDecode {
            page: index,
            message: e.to_string(),
        })?;

        let fonts = doc
            .get_page_fonts(page_id)
            .into_iter()
            .filter_map(|(name, font)| font_encoding(doc, font).map(|encoding| (name, encoding)))
            .collect();

        let mut state = TextState::new(height).with_fonts(fonts);
        for operation in &content.operations {
            state.apply(&operation.operator, &operation.operands);
        }
        state.flush_word();

        let mut page = RawPage {
            width,
            height,
            tokens: state.tokens,
            blocks: Vec::new(),
        };

        if page.tokens.is_empty() {
            // No positioned glyphs; let lopdf's own text extraction stand in
            // as a single block covering the page.
            if let Ok(text) = doc.extract_text(&[page_number]) {
                if !text.trim().is_empty() {
                    page.blocks.push(RawBlock {
                        text,
                        bbox: BBox::new(0.0, 0.0, width, height),
                    });
                }
            }
        }

        debug!(
            "PDF page {}: {} tokens, {} blocks",
            index,
            page.tokens.len(),
            page.blocks.len()
        );
        Ok(page)
    }
}

impl StructuredBackend for PdfBackend {
    fn recognizes(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(PDF_SIGNATURE)
    }

    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawPage>, LayoutError> {
        let doc = Document::load_mem(bytes).map_err(|e| LayoutError::LoadFailed(e.to_string()))?;

        doc.get_pages()
            .into_iter()
            .enumerate()
            .map(|(index, (page_number, page_id))| Self::read_page(&doc, index, page_number, page_id))
            .collect()
    }
}
