/*!
 * Tests for layout extraction
 */

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use readaloud::errors::LayoutError;
use readaloud::layout::{
    BBox, DocumentEnrichment, LayoutExtractor, RawBlock, RawPage, RawToken, StructuredBackend, cluster_tokens,
};

/// Build a one-page PDF with one text line per entry, 20 units apart
fn pdf_with_lines(lines: &[&str]) -> Vec<u8> {
    let lines: Vec<&[u8]> = lines.iter().map(|text| text.as_bytes()).collect();
    pdf_with_encoded_lines(None, &lines)
}

/// Same as `pdf_with_lines`, with raw string bytes shown in a font using
/// the given `/Encoding`
fn pdf_with_encoded_lines(encoding: Option<&str>, lines: &[&[u8]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut font = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    };
    if let Some(encoding) = encoding {
        font.set("Encoding", Object::Name(encoding.as_bytes().to_vec()));
    }
    let font_id = doc.add_object(font);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![72.into(), 700.into()]),
    ];
    for (i, text) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("Td", vec![0.into(), (-20).into()]));
        }
        operations.push(Operation::new("Tj", vec![Object::string_literal(text.to_vec())]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Backend that recognizes everything and then misbehaves
#[derive(Debug)]
enum HostileBackend {
    Panics,
    Fails,
    NoPages,
}

impl StructuredBackend for HostileBackend {
    fn recognizes(&self, _bytes: &[u8]) -> bool {
        true
    }

    fn parse(&self, _bytes: &[u8]) -> Result<Vec<RawPage>, LayoutError> {
        match self {
            HostileBackend::Panics => panic!("corrupt cross-reference table"),
            HostileBackend::Fails => Err(LayoutError::LoadFailed("truncated".to_string())),
            HostileBackend::NoPages => Ok(Vec::new()),
        }
    }
}

/// Backend returning block regions only
#[derive(Debug)]
struct BlockBackend;

impl StructuredBackend for BlockBackend {
    fn recognizes(&self, _bytes: &[u8]) -> bool {
        true
    }

    fn parse(&self, _bytes: &[u8]) -> Result<Vec<RawPage>, LayoutError> {
        Ok(vec![RawPage {
            width: 600.0,
            height: 800.0,
            tokens: Vec::new(),
            blocks: vec![RawBlock {
                text: "Chapter One\n\nIt was a dark night".to_string(),
                bbox: BBox::new(50.0, 60.0, 550.0, 120.0),
            }],
        }])
    }
}

#[test]
fn test_extract_withPlainText_shouldYieldOnePageWithIndexedLines() {
    let layout = LayoutExtractor::new().extract(b"a PDF-less plain text file\nwith two lines");

    assert_eq!(layout.pages.len(), 1);
    let lines = &layout.pages[0].lines;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines.iter().map(|l| l.index).collect::<Vec<_>>(), vec![0, 1]);
    assert!(lines.iter().all(|l| l.bbox.is_none()));
    assert_eq!(lines[1].text, "with two lines");
}

#[test]
fn test_extract_withGarbage_shouldNeverPanicAndYieldAPage() {
    let inputs: Vec<Vec<u8>> = vec![
        Vec::new(),
        vec![0u8; 64],
        b"%PDF-1.7\n%%EOF".to_vec(),
        b"%PDF-1.4 1 0 obj << /Type /Catalog >> garbage".to_vec(),
        (0..=255u8).cycle().take(2048).collect(),
    ];

    let extractor = LayoutExtractor::new();
    for input in inputs {
        let layout = extractor.extract(&input);
        assert!(!layout.pages.is_empty());
        for page in &layout.pages {
            let indices: Vec<usize> = page.lines.iter().map(|l| l.index).collect();
            assert_eq!(indices, (0..page.lines.len()).collect::<Vec<_>>());
        }
    }
}

#[test]
fn test_extract_withPanickingBackend_shouldFallBackToText() {
    let extractor = LayoutExtractor::with_backend(Box::new(HostileBackend::Panics));
    let layout = extractor.extract(b"still readable");

    assert_eq!(layout.pages.len(), 1);
    assert_eq!(layout.pages[0].lines[0].text, "still readable");
    assert!(matches!(
        extractor.try_structured(b"still readable"),
        Err(LayoutError::LoadFailed(_))
    ));
}

#[test]
fn test_extract_withFailingBackend_shouldFallBackToText() {
    let extractor = LayoutExtractor::with_backend(Box::new(HostileBackend::Fails));
    let layout = extractor.extract(b"one\ntwo");
    assert_eq!(layout.total_lines(), 2);
}

#[test]
fn test_try_structured_withNoPages_shouldYieldOneEmptyPage() {
    let extractor = LayoutExtractor::with_backend(Box::new(HostileBackend::NoPages));
    let layout = extractor.try_structured(b"anything").unwrap();
    assert_eq!(layout.pages.len(), 1);
    assert_eq!(layout.total_lines(), 0);
}

#[test]
fn test_try_structured_withTextOnlyExtractor_shouldBeUnsupported() {
    let extractor = LayoutExtractor::text_only();
    assert!(matches!(
        extractor.try_structured(b"%PDF-1.7"),
        Err(LayoutError::UnsupportedFormat)
    ));
}

#[test]
fn test_extract_withBlockOnlyPage_shouldSplitBlocksIntoLines() {
    let layout = LayoutExtractor::with_backend(Box::new(BlockBackend)).extract(b"x");
    let page = &layout.pages[0];

    assert_eq!(page.width, Some(600.0));
    assert_eq!(page.lines.len(), 2);
    assert_eq!(page.lines[0].text, "Chapter One");
    assert_eq!(page.lines[1].index, 1);
    assert_eq!(page.lines[1].bbox, Some(BBox::new(50.0, 60.0, 550.0, 120.0)));
}

#[test]
fn test_extract_withGeneratedPdf_shouldClusterLinesTopToBottom() {
    let bytes = pdf_with_lines(&["Hello World", "Second line here"]);
    let layout = LayoutExtractor::new().extract(&bytes);

    assert_eq!(layout.pages.len(), 1);
    let page = &layout.pages[0];
    assert_eq!(page.width, Some(612.0));
    assert_eq!(page.height, Some(792.0));

    let texts: Vec<&str> = page.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["Hello World", "Second line here"]);

    let first = page.lines[0].bbox.unwrap();
    let second = page.lines[1].bbox.unwrap();
    assert!(first.y0 < second.y0);
    assert_eq!(page.lines[1].words.len(), 3);
    assert!(page.lines[1].words.iter().all(|w| w.bbox.is_some()));
}

#[test]
fn test_extract_withMacRomanFont_shouldDecodeAccentedWords() {
    let bytes = pdf_with_encoded_lines(Some("MacRomanEncoding"), &[b"caf\x8e cr\x8fme", b"na\x95ve"]);
    let layout = LayoutExtractor::new().extract(&bytes);

    let texts: Vec<&str> = layout.pages[0].lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["café crème", "naïve"]);
    assert_eq!(layout.pages[0].lines[0].words[1].text, "crème");
}

#[test]
fn test_extract_withWinAnsiFont_shouldKeepTypographicQuotes() {
    let bytes = pdf_with_encoded_lines(Some("WinAnsiEncoding"), &[b"\x93Who goes there?\x94"]);
    let layout = LayoutExtractor::new().extract(&bytes);

    assert_eq!(layout.pages[0].lines[0].text, "\u{201c}Who goes there?\u{201d}");
}

#[test]
fn test_cluster_tokens_shouldKeepReadingOrderAndDisjointWords() {
    // Two columns of words on three baselines, shuffled
    let mut tokens = Vec::new();
    for (row, y) in [300.0f32, 100.0, 200.0].iter().enumerate() {
        for (col, x) in [200.0f32, 20.0, 110.0].iter().enumerate() {
            let text = format!("w{}{}", row, col);
            tokens.push(RawToken::new(text, BBox::new(*x, *y, x + 40.0, y + 10.0)));
        }
    }

    let lines = cluster_tokens(tokens);
    assert_eq!(lines.len(), 3);

    let mut seen = std::collections::HashSet::new();
    let mut last_y = f32::MIN;
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line.index, i);
        let bbox = line.bbox.unwrap();
        assert!(bbox.y0 > last_y);
        last_y = bbox.y0;

        let xs: Vec<f32> = line.words.iter().map(|w| w.bbox.unwrap().x0).collect();
        assert!(xs.windows(2).all(|pair| pair[0] <= pair[1]));
        for word in &line.words {
            assert!(seen.insert(word.text.clone()), "word {} in two lines", word.text);
        }
    }
    assert_eq!(seen.len(), 9);
}

#[test]
fn test_enrichment_apply_shouldUpdateExistingLinesOnly() {
    let mut layout = LayoutExtractor::text_only().extract(b"The wolf said hello\nThe end");
    let enrichment: DocumentEnrichment = serde_json::from_str(
        r#"{
            "characters": ["wolf"],
            "genre": "fable",
            "lines": [
                {"page_index": 0, "line_index": 0, "character": "wolf", "importance_score": 1.7,
                 "key_concepts": ["greeting"]},
                {"page_index": 3, "line_index": 9, "character": "ghost"}
            ]
        }"#,
    )
    .unwrap();

    let applied = enrichment.apply(&mut layout);

    assert_eq!(applied, 1);
    assert_eq!(layout.characters, vec!["wolf".to_string()]);
    assert_eq!(layout.genre.as_deref(), Some("fable"));
    let line = &layout.pages[0].lines[0];
    assert_eq!(line.character.as_deref(), Some("wolf"));
    assert_eq!(line.importance_score, 1.0);
    assert_eq!(line.key_concepts, vec!["greeting".to_string()]);
    assert_eq!(layout.pages[0].lines[1].character, None);
}
