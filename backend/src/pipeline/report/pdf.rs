use crate::pipeline::error::PipelineError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;

// A4 portrait, in PDF points.
const PAGE_WIDTH_PT: f32 = 595.0;
const PAGE_HEIGHT_PT: f32 = 842.0;
const MARGIN_PT: f32 = 50.0;
const FONT_SIZE_PT: f32 = 9.0;
const LINE_HEIGHT_PT: f32 = 12.0;
const FOOTER_BASELINE_PT: f32 = 25.0;
/// Every Courier glyph is 600/1000 em wide.
const COURIER_ADVANCE_EM: f32 = 0.6;
const FONT_RESOURCE: &str = "F1";

/// A line of text fixed to a baseline on its page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub y: f32,
    pub text: String,
}

/// Layout state for one render: the pages laid out so far and the baseline of
/// the next line.
struct LayoutCursor {
    pages: Vec<Vec<PlacedLine>>,
    y: f32,
}

impl LayoutCursor {
    fn new() -> Self {
        LayoutCursor {
            pages: vec![Vec::new()],
            y: top_baseline(),
        }
    }

    fn place(&mut self, text: String) {
        if self.y < MARGIN_PT {
            self.pages.push(Vec::new());
            self.y = top_baseline();
        }
        if let Some(page) = self.pages.last_mut() {
            page.push(PlacedLine { y: self.y, text });
        }
        self.y -= LINE_HEIGHT_PT;
    }

    fn skip(&mut self) {
        self.y -= LINE_HEIGHT_PT;
    }
}

fn top_baseline() -> f32 {
    PAGE_HEIGHT_PT - MARGIN_PT - FONT_SIZE_PT
}

fn text_width(chars: usize) -> f32 {
    chars as f32 * FONT_SIZE_PT * COURIER_ADVANCE_EM
}

/// Characters that fit between the side margins.
pub fn max_line_chars() -> usize {
    ((PAGE_WIDTH_PT - 2.0 * MARGIN_PT) / (FONT_SIZE_PT * COURIER_ADVANCE_EM)).floor() as usize
}

/// Greedy word wrap. A line is broken at the last space before `max_chars`;
/// a single word longer than the line is cut at the boundary.
pub fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::new();
    let mut rest = line.trim_end();

    while rest.chars().count() > max_chars {
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let split = if rest[limit..].starts_with(' ') {
            Some(limit)
        } else {
            rest[..limit].rfind(' ').filter(|&i| i > 0)
        };
        match split {
            Some(i) => {
                out.push(rest[..i].trim_end().to_string());
                rest = rest[i..].trim_start();
            }
            None => {
                out.push(rest[..limit].to_string());
                rest = &rest[limit..];
            }
        }
    }
    if !rest.is_empty() || out.is_empty() {
        out.push(rest.to_string());
    }
    out
}

/// First pass: wrap every line and assign it a page and baseline.
pub fn layout(lines: &[String]) -> Vec<Vec<PlacedLine>> {
    let max_chars = max_line_chars();
    let mut cursor = LayoutCursor::new();
    for line in lines {
        if line.trim().is_empty() {
            cursor.skip();
            continue;
        }
        for segment in wrap_line(line, max_chars) {
            cursor.place(segment);
        }
    }
    cursor.pages
}

/// Courier is a standard Type 1 font; bytes outside WinAnsi become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u8,
            _ => b'?',
        })
        .collect()
}

fn text_operations(x: f32, y: f32, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![FONT_RESOURCE.into(), FONT_SIZE_PT.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Second pass: draw a page's lines plus its `(page/total)` footer in the
/// bottom-right corner.
fn page_operations(page: &[PlacedLine], number: usize, total: usize) -> Vec<Operation> {
    let mut operations = Vec::with_capacity((page.len() + 1) * 5);
    for line in page {
        operations.extend(text_operations(MARGIN_PT, line.y, &line.text));
    }
    let footer = format!("({}/{})", number, total);
    let x = PAGE_WIDTH_PT - MARGIN_PT - text_width(footer.chars().count());
    operations.extend(text_operations(x, FOOTER_BASELINE_PT, &footer));
    operations
}

/// Build the PDF object tree. Object ids are allocated in a fixed order and no
/// dates or random ids are written, so equal input gives equal bytes.
fn build_document(pages: &[Vec<PlacedLine>], title: &str) -> Result<Document, PipelineError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_RESOURCE => font_id },
    });

    let total = pages.len();
    let mut kids: Vec<Object> = Vec::with_capacity(total);
    for (index, page) in pages.iter().enumerate() {
        let content = Content {
            operations: page_operations(page, index + 1, total),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH_PT),
                Object::Real(PAGE_HEIGHT_PT),
            ],
        }),
    );

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_win_ansi(title)),
        "Producer" => Object::string_literal("serialize-backend"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();
    Ok(doc)
}

pub fn render(lines: &[String], title: &str) -> Result<Vec<u8>, PipelineError> {
    let pages = layout(lines);
    let mut doc = build_document(&pages, title)?;
    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| PipelineError::io("cannot serialize PDF report", Path::new(title), e))?;
    Ok(out)
}
