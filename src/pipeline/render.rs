//! The Report Renderer: plain text → single-font PDF bytes.
//!
//! The document is built object by object with `lopdf`: one standard
//! Helvetica font in `WinAnsiEncoding`, A4 pages, and one text object per
//! line. Nothing time- or randomness-dependent goes into the file (no
//! creation date, no document ID), so the same report always produces the
//! same bytes.
//!
//! ## Layout
//!
//! Paragraphs are split on `\n`, then greedily word-wrapped against the
//! Helvetica AFM widths in [`super::transcode`]. A word wider than the text
//! column is broken at the last byte that fits. Blank lines keep their
//! vertical space. A new page starts when the next baseline would fall below
//! the bottom margin.

use crate::error::AuditError;
use crate::pipeline::transcode::{glyph_width, text_width, to_win_ansi};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Resource name of the one font in the document.
const FONT_RESOURCE: &str = "F1";

/// Page geometry and type settings, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub width: i64,
    pub height: i64,
    pub margin: i64,
    pub font_size: i64,
    pub leading: i64,
}

impl Default for PageLayout {
    /// A4, 11 pt Helvetica on 14 pt leading, ~2 cm margins.
    fn default() -> Self {
        Self {
            width: 595,
            height: 842,
            margin: 56,
            font_size: 11,
            leading: 14,
        }
    }
}

impl PageLayout {
    /// Usable line width in 1/1000 em at the configured font size.
    fn line_capacity(&self) -> u32 {
        let points = (self.width - 2 * self.margin).max(1);
        // width_units * font_size / 1000 <= points
        (points * 1000 / self.font_size.max(1)) as u32
    }

    fn lines_per_page(&self) -> usize {
        let usable = self.height - 2 * self.margin - self.font_size;
        (usable / self.leading.max(1) + 1).max(1) as usize
    }
}

/// Render a report with the default layout.
pub fn render_report_pdf(text: &str) -> Result<Vec<u8>, AuditError> {
    render_with_layout(text, &PageLayout::default())
}

/// Render a report with an explicit layout.
pub fn render_with_layout(text: &str, layout: &PageLayout) -> Result<Vec<u8>, AuditError> {
    let lines = wrap_text(text, layout.line_capacity());
    let per_page = layout.lines_per_page();

    let mut pages: Vec<&[Vec<u8>]> = lines.chunks(per_page).collect();
    if pages.is_empty() {
        // An empty report still yields a valid one-page document.
        pages.push(&[]);
    }

    debug!(
        "Rendering {} lines on {} page(s)",
        lines.len(),
        pages.len()
    );
    build_document(&pages, layout)
}

/// Transcode and wrap `text` into lines no wider than `capacity` (1/1000 em).
pub fn wrap_text(text: &str, capacity: u32) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(&to_win_ansi(paragraph), capacity, &mut lines);
    }
    lines
}

fn wrap_paragraph(paragraph: &[u8], capacity: u32, out: &mut Vec<Vec<u8>>) {
    let mut current: Vec<u8> = Vec::new();
    let mut started = false;

    for word in paragraph.split(|&b| b == b' ') {
        if started {
            let mut candidate = current.clone();
            candidate.push(b' ');
            candidate.extend_from_slice(word);
            if text_width(&candidate) <= capacity {
                current = candidate;
                continue;
            }
            out.push(std::mem::take(&mut current));
        }
        started = true;
        current.extend_from_slice(word);

        while text_width(&current) > capacity {
            let cut = fitting_prefix(&current, capacity);
            let rest = current.split_off(cut);
            out.push(std::mem::replace(&mut current, rest));
        }
    }

    out.push(current);
}

/// Longest prefix that fits, but always at least one byte.
fn fitting_prefix(bytes: &[u8], capacity: u32) -> usize {
    let mut width = 0;
    for (i, &b) in bytes.iter().enumerate() {
        width += glyph_width(b);
        if width > capacity {
            return i.max(1);
        }
    }
    bytes.len()
}

fn build_document(pages: &[&[Vec<u8>]], layout: &PageLayout) -> Result<Vec<u8>, AuditError> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_RESOURCE => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(lines, layout)?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => media_box(layout),
        }),
    );

    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Due Diligence Report"),
        "Producer" => Object::string_literal("legaliscan"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| AuditError::PdfExport(e.to_string()))?;
    Ok(buf)
}

fn media_box(layout: &PageLayout) -> Vec<Object> {
    vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(layout.width),
        Object::Integer(layout.height),
    ]
}

/// One `BT … ET` block per non-blank line.
fn page_content(lines: &[Vec<u8>], layout: &PageLayout) -> Result<Vec<u8>, AuditError> {
    let top = layout.height - layout.margin - layout.font_size;
    let mut operations = Vec::with_capacity(lines.len() * 5);

    for (i, line) in lines.iter().enumerate() {
        if line.iter().all(|&b| b == b' ') {
            continue;
        }
        let y = top - i as i64 * layout.leading;
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![FONT_RESOURCE.into(), Object::Integer(layout.font_size)],
            ),
            Operation::new(
                "Td",
                vec![Object::Integer(layout.margin), Object::Integer(y)],
            ),
            Operation::new("Tj", vec![Object::string_literal(line.clone())]),
            Operation::new("ET", vec![]),
        ]);
    }

    Content { operations }
        .encode()
        .map_err(|e| AuditError::PdfExport(e.to_string()))
}
