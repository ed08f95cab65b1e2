//! Format normalization: one uploaded file in, one PDF-equivalent buffer out.
//!
//! | Source        | Output                                              |
//! |---------------|-----------------------------------------------------|
//! | pdf           | the uploaded bytes, untouched and unvalidated       |
//! | png/jpg/jpeg  | single-page PDF, page size = pixel size, RGB image  |
//! | csv           | plain-text table dump (**not** a PDF)               |
//! | docx          | paragraph text, one per line (**not** a PDF)        |
//!
//! The csv and docx outputs are UTF-8 text handed on where a PDF is expected.
//! Merging them fails at assembly time and strict readers reject the bytes.

use std::io::{Cursor, Read};

use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{AppError, Result};
use crate::models::upload::{NormalizedDocument, SourceFormat, UploadedFile};

/// Quality used when re-encoding raster uploads for embedding.
const JPEG_QUALITY: u8 = 90;

/// Rendered in place of empty csv cells.
const MISSING_CELL: &str = "NaN";

/// Column separator in the csv text dump.
const COLUMN_GAP: &str = "  ";

/// Normalize one upload. Fails with `UnsupportedFormat` for unknown
/// extensions and for content the matching decoder cannot read.
pub fn normalize(file: &UploadedFile) -> Result<NormalizedDocument> {
    let format = file.format().ok_or_else(|| {
        AppError::UnsupportedFormat(format!("{}: file type is not allowed", file.filename))
    })?;

    let bytes = match format {
        SourceFormat::Pdf => file.content.to_vec(),
        SourceFormat::Png | SourceFormat::Jpeg => image_to_pdf(&file.content)
            .map_err(|e| AppError::UnsupportedFormat(format!("{}: {}", file.filename, e)))?,
        SourceFormat::Csv => csv_to_text(&file.content)
            .map_err(|e| AppError::UnsupportedFormat(format!("{}: {}", file.filename, e)))?,
        SourceFormat::Docx => docx_to_text(&file.content)
            .map_err(|e| AppError::UnsupportedFormat(format!("{}: {}", file.filename, e)))?,
    };

    tracing::debug!(
        filename = %file.filename,
        format = ?format,
        input_bytes = file.len(),
        output_bytes = bytes.len(),
        "Normalized upload"
    );

    Ok(NormalizedDocument {
        source_filename: file.filename.clone(),
        format,
        bytes,
    })
}

/// Normalize every upload independently, keeping input order.
pub fn normalize_batch(files: &[UploadedFile]) -> Vec<(String, Result<NormalizedDocument>)> {
    files
        .iter()
        .map(|file| (file.filename.clone(), normalize(file)))
        .collect()
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

fn image_to_pdf(content: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let decoded =
        image::load_from_memory(content).map_err(|e| format!("cannot decode image: {}", e))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))
        .map_err(|e| format!("cannot encode image: {}", e))?;

    single_image_pdf(width, height, jpeg).map_err(|e| format!("cannot build PDF: {}", e))
}

/// One page, MediaBox `[0 0 width height]`, the image drawn over all of it.
fn single_image_pdf(width: u32, height: u32, jpeg: Vec<u8>) -> lopdf::Result<Vec<u8>> {
    let (w, h) = (i64::from(width), i64::from(height));
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w,
            "Height" => h,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w.into(), 0_i64.into(), 0_i64.into(), h.into(), 0_i64.into(), 0_i64.into()],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(w),
            Object::Integer(h),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1_i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Text dump of a csv table. The result is NOT a PDF (see module docs).
fn csv_to_text(content: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("cannot parse csv header: {}", e))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err("no columns to parse from file".to_string());
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("cannot parse csv row: {}", e))?;
        if record.len() > headers.len() {
            return Err(format!(
                "expected {} fields in row {}, saw {}",
                headers.len(),
                line + 1,
                record.len()
            ));
        }
        let mut row: Vec<String> = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    MISSING_CELL.to_string()
                } else {
                    cell.to_string()
                }
            })
            .collect();
        row.resize(headers.len(), MISSING_CELL.to_string());
        rows.push(row);
    }

    Ok(render_table(&headers, &rows).into_bytes())
}

/// Left-aligned row index, then right-aligned columns separated by two spaces.
pub(crate) fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return format!(
            "Empty DataFrame\nColumns: [{}]\nIndex: []",
            headers.join(", ")
        );
    }

    let index: Vec<String> = (0..rows.len()).map(|i| i.to_string()).collect();
    let index_width = index.iter().map(|s| s.chars().count()).max().unwrap_or(0);
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            rows.iter()
                .map(|row| row[col].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);

    let mut header_line = " ".repeat(index_width);
    for (header, width) in headers.iter().zip(&widths) {
        header_line.push_str(COLUMN_GAP);
        header_line.push_str(&format!("{:>width$}", header, width = *width));
    }
    lines.push(header_line);

    for (label, row) in index.iter().zip(rows) {
        let mut line = format!("{:<width$}", label, width = index_width);
        for (cell, width) in row.iter().zip(&widths) {
            line.push_str(COLUMN_GAP);
            line.push_str(&format!("{:>width$}", cell, width = *width));
        }
        lines.push(line);
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// DOCX
// ---------------------------------------------------------------------------

/// Paragraph text, each followed by `\n`. The result is NOT a PDF (see module docs).
fn docx_to_text(content: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(content))
        .map_err(|e| format!("invalid docx file: {}", e))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("word/document.xml not found: {}", e))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("failed to read word/document.xml: {}", e))?;

    let mut text = String::new();
    for paragraph in body_paragraphs(&xml)? {
        text.push_str(&paragraph);
        text.push('\n');
    }
    Ok(text.into_bytes())
}

/// `w:br` without a type, or of type `textWrapping`. Page and column
/// breaks contribute no text.
fn is_line_break(br: &BytesStart) -> bool {
    br.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"type")
        .map_or(true, |attr| attr.value.as_ref() == b"textWrapping")
}

/// Text of the paragraphs directly under `w:body`, in document order.
///
/// Table cells and text boxes are nested deeper and are skipped.
pub(crate) fn body_paragraphs(xml: &str) -> std::result::Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"p" && is_body(&stack) {
                    current = Some(String::new());
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"p" if is_body(&stack) => paragraphs.push(String::new()),
                    b"tab" if is_paragraph_run(&stack) => {
                        if let Some(text) = current.as_mut() {
                            text.push('\t');
                        }
                    }
                    b"br" if is_paragraph_run(&stack) && is_line_break(&e) => {
                        if let Some(text) = current.as_mut() {
                            text.push('\n');
                        }
                    }
                    b"cr" if is_paragraph_run(&stack) => {
                        if let Some(text) = current.as_mut() {
                            text.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                if let Some(name) = stack.pop() {
                    if name == b"p" && is_body(&stack) {
                        if let Some(text) = current.take() {
                            paragraphs.push(text);
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((last, parent)) = stack.split_last() {
                    if last.as_slice() == b"t" && is_paragraph_run(parent) {
                        let unescaped = t
                            .unescape()
                            .map_err(|e| format!("invalid document text: {}", e))?;
                        if let Some(text) = current.as_mut() {
                            text.push_str(&unescaped);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "invalid document XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn is_body(stack: &[Vec<u8>]) -> bool {
    matches!(stack, [document, body] if document.as_slice() == b"document" && body.as_slice() == b"body")
}

/// A run of a body paragraph, directly or through a hyperlink.
fn is_paragraph_run(stack: &[Vec<u8>]) -> bool {
    match stack {
        [head @ .., p, r] if p.as_slice() == b"p" && r.as_slice() == b"r" => is_body(head),
        [head @ .., p, link, r]
            if p.as_slice() == b"p" && link.as_slice() == b"hyperlink" && r.as_slice() == b"r" =>
        {
            is_body(head)
        }
        _ => false,
    }
}
