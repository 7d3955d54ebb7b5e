//! Text extraction from Office Open XML word-processing documents.
//!
//! Paragraph text comes from `word/document.xml`. Every image related to
//! the main document part is OCR'd and appended after the paragraph text,
//! whether or not the paragraphs produced anything.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use super::ocr::OcrBackend;
use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const IMAGE_RELATIONSHIP_SUFFIX: &str = "/relationships/image";

type DocxArchive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Extract paragraph text plus OCR text of embedded images.
pub fn extract_docx(bytes: &[u8], ocr: &dyn OcrBackend) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::InvalidDocument(format!("not a docx archive: {}", e)))?;

    let document_xml = read_part(&mut archive, DOCUMENT_PART)?
        .ok_or_else(|| ExtractionError::InvalidDocument(format!("missing {}", DOCUMENT_PART)))?;
    let mut text = paragraph_text(&String::from_utf8_lossy(&document_xml))?;

    let Some(rels_xml) = read_part(&mut archive, DOCUMENT_RELS_PART)? else {
        return Ok(text);
    };

    for target in image_targets(&String::from_utf8_lossy(&rels_xml))? {
        let part_name = resolve_part_name(&target);
        match read_part(&mut archive, &part_name) {
            Ok(Some(image)) => match ocr.ocr_bytes(&image) {
                Ok(image_text) => text.push_str(&image_text),
                Err(e) => warn!("OCR failed for embedded image {}: {}", part_name, e),
            },
            Ok(None) => debug!("Image relationship points at missing part {}", part_name),
            Err(e) => warn!("Could not read embedded image {}: {}", part_name, e),
        }
    }

    Ok(text)
}

fn read_part(archive: &mut DocxArchive<'_>, name: &str) -> Result<Option<Vec<u8>>, ExtractionError> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            Ok(Some(buf))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(ExtractionError::InvalidDocument(format!("{}: {}", name, e))),
    }
}

fn xml_error(e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::InvalidDocument(format!("malformed document XML: {}", e))
}

/// Concatenate run text per paragraph; paragraphs are separated by newlines.
///
/// Paragraphs nested inside another one (text boxes, shapes) contribute
/// their text to the enclosing paragraph.
fn paragraph_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                b"w:p" if depth == 0 => paragraphs.push(String::new()),
                _ => {}
            },
            Event::Text(t) if in_text => current.push_str(&t.unescape().map_err(xml_error)?),
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, ExtractionError> {
    match e.try_get_attribute(name).map_err(xml_error)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned())),
        None => Ok(None),
    }
}

/// Targets of internal image relationships, in relationship order.
fn image_targets(rels_xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(rels_xml);
    let mut targets = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                let is_image = attribute(&e, "Type")?
                    .is_some_and(|t| t.ends_with(IMAGE_RELATIONSHIP_SUFFIX));
                let external = attribute(&e, "TargetMode")?
                    .is_some_and(|m| m.eq_ignore_ascii_case("External"));
                if is_image && !external {
                    if let Some(target) = attribute(&e, "Target")? {
                        targets.push(target);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(targets)
}

/// Resolve a relationship target against the `word/` directory.
fn resolve_part_name(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = vec!["word"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
