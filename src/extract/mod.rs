//! Text extraction from documents.
//!
//! Converts raw bytes into plain text, one strategy per [`TextFormat`]:
//! - Plain text is decoded as UTF-8
//! - Images always go through OCR
//! - Word documents yield paragraph text plus OCR of embedded images
//! - PDFs use the text layer page by page, OCR'ing pages while nothing has been found
//!
//! OCR and PDF access go through the [`OcrBackend`] and [`PdfBackend`]
//! traits; the defaults shell out to Tesseract and Poppler.

mod docx;
mod ocr;
mod pdf;
mod tools;

use std::sync::Arc;

use thiserror::Error;

use crate::models::TextFormat;

pub use ocr::{OcrBackend, TesseractBackend};
pub use pdf::{PdfBackend, PopplerBackend};

#[cfg(test)]
pub(crate) use docx::testing as docx_testing;
#[cfg(test)]
pub(crate) use ocr::testing as ocr_testing;
#[cfg(test)]
pub(crate) use pdf::testing as pdf_testing;

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Text is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Format-dispatching text extractor.
///
/// Cheap to clone; backends are shared.
#[derive(Clone)]
pub struct TextExtractor {
    ocr: Arc<dyn OcrBackend>,
    pdf: Arc<dyn PdfBackend>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::with_backends(Arc::new(TesseractBackend::default()), Arc::new(PopplerBackend))
    }
}

impl TextExtractor {
    /// Create a text extractor using Tesseract and Poppler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set Tesseract language.
    pub fn with_language(lang: &str) -> Self {
        Self::with_backends(Arc::new(TesseractBackend::new(lang)), Arc::new(PopplerBackend))
    }

    pub fn with_backends(ocr: Arc<dyn OcrBackend>, pdf: Arc<dyn PdfBackend>) -> Self {
        Self { ocr, pdf }
    }

    /// Extract plain text from `bytes` declared as `format`.
    pub fn extract(&self, bytes: &[u8], format: TextFormat) -> Result<String, ExtractionError> {
        match format {
            TextFormat::PlainText => decode_text(bytes),
            TextFormat::Image => self.ocr.ocr_bytes(bytes),
            TextFormat::WordDocument => docx::extract_docx(bytes, self.ocr.as_ref()),
            TextFormat::Pdf => pdf::extract_pdf(bytes, self.pdf.as_ref(), self.ocr.as_ref()),
        }
    }

    /// Check if required tools are available.
    pub fn check_tools() -> Vec<(String, bool)> {
        ["tesseract", "pdftotext", "pdftoppm", "pdfinfo"]
            .iter()
            .map(|tool| (tool.to_string(), tools::check_binary(tool)))
            .collect()
    }
}

fn decode_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = String::from_utf8(bytes.to_vec())?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ocr_testing::EchoOcr;
    use crate::extract::pdf_testing::FakePdf;

    fn extractor(pages: Vec<&'static str>) -> (TextExtractor, Arc<EchoOcr>) {
        let ocr = Arc::new(EchoOcr::default());
        let extractor = TextExtractor::with_backends(ocr.clone(), Arc::new(FakePdf::new(pages)));
        (extractor, ocr)
    }

    #[test]
    fn test_plain_text_decoding() {
        let (extractor, _) = extractor(vec![]);
        let text = extractor
            .extract("\u{feff}Wire transfer request".as_bytes(), TextFormat::PlainText)
            .unwrap();
        assert_eq!(text, "Wire transfer request");
    }

    #[test]
    fn test_plain_text_invalid_utf8() {
        let (extractor, _) = extractor(vec![]);
        let err = extractor
            .extract(&[0x66, 0x6f, 0xff, 0xfe], TextFormat::PlainText)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Decode(_)));
    }

    #[test]
    fn test_image_always_ocrd() {
        let (extractor, ocr) = extractor(vec![]);
        let text = extractor.extract(b"RECEIPT", TextFormat::Image).unwrap();
        assert_eq!(text, "[ocr:RECEIPT]");
        assert_eq!(ocr.call_count(), 1);
    }

    #[test]
    fn test_pdf_dispatch() {
        let (extractor, ocr) = extractor(vec!["", "Page two"]);
        let text = extractor.extract(b"%PDF", TextFormat::Pdf).unwrap();
        assert_eq!(text, "[ocr:page 1]Page two");
        assert_eq!(ocr.call_count(), 1);
    }

    #[test]
    fn test_check_tools_lists_all() {
        let tools = TextExtractor::check_tools();
        let names: Vec<_> = tools.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["tesseract", "pdftotext", "pdftoppm", "pdfinfo"]);
    }
}
