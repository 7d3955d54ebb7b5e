//! PDF text extraction with per-page OCR fallback.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, warn};

use super::ocr::OcrBackend;
use super::tools::{check_cmd_status, handle_cmd_output};
use super::ExtractionError;

/// Page-level access to a PDF file.
pub trait PdfBackend: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf_path: &Path) -> Result<u32, ExtractionError>;

    /// Embedded text of a single page (1-based).
    fn page_text(&self, pdf_path: &Path, page: u32) -> Result<String, ExtractionError>;

    /// Rasterize a single page (1-based) into `output_dir`, returning the image path.
    fn render_page(
        &self,
        pdf_path: &Path,
        page: u32,
        output_dir: &Path,
    ) -> Result<PathBuf, ExtractionError>;
}

/// Poppler command-line tools (`pdfinfo`, `pdftotext`, `pdftoppm`).
#[derive(Debug, Default, Clone, Copy)]
pub struct PopplerBackend;

impl PdfBackend for PopplerBackend {
    fn page_count(&self, pdf_path: &Path) -> Result<u32, ExtractionError> {
        let output = Command::new("pdfinfo").arg(pdf_path).output();
        let info = handle_cmd_output(output, "pdfinfo (install poppler-utils)", "pdfinfo failed")?;

        info.lines()
            .find(|line| line.starts_with("Pages:"))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|count| count.parse().ok())
            .ok_or_else(|| {
                ExtractionError::ExtractionFailed("pdfinfo reported no page count".to_string())
            })
    }

    fn page_text(&self, pdf_path: &Path, page: u32) -> Result<String, ExtractionError> {
        let page_str = page.to_string();
        let output = Command::new("pdftotext")
            .args(["-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg("-") // Output to stdout
            .output();

        handle_cmd_output(
            output,
            "pdftotext (install poppler-utils)",
            &format!("pdftotext failed on page {}", page),
        )
    }

    fn render_page(
        &self,
        pdf_path: &Path,
        page: u32,
        output_dir: &Path,
    ) -> Result<PathBuf, ExtractionError> {
        let page_str = page.to_string();
        let status = Command::new("pdftoppm")
            .args(["-png", "-r", "300", "-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg(output_dir.join("page"))
            .status();

        check_cmd_status(
            status,
            "pdftoppm (install poppler-utils)",
            &format!("pdftoppm failed to convert page {}", page),
        )?;

        find_page_image(output_dir, page).ok_or_else(|| {
            ExtractionError::ExtractionFailed(format!("No image generated for page {}", page))
        })
    }
}

/// Find the image file for a specific page number.
///
/// pdftoppm names files like page-01.png, page-001.png depending on the page count.
fn find_page_image(dir: &Path, page: u32) -> Option<PathBuf> {
    [1, 2, 3, 4]
        .into_iter()
        .map(|digits| dir.join(format!("page-{:0width$}.png", page, width = digits)))
        .find(|path| path.exists())
}

/// Extract the text of a PDF held in memory.
///
/// Page text is appended in order. Whenever the text accumulated so far is
/// still blank after appending a page, that page is rendered and OCR'd. The
/// check runs against the running total: once any earlier page yielded
/// text, later empty pages are not OCR'd.
pub fn extract_pdf(
    bytes: &[u8],
    pdf: &dyn PdfBackend,
    ocr: &dyn OcrBackend,
) -> Result<String, ExtractionError> {
    let temp_dir = TempDir::new()?;
    let pdf_path = temp_dir.path().join("document.pdf");
    fs::write(&pdf_path, bytes)?;

    let page_count = pdf.page_count(&pdf_path)?;
    debug!("Extracting {} page(s) from PDF", page_count);

    let mut text = String::new();
    for page in 1..=page_count {
        match pdf.page_text(&pdf_path, page) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => warn!("No text layer for page {}: {}", page, e),
        }

        if text.trim().is_empty() {
            debug!("Page {} yielded no text, running {} OCR", page, ocr.name());
            match ocr_page(&pdf_path, page, pdf, ocr) {
                Ok(ocr_text) => text.push_str(&ocr_text),
                Err(e) => warn!("OCR failed for page {}: {}", page, e),
            }
        }
    }

    Ok(text)
}

fn ocr_page(
    pdf_path: &Path,
    page: u32,
    pdf: &dyn PdfBackend,
    ocr: &dyn OcrBackend,
) -> Result<String, ExtractionError> {
    let render_dir = TempDir::new()?;
    let image_path = pdf.render_page(pdf_path, page, render_dir.path())?;
    ocr.run_ocr(&image_path)
}


#[cfg(test)]
mod tests {
    use super::testing::FakePdf;
    use super::*;
    use crate::extract::ocr::testing::EchoOcr;

    #[test]
    fn test_text_layer_used_without_ocr() {
        let pdf = FakePdf::new(vec!["Loan agreement\n", "Signed\n"]);
        let ocr = EchoOcr::default();

        let text = extract_pdf(b"%PDF-1.7", &pdf, &ocr).unwrap();
        assert_eq!(text, "Loan agreement\nSigned\n");
        assert_eq!(ocr.call_count(), 0);
    }

    #[test]
    fn test_first_page_without_text_falls_back_to_ocr() {
        let pdf = FakePdf::new(vec!["  \n", "Second page\n"]);
        let ocr = EchoOcr::default();

        let text = extract_pdf(b"%PDF-1.7", &pdf, &ocr).unwrap();
        assert_eq!(text, "  \n[ocr:page 1]Second page\n");
        assert_eq!(*ocr.calls.lock().unwrap(), vec!["page 1".to_string()]);
    }

    #[test]
    fn test_later_empty_page_not_ocrd_after_text() {
        let pdf = FakePdf::new(vec!["Cover letter\n", "", ""]);
        let ocr = EchoOcr::default();

        let text = extract_pdf(b"%PDF-1.7", &pdf, &ocr).unwrap();
        assert_eq!(text, "Cover letter\n");
        assert_eq!(ocr.call_count(), 0);
    }

    #[test]
    fn test_ocr_continues_while_total_stays_blank() {
        struct BlankOcr;
        impl OcrBackend for BlankOcr {
            fn name(&self) -> &'static str {
                "blank"
            }
            fn run_ocr(&self, _image_path: &Path) -> Result<String, ExtractionError> {
                Ok("\n".to_string())
            }
        }

        // OCR of page 1 finds nothing either, so page 2 is still eligible.
        let pdf = FakePdf::new(vec!["", "", "Text"]);
        let text = extract_pdf(b"%PDF-1.7", &pdf, &BlankOcr).unwrap();
        assert_eq!(text, "\n\nText");
    }

    #[test]
    fn test_find_page_image_padding() {
        let temp = TempDir::new().unwrap();
        assert!(find_page_image(temp.path(), 3).is_none());

        let path = temp.path().join("page-03.png");
        std::fs::write(&path, b"png").unwrap();
        assert_eq!(find_page_image(temp.path(), 3), Some(path));
    }
}
