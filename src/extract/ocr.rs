//! OCR backends.
//!
//! Tesseract is driven through its command-line binary. The trait exists so
//! the extractors can be exercised without an OCR engine installed.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use super::tools::handle_cmd_output;
use super::ExtractionError;

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Core OCR: extract text from an image file.
    fn run_ocr(&self, image_path: &Path) -> Result<String, ExtractionError>;

    /// OCR an in-memory image by spilling it to a scratch file.
    fn ocr_bytes(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let temp_dir = TempDir::new()?;
        let image_path = temp_dir.path().join("image");
        fs::write(&image_path, bytes)?;
        self.run_ocr(&image_path)
    }
}

/// Tesseract OCR backend.
pub struct TesseractBackend {
    language: String,
}

impl TesseractBackend {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn run_ocr(&self, image_path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        handle_cmd_output(output, "tesseract (install tesseract-ocr)", "tesseract failed")
    }
}
