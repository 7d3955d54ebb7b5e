//! Source documents and their format tags.
//!
//! A document's format is decided exactly once, at the boundary where the
//! bytes enter the system: by filename extension for files on disk and
//! Outlook attachments, by media type for MIME attachments. Everything
//! downstream matches on the enum.

use std::fs;
use std::path::Path;

/// Media type of Office Open XML word-processing documents.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Image extensions handed to OCR.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "bmp", "gif"];

/// Formats that convert directly to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextFormat {
    PlainText,
    Image,
    WordDocument,
    Pdf,
}

impl TextFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Image => "image",
            Self::WordDocument => "docx",
            Self::Pdf => "pdf",
        }
    }

    /// Resolve a lowercase file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "txt" => Some(Self::PlainText),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::WordDocument),
            e if IMAGE_EXTENSIONS.contains(&e) => Some(Self::Image),
            _ => None,
        }
    }

    /// Resolve a declared media type by exact match (any `image/*` counts as an image).
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let mime_lower = mime_type.trim().to_ascii_lowercase();
        match mime_lower.as_str() {
            "application/pdf" => Some(Self::Pdf),
            DOCX_MIME_TYPE => Some(Self::WordDocument),
            "text/plain" => Some(Self::PlainText),
            m if m.starts_with("image/") => Some(Self::Image),
            _ => None,
        }
    }

    /// Resolve from a filename's extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Option<Self> {
        extension_of(filename).and_then(|ext| Self::from_extension(&ext))
    }
}

/// Formats that bundle a body with attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// RFC 822 / MIME message (`.eml`).
    MimeEmail,
    /// Outlook mail item (`.msg`).
    OutlookMessage,
}

impl ContainerFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MimeEmail => "eml",
            Self::OutlookMessage => "msg",
        }
    }
}

/// Declared format of a top-level document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Text(TextFormat),
    Container(ContainerFormat),
}

impl DocumentFormat {
    /// Resolve from a filename's extension, case-insensitively.
    ///
    /// Returns `None` for anything the pipeline cannot process; such files
    /// are skipped rather than recorded.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = extension_of(filename)?;
        match ext.as_str() {
            "eml" => Some(Self::Container(ContainerFormat::MimeEmail)),
            "msg" => Some(Self::Container(ContainerFormat::OutlookMessage)),
            other => TextFormat::from_extension(other).map(Self::Text),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text(format) => format.as_str(),
            Self::Container(format) => format.as_str(),
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// A document as read from disk or received by upload.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    filename: String,
    content: Vec<u8>,
    format: DocumentFormat,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, content: Vec<u8>, format: DocumentFormat) -> Self {
        Self {
            filename: filename.into(),
            content,
            format,
        }
    }

    /// Build a document from a filename, deriving its format from the extension.
    pub fn from_bytes(filename: impl Into<String>, content: Vec<u8>) -> Option<Self> {
        let filename = filename.into();
        let format = DocumentFormat::from_filename(&filename)?;
        Some(Self::new(filename, content, format))
    }

    /// Read a document from disk. Returns `Ok(None)` for unrecognized formats
    /// without touching the file contents.
    pub fn read(path: &Path) -> std::io::Result<Option<Self>> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(format) = DocumentFormat::from_filename(&filename) else {
            return Ok(None);
        };
        let content = fs::read(path)?;
        Ok(Some(Self::new(filename, content, format)))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}
